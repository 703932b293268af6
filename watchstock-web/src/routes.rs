use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, warn, Level};

use watchstock_core::controllers::{self, category, item, vendor};
use watchstock_core::{CatalogError, Catalog, FormData, Outcome, Renderer};

use crate::render::error_page;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub renderer: Arc<dyn Renderer>,
}

impl AppState {
    pub fn new(catalog: Catalog, renderer: Arc<dyn Renderer>) -> Self {
        Self { catalog, renderer }
    }

    /// Turns a handler outcome into an HTTP response
    fn respond(&self, outcome: watchstock_core::Result<Outcome>) -> Response {
        match outcome {
            Ok(Outcome::Render(view)) => match self.renderer.render(&view) {
                Ok(page) => Html(page).into_response(),
                Err(err) => {
                    error!(template = view.template(), error = %format!("{:#}", err), "Failed to render view");
                    failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page")
                }
            },
            Ok(Outcome::Redirect(path)) => Redirect::to(&path).into_response(),
            Err(err) => error_response(err),
        }
    }
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Html(error_page(status.as_u16(), message))).into_response()
}

fn error_response(err: CatalogError) -> Response {
    if err.is_not_found() {
        warn!(error = %err, "Not found");
        return failure(StatusCode::NOT_FOUND, &err.to_string());
    }
    error!(error = %err, "Request failed");
    failure(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
}

/// Decoded form body; repeated keys are kept as separate pairs
type FormBody = Form<Vec<(String, String)>>;

fn form_data(Form(pairs): FormBody) -> FormData {
    FormData::from_pairs(pairs)
}

/// Create the application router with every catalog route
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/catalog", get(index))
        // Vendors
        .route("/catalog/vendors", get(vendor_list))
        .route("/catalog/vendor/create", get(vendor_create_form).post(vendor_create))
        .route("/catalog/vendor/:id", get(vendor_detail))
        .route("/catalog/vendor/:id/update", get(vendor_update_form).post(vendor_update))
        .route("/catalog/vendor/:id/delete", get(vendor_delete_form).post(vendor_delete))
        // Categories
        .route("/catalog/categories", get(category_list))
        .route("/catalog/category/create", get(category_create_form).post(category_create))
        .route("/catalog/category/:id", get(category_detail))
        .route("/catalog/category/:id/update", get(category_update_form).post(category_update))
        .route("/catalog/category/:id/delete", get(category_delete_form).post(category_delete))
        // Items
        .route("/catalog/items", get(item_list))
        .route("/catalog/item/create", get(item_create_form).post(item_create))
        .route("/catalog/item/:id", get(item_detail))
        .route("/catalog/item/:id/update", get(item_update_form).post(item_update))
        .route("/catalog/item/:id/delete", get(item_delete_form).post(item_delete))
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

async fn not_found() -> Response {
    failure(StatusCode::NOT_FOUND, "Page not found")
}

async fn index(State(state): State<AppState>) -> Response {
    state.respond(Ok(controllers::index(&state.catalog).await))
}

// Vendor handlers

async fn vendor_list(State(state): State<AppState>) -> Response {
    state.respond(vendor::list(&state.catalog).await)
}

async fn vendor_detail(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.respond(vendor::detail(&state.catalog, &id).await)
}

async fn vendor_create_form(State(state): State<AppState>) -> Response {
    state.respond(Ok(vendor::create_form().await))
}

async fn vendor_create(State(state): State<AppState>, body: FormBody) -> Response {
    state.respond(vendor::create(&state.catalog, &form_data(body)).await)
}

async fn vendor_update_form(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.respond(vendor::update_form(&state.catalog, &id).await)
}

async fn vendor_update(State(state): State<AppState>, Path(id): Path<String>, body: FormBody) -> Response {
    state.respond(vendor::update(&state.catalog, &id, &form_data(body)).await)
}

async fn vendor_delete_form(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.respond(vendor::delete_form(&state.catalog, &id).await)
}

async fn vendor_delete(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.respond(vendor::delete(&state.catalog, &id).await)
}

// Category handlers

async fn category_list(State(state): State<AppState>) -> Response {
    state.respond(category::list(&state.catalog).await)
}

async fn category_detail(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.respond(category::detail(&state.catalog, &id).await)
}

async fn category_create_form(State(state): State<AppState>) -> Response {
    state.respond(Ok(category::create_form().await))
}

async fn category_create(State(state): State<AppState>, body: FormBody) -> Response {
    state.respond(category::create(&state.catalog, &form_data(body)).await)
}

async fn category_update_form(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.respond(category::update_form(&state.catalog, &id).await)
}

async fn category_update(State(state): State<AppState>, Path(id): Path<String>, body: FormBody) -> Response {
    state.respond(category::update(&state.catalog, &id, &form_data(body)).await)
}

async fn category_delete_form(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.respond(category::delete_form(&state.catalog, &id).await)
}

async fn category_delete(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.respond(category::delete(&state.catalog, &id).await)
}

// Item handlers

async fn item_list(State(state): State<AppState>) -> Response {
    state.respond(item::list(&state.catalog).await)
}

async fn item_detail(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.respond(item::detail(&state.catalog, &id).await)
}

async fn item_create_form(State(state): State<AppState>) -> Response {
    state.respond(item::create_form(&state.catalog).await)
}

async fn item_create(State(state): State<AppState>, body: FormBody) -> Response {
    state.respond(item::create(&state.catalog, &form_data(body)).await)
}

async fn item_update_form(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.respond(item::update_form(&state.catalog, &id).await)
}

async fn item_update(State(state): State<AppState>, Path(id): Path<String>, body: FormBody) -> Response {
    state.respond(item::update(&state.catalog, &id, &form_data(body)).await)
}

async fn item_delete_form(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.respond(item::delete_form(&state.catalog, &id).await)
}

async fn item_delete(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.respond(item::delete(&state.catalog, &id).await)
}
