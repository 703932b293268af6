//! Local Watch Stock web server
//!
//! Serves the catalog pages over HTTP from the configured store.

mod render;
mod routes;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use watchstock_core::{Catalog, Settings};

use crate::render::HtmlRenderer;
use crate::routes::{router, AppState};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Web front-end for the watchstock inventory catalog")]
struct Args {
    /// Database connection string (sqlite://, yaml://, memory:// or a file path)
    #[clap(long)]
    db: Option<String>,

    /// Address to listen on, e.g. 127.0.0.1:3000
    #[clap(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();
    let mut settings = Settings::resolve()?;
    if let Some(db) = args.db {
        settings.database = db;
    }
    if let Some(bind) = args.bind {
        settings.bind_address = bind;
    }

    let catalog = Catalog::open(&settings.database)
        .with_context(|| format!("Failed to open database '{}'", settings.database))?;
    info!(
        database = %catalog.backend().location(),
        backend = %catalog.backend().backend_type(),
        "Connected to database"
    );

    let app = router(AppState::new(catalog, Arc::new(HtmlRenderer::new())));

    let listener = tokio::net::TcpListener::bind(&settings.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_address))?;
    info!(address = %settings.bind_address, "Listening");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
