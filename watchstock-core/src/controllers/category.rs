use tracing::{info, warn};

use super::parse_id;
use crate::error::{CatalogError, Result};
use crate::models::Collection;
use crate::repository::{Catalog, CreateOutcome};
use crate::validation::{CategoryForm, EntityForm, FormData};
use crate::views::{FormMode, Outcome, View};

const CATEGORIES: Collection = Collection::Categories;

pub async fn list(catalog: &Catalog) -> Result<Outcome> {
    let categories = catalog.categories.find_all().await?;
    Ok(Outcome::Render(View::CategoryList { categories }))
}

/// A category and the items filed under it
pub async fn detail(catalog: &Catalog, id: &str) -> Result<Outcome> {
    let id = parse_id(CATEGORIES, id)?;
    let (category, items) =
        tokio::try_join!(catalog.categories.find_by_id(id), catalog.items_by_category(id))?;
    let category = category.ok_or_else(|| CatalogError::not_found(CATEGORIES, id))?;
    Ok(Outcome::Render(View::CategoryDetail { category, items }))
}

pub async fn create_form() -> Outcome {
    Outcome::Render(View::CategoryForm {
        mode: FormMode::Create,
        category: CategoryForm::default(),
        errors: Vec::new(),
    })
}

/// Creates a category, or redirects to the one that already has this name
pub async fn create(catalog: &Catalog, input: &FormData) -> Result<Outcome> {
    let validated = CategoryForm::validate(input);
    let Some(category) = validated.entity() else {
        warn!(errors = validated.errors.len(), "Category create rejected");
        return Ok(Outcome::Render(View::CategoryForm {
            mode: FormMode::Create,
            category: validated.form,
            errors: validated.errors,
        }));
    };

    match catalog.categories.create_unique(category).await? {
        CreateOutcome::Created(record) => {
            info!(id = %record.id, name = %record.category_name, "Created category");
            Ok(Outcome::Redirect(record.url()))
        }
        CreateOutcome::Existing(record) => {
            info!(id = %record.id, name = %record.category_name, "Category already exists");
            Ok(Outcome::Redirect(record.url()))
        }
    }
}

pub async fn delete_form(catalog: &Catalog, id: &str) -> Result<Outcome> {
    let id = parse_id(CATEGORIES, id)?;
    let (category, items) =
        tokio::try_join!(catalog.categories.find_by_id(id), catalog.items_by_category(id))?;
    let category = category.ok_or_else(|| CatalogError::not_found(CATEGORIES, id))?;
    Ok(Outcome::Render(View::CategoryDelete { category, items }))
}

/// Deletes the category unless an item is still filed under it
pub async fn delete(catalog: &Catalog, id: &str) -> Result<Outcome> {
    let id = parse_id(CATEGORIES, id)?;
    let (category, items) =
        tokio::try_join!(catalog.categories.find_by_id(id), catalog.items_by_category(id))?;
    let category = category.ok_or_else(|| CatalogError::not_found(CATEGORIES, id))?;

    if !items.is_empty() {
        warn!(%id, referencing = items.len(), "Refusing to delete category with items");
        return Ok(Outcome::Render(View::CategoryDelete { category, items }));
    }

    catalog.categories.delete_by_id(id).await?;
    info!(%id, name = %category.category_name, "Deleted category");
    Ok(Outcome::Redirect(CATEGORIES.list_path().to_string()))
}

pub async fn update_form(catalog: &Catalog, id: &str) -> Result<Outcome> {
    let id = parse_id(CATEGORIES, id)?;
    let category = catalog
        .categories
        .find_by_id(id)
        .await?
        .ok_or_else(|| CatalogError::not_found(CATEGORIES, id))?;

    Ok(Outcome::Render(View::CategoryForm {
        mode: FormMode::Update(id),
        category: CategoryForm::from_entity(&category),
        errors: Vec::new(),
    }))
}

pub async fn update(catalog: &Catalog, id: &str, input: &FormData) -> Result<Outcome> {
    let id = parse_id(CATEGORIES, id)?;
    let validated = CategoryForm::validate(input);
    let Some(category) = validated.entity() else {
        catalog.categories.get(id).await?;
        warn!(%id, errors = validated.errors.len(), "Category update rejected");
        return Ok(Outcome::Render(View::CategoryForm {
            mode: FormMode::Update(id),
            category: validated.form,
            errors: validated.errors,
        }));
    };

    let record = catalog
        .categories
        .update(id, category)
        .await?
        .ok_or_else(|| CatalogError::not_found(CATEGORIES, id))?;
    info!(%id, name = %record.category_name, "Updated category");
    Ok(Outcome::Redirect(record.url()))
}
