use tracing::{info, warn};

use super::parse_id;
use crate::error::{CatalogError, Result};
use crate::models::{Collection, Vendor};
use crate::repository::Catalog;
use crate::validation::{EntityForm, FormData, VendorForm};
use crate::views::{FormMode, Outcome, View};

const VENDORS: Collection = Collection::Vendors;

/// All vendors, by company name
pub async fn list(catalog: &Catalog) -> Result<Outcome> {
    let vendors = catalog.vendors.find_all().await?;
    Ok(Outcome::Render(View::VendorList { vendors }))
}

/// A vendor and the items it supplies
pub async fn detail(catalog: &Catalog, id: &str) -> Result<Outcome> {
    let id = parse_id(VENDORS, id)?;
    let (vendor, items) = tokio::try_join!(catalog.vendors.find_by_id(id), catalog.items_by_vendor(id))?;
    let vendor = vendor.ok_or_else(|| CatalogError::not_found(VENDORS, id))?;
    Ok(Outcome::Render(View::VendorDetail { vendor, items }))
}

pub async fn create_form() -> Outcome {
    Outcome::Render(View::VendorForm {
        mode: FormMode::Create,
        vendor: VendorForm::default(),
        errors: Vec::new(),
    })
}

pub async fn create(catalog: &Catalog, input: &FormData) -> Result<Outcome> {
    let validated = VendorForm::validate(input);
    let vendor: Vendor = match validated.entity() {
        Some(vendor) => vendor,
        None => {
            warn!(errors = validated.errors.len(), "Vendor create rejected");
            return Ok(Outcome::Render(View::VendorForm {
                mode: FormMode::Create,
                vendor: validated.form,
                errors: validated.errors,
            }));
        }
    };

    let record = catalog.vendors.create(vendor).await?;
    info!(id = %record.id, name = %record.company_name, "Created vendor");
    Ok(Outcome::Redirect(record.url()))
}

/// Confirmation page listing the items that would block the delete
pub async fn delete_form(catalog: &Catalog, id: &str) -> Result<Outcome> {
    let id = parse_id(VENDORS, id)?;
    let (vendor, items) = tokio::try_join!(catalog.vendors.find_by_id(id), catalog.items_by_vendor(id))?;
    let vendor = vendor.ok_or_else(|| CatalogError::not_found(VENDORS, id))?;
    Ok(Outcome::Render(View::VendorDelete { vendor, items }))
}

/// Deletes the vendor unless an item still references it
pub async fn delete(catalog: &Catalog, id: &str) -> Result<Outcome> {
    let id = parse_id(VENDORS, id)?;
    let (vendor, items) = tokio::try_join!(catalog.vendors.find_by_id(id), catalog.items_by_vendor(id))?;
    let vendor = vendor.ok_or_else(|| CatalogError::not_found(VENDORS, id))?;

    if !items.is_empty() {
        warn!(%id, referencing = items.len(), "Refusing to delete vendor with items");
        return Ok(Outcome::Render(View::VendorDelete { vendor, items }));
    }

    catalog.vendors.delete_by_id(id).await?;
    info!(%id, name = %vendor.company_name, "Deleted vendor");
    Ok(Outcome::Redirect(VENDORS.list_path().to_string()))
}

pub async fn update_form(catalog: &Catalog, id: &str) -> Result<Outcome> {
    let id = parse_id(VENDORS, id)?;
    let vendor = catalog
        .vendors
        .find_by_id(id)
        .await?
        .ok_or_else(|| CatalogError::not_found(VENDORS, id))?;

    Ok(Outcome::Render(View::VendorForm {
        mode: FormMode::Update(id),
        vendor: VendorForm::from_entity(&vendor),
        errors: Vec::new(),
    }))
}

pub async fn update(catalog: &Catalog, id: &str, input: &FormData) -> Result<Outcome> {
    let id = parse_id(VENDORS, id)?;
    let validated = VendorForm::validate(input);
    let vendor = match validated.entity() {
        Some(vendor) => vendor,
        None => {
            catalog.vendors.get(id).await?;
            warn!(%id, errors = validated.errors.len(), "Vendor update rejected");
            return Ok(Outcome::Render(View::VendorForm {
                mode: FormMode::Update(id),
                vendor: validated.form,
                errors: validated.errors,
            }));
        }
    };

    let record = catalog
        .vendors
        .update(id, vendor)
        .await?
        .ok_or_else(|| CatalogError::not_found(VENDORS, id))?;
    info!(%id, name = %record.company_name, "Updated vendor");
    Ok(Outcome::Redirect(record.url()))
}
