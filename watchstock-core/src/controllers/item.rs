use tracing::{info, warn};

use super::parse_id;
use crate::error::{CatalogError, Result};
use crate::models::{Collection, Item, Record};
use crate::repository::Catalog;
use crate::validation::{EntityForm, FieldError, FormData, ItemForm};
use crate::views::{CategoryOption, FormMode, ItemDetail, ItemSummary, Outcome, VendorOption, View};

const ITEMS: Collection = Collection::Items;

/// Renders the item form with every vendor and category as a selectable option
async fn form_view(
    catalog: &Catalog,
    mode: FormMode,
    item: ItemForm,
    errors: Vec<FieldError>,
) -> Result<Outcome> {
    let (vendors, categories) = tokio::try_join!(catalog.vendors.find_all(), catalog.categories.find_all())?;
    let selected = item.vendor_id();

    let vendors = vendors
        .into_iter()
        .map(|vendor| VendorOption {
            selected: selected == Some(vendor.id),
            vendor,
        })
        .collect();
    let categories = categories
        .into_iter()
        .map(|category| CategoryOption {
            checked: item.has_category(&category.id),
            category,
        })
        .collect();

    Ok(Outcome::Render(View::ItemForm {
        mode,
        item,
        vendors,
        categories,
        errors,
    }))
}

/// Checks that the submitted vendor and categories exist
async fn check_references(catalog: &Catalog, form: &ItemForm) -> Result<Vec<FieldError>> {
    let vendor_id = form.vendor_id();
    let category_ids = form.category_ids();

    let lookup_vendor = async {
        match vendor_id {
            Some(id) => catalog.vendors.find_by_id(id).await,
            None => Ok(None),
        }
    };
    let lookup_categories = async {
        match &category_ids {
            Some(ids) => catalog.categories.find_many(ids.clone()).await.map(|found| found.len()),
            None => Ok(0),
        }
    };
    let (vendor, found_categories) = tokio::try_join!(lookup_vendor, lookup_categories)?;

    let mut errors = Vec::new();
    if vendor.is_none() {
        errors.push(FieldError::new("vendor", "Vendor does not exist."));
    }
    let all_found = category_ids.map_or(false, |ids| ids.len() == found_categories);
    if !all_found {
        errors.push(FieldError::new("category", "Category does not exist."));
    }
    Ok(errors)
}

/// Runs the form rules followed by the reference checks; returns the entity
/// only when both pass
async fn validate_submission(
    catalog: &Catalog,
    input: &FormData,
) -> Result<(ItemForm, std::result::Result<Item, Vec<FieldError>>)> {
    let validated = ItemForm::validate(input);
    if !validated.is_valid() {
        return Ok((validated.form, Err(validated.errors)));
    }

    // Malformed identifiers pass the field rules and are reported here
    let errors = check_references(catalog, &validated.form).await?;
    match validated.entity() {
        Some(item) if errors.is_empty() => Ok((validated.form, Ok(item))),
        _ => Ok((validated.form, Err(errors))),
    }
}

/// Resolves the vendor and categories an item refers to
async fn populate(catalog: &Catalog, item: Record<Item>) -> Result<ItemDetail> {
    let (vendor, categories) = tokio::try_join!(
        catalog.vendors.find_by_id(item.vendor),
        catalog.categories.find_many(item.category.clone()),
    )?;
    Ok(ItemDetail {
        item,
        vendor,
        categories,
    })
}

/// All items by name, each with its vendor
pub async fn list(catalog: &Catalog) -> Result<Outcome> {
    let (items, vendors) = tokio::try_join!(catalog.items.find_all(), catalog.vendors.find_all())?;

    let items = items
        .into_iter()
        .map(|item| ItemSummary {
            vendor: vendors.iter().find(|v| v.id == item.vendor).cloned(),
            item,
        })
        .collect();
    Ok(Outcome::Render(View::ItemList { items }))
}

pub async fn detail(catalog: &Catalog, id: &str) -> Result<Outcome> {
    let id = parse_id(ITEMS, id)?;
    let item = catalog.items.get(id).await?;
    Ok(Outcome::Render(View::ItemDetail(populate(catalog, item).await?)))
}

pub async fn create_form(catalog: &Catalog) -> Result<Outcome> {
    form_view(catalog, FormMode::Create, ItemForm::default(), Vec::new()).await
}

pub async fn create(catalog: &Catalog, input: &FormData) -> Result<Outcome> {
    let (form, checked) = validate_submission(catalog, input).await?;
    let item = match checked {
        Ok(item) => item,
        Err(errors) => {
            warn!(errors = errors.len(), "Item create rejected");
            return form_view(catalog, FormMode::Create, form, errors).await;
        }
    };

    let record = catalog.items.create(item).await?;
    info!(id = %record.id, name = %record.name, vendor = %record.vendor, "Created item");
    Ok(Outcome::Redirect(record.url()))
}

pub async fn delete_form(catalog: &Catalog, id: &str) -> Result<Outcome> {
    let id = parse_id(ITEMS, id)?;
    let item = catalog.items.get(id).await?;
    Ok(Outcome::Render(View::ItemDelete(populate(catalog, item).await?)))
}

/// Deletes the item; nothing references items, so there is no gate
pub async fn delete(catalog: &Catalog, id: &str) -> Result<Outcome> {
    let id = parse_id(ITEMS, id)?;
    if !catalog.items.delete_by_id(id).await? {
        return Err(CatalogError::not_found(ITEMS, id));
    }
    info!(%id, "Deleted item");
    Ok(Outcome::Redirect(ITEMS.list_path().to_string()))
}

pub async fn update_form(catalog: &Catalog, id: &str) -> Result<Outcome> {
    let id = parse_id(ITEMS, id)?;
    let item = catalog.items.get(id).await?;
    form_view(catalog, FormMode::Update(id), ItemForm::from_entity(&item), Vec::new()).await
}

pub async fn update(catalog: &Catalog, id: &str, input: &FormData) -> Result<Outcome> {
    let id = parse_id(ITEMS, id)?;
    let (form, checked) = validate_submission(catalog, input).await?;
    let item = match checked {
        Ok(item) => item,
        Err(errors) => {
            catalog.items.get(id).await?;
            warn!(%id, errors = errors.len(), "Item update rejected");
            return form_view(catalog, FormMode::Update(id), form, errors).await;
        }
    };

    let record = catalog
        .items
        .update(id, item)
        .await?
        .ok_or_else(|| CatalogError::not_found(ITEMS, id))?;
    info!(%id, name = %record.name, "Updated item");
    Ok(Outcome::Redirect(record.url()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Vendor};
    use uuid::Uuid;

    struct Fixture {
        catalog: Catalog,
        vendor: Record<Vendor>,
        dress: Record<Category>,
        pilot: Record<Category>,
    }

    async fn fixture() -> Fixture {
        let catalog = Catalog::in_memory();
        let vendor = catalog
            .vendors
            .create(Vendor::new("Cartier".into(), "Paris".into()))
            .await
            .unwrap();
        let dress = catalog
            .categories
            .create(Category::new("Dress".into(), "d".into()))
            .await
            .unwrap();
        let pilot = catalog
            .categories
            .create(Category::new("Pilot".into(), "p".into()))
            .await
            .unwrap();
        Fixture {
            catalog,
            vendor,
            dress,
            pilot,
        }
    }

    fn item_input(vendor: &Uuid) -> FormData {
        FormData::new()
            .with("name", " Santos ")
            .with("description", "Square <case>")
            .with("price", "7000")
            .with("stock", "4")
            .with("vendor", vendor.to_string())
    }

    async fn only_item(catalog: &Catalog) -> Record<Item> {
        let mut items = catalog.items.find_all().await.unwrap();
        assert_eq!(items.len(), 1);
        items.remove(0)
    }

    #[tokio::test]
    async fn test_create_stores_sanitized_item() {
        let f = fixture().await;
        let outcome = create(&f.catalog, &item_input(&f.vendor.id)).await.unwrap();

        let item = only_item(&f.catalog).await;
        assert_eq!(outcome, Outcome::Redirect(item.url()));
        assert_eq!(item.name, "Santos");
        assert_eq!(item.description, "Square &lt;case&gt;");
        assert_eq!(item.price, 7000.0);
        assert_eq!(item.stock, 4.0);
        assert_eq!(item.vendor, f.vendor.id);
    }

    #[tokio::test]
    async fn test_create_without_category_stores_empty_list() {
        let f = fixture().await;
        create(&f.catalog, &item_input(&f.vendor.id)).await.unwrap();
        assert!(only_item(&f.catalog).await.category.is_empty());
    }

    #[tokio::test]
    async fn test_create_with_scalar_category_stores_one() {
        let f = fixture().await;
        let input = item_input(&f.vendor.id).with("category", f.dress.id.to_string());
        create(&f.catalog, &input).await.unwrap();
        assert_eq!(only_item(&f.catalog).await.category, vec![f.dress.id]);
    }

    #[tokio::test]
    async fn test_negative_price_rerenders_with_options() {
        let f = fixture().await;
        let input = FormData::from_pairs(vec![
            ("name", "Santos".to_string()),
            ("description", "d".to_string()),
            ("price", "-1".to_string()),
            ("stock", "1".to_string()),
            ("vendor", f.vendor.id.to_string()),
            ("category", f.pilot.id.to_string()),
        ]);

        let outcome = create(&f.catalog, &input).await.unwrap();
        match outcome.view() {
            Some(View::ItemForm {
                item,
                vendors,
                categories,
                errors,
                ..
            }) => {
                assert!(errors.iter().any(|e| e.field == "price"));
                assert_eq!(item.price, "-1");
                assert!(vendors[0].selected);
                let checked: Vec<_> = categories
                    .iter()
                    .map(|c| (c.category.category_name.as_str(), c.checked))
                    .collect();
                assert_eq!(checked, vec![("Dress", false), ("Pilot", true)]);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(f.catalog.items.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_references_rejected() {
        let f = fixture().await;

        let input = item_input(&Uuid::new_v4());
        let outcome = create(&f.catalog, &input).await.unwrap();
        let errors = outcome.view().unwrap().field_errors();
        assert_eq!(errors, &[FieldError::new("vendor", "Vendor does not exist.")]);

        let input = item_input(&f.vendor.id).with_many("category", vec![f.dress.id.to_string(), Uuid::new_v4().to_string()]);
        let outcome = create(&f.catalog, &input).await.unwrap();
        let errors = outcome.view().unwrap().field_errors();
        assert_eq!(errors, &[FieldError::new("category", "Category does not exist.")]);

        assert_eq!(f.catalog.items.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_references_rejected_with_messages() {
        let f = fixture().await;

        let input = item_input(&f.vendor.id).with("vendor", "not-a-uuid");
        let outcome = create(&f.catalog, &input).await.unwrap();
        match outcome.view() {
            Some(View::ItemForm { item, errors, .. }) => {
                assert_eq!(errors, &[FieldError::new("vendor", "Vendor does not exist.")]);
                assert_eq!(item.vendor, "not-a-uuid");
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let input = item_input(&f.vendor.id).with_many("category", vec![f.dress.id.to_string(), "bogus".to_string()]);
        let outcome = create(&f.catalog, &input).await.unwrap();
        let errors = outcome.view().unwrap().field_errors();
        assert_eq!(errors, &[FieldError::new("category", "Category does not exist.")]);

        let input = item_input(&f.vendor.id)
            .with("vendor", "abc")
            .with("category", "bogus");
        let outcome = create(&f.catalog, &input).await.unwrap();
        let errors = outcome.view().unwrap().field_errors();
        assert_eq!(
            errors,
            &[
                FieldError::new("vendor", "Vendor does not exist."),
                FieldError::new("category", "Category does not exist."),
            ]
        );

        assert_eq!(f.catalog.items.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_vendor_on_update_keeps_item() {
        let f = fixture().await;
        create(&f.catalog, &item_input(&f.vendor.id)).await.unwrap();
        let before = only_item(&f.catalog).await;

        let input = item_input(&f.vendor.id).with("vendor", "not-a-uuid");
        let outcome = update(&f.catalog, &before.id.to_string(), &input).await.unwrap();
        let errors = outcome.view().unwrap().field_errors();
        assert_eq!(errors, &[FieldError::new("vendor", "Vendor does not exist.")]);
        assert_eq!(only_item(&f.catalog).await, before);
    }

    #[tokio::test]
    async fn test_invalid_update_of_missing_item_is_not_found() {
        let f = fixture().await;
        let input = item_input(&f.vendor.id).with("price", "-1");
        let err = update(&f.catalog, &Uuid::new_v4().to_string(), &input).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_with_unchanged_fields_is_idempotent() {
        let f = fixture().await;
        let input = item_input(&f.vendor.id).with("category", f.dress.id.to_string());
        create(&f.catalog, &input).await.unwrap();
        let before = only_item(&f.catalog).await;

        let outcome = update(&f.catalog, &before.id.to_string(), &input).await.unwrap();
        assert_eq!(outcome, Outcome::Redirect(before.url()));
        assert_eq!(only_item(&f.catalog).await, before);
    }

    #[tokio::test]
    async fn test_update_form_prefills_selection() {
        let f = fixture().await;
        let input = item_input(&f.vendor.id).with("category", f.dress.id.to_string());
        create(&f.catalog, &input).await.unwrap();
        let item = only_item(&f.catalog).await;

        let outcome = update_form(&f.catalog, &item.id.to_string()).await.unwrap();
        match outcome.view() {
            Some(View::ItemForm {
                mode,
                item: form,
                vendors,
                categories,
                ..
            }) => {
                assert_eq!(*mode, FormMode::Update(item.id));
                assert_eq!(form.name, "Santos");
                assert!(vendors.iter().all(|v| v.selected));
                assert!(categories.iter().any(|c| c.checked && c.category.id == f.dress.id));
                assert!(categories.iter().any(|c| !c.checked && c.category.id == f.pilot.id));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_and_detail_populate_references() {
        let f = fixture().await;
        let input = item_input(&f.vendor.id).with_many("category", vec![f.pilot.id.to_string(), f.dress.id.to_string()]);
        create(&f.catalog, &input).await.unwrap();
        let item = only_item(&f.catalog).await;

        let outcome = list(&f.catalog).await.unwrap();
        match outcome.view() {
            Some(View::ItemList { items }) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].vendor.as_ref().map(|v| v.id), Some(f.vendor.id));
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let outcome = detail(&f.catalog, &item.id.to_string()).await.unwrap();
        let view = outcome.view().unwrap();
        assert_eq!(view.title(), "Santos");
        match view {
            View::ItemDetail(detail) => {
                assert_eq!(detail.vendor.as_ref().map(|v| v.id), Some(f.vendor.id));
                let names: Vec<_> = detail.categories.iter().map(|c| c.category_name.as_str()).collect();
                assert_eq!(names, vec!["Pilot", "Dress"]);
            }
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dangling_vendor_populates_as_absent() {
        let f = fixture().await;
        create(&f.catalog, &item_input(&f.vendor.id)).await.unwrap();
        let item = only_item(&f.catalog).await;
        f.catalog.vendors.delete_by_id(f.vendor.id).await.unwrap();

        let outcome = delete_form(&f.catalog, &item.id.to_string()).await.unwrap();
        match outcome.view() {
            Some(View::ItemDelete(detail)) => assert!(detail.vendor.is_none()),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_then_not_found() {
        let f = fixture().await;
        create(&f.catalog, &item_input(&f.vendor.id)).await.unwrap();
        let id = only_item(&f.catalog).await.id.to_string();

        let outcome = delete(&f.catalog, &id).await.unwrap();
        assert_eq!(outcome.redirect_target(), Some("/catalog/items"));
        assert!(delete(&f.catalog, &id).await.unwrap_err().is_not_found());
        assert!(detail(&f.catalog, &id).await.unwrap_err().is_not_found());
        assert!(delete_form(&f.catalog, &id).await.unwrap_err().is_not_found());
        assert!(update_form(&f.catalog, &id).await.unwrap_err().is_not_found());
    }
}
