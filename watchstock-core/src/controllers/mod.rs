//! Request handlers
//!
//! One module per entity type, each exposing the same set of operations:
//! list, detail, create form/submit, update form/submit and delete
//! form/submit. Handlers compose validation and repository calls and return
//! an `Outcome` for the front-end to render or redirect to.
//!
//! Independent reads inside a handler run concurrently and are joined
//! before rendering; the first failing branch aborts the request. Only the
//! dashboard tolerates partial failure.

pub mod category;
pub mod item;
pub mod vendor;

use tracing::error;
use uuid::Uuid;

use crate::error::{CatalogError, Result};
use crate::models::Collection;
use crate::repository::Catalog;
use crate::views::{Dashboard, Outcome, View};

/// Parses a path identifier; anything that is not a UUID cannot name a record
pub(crate) fn parse_id(collection: Collection, raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| CatalogError::not_found(collection, raw))
}

fn keep_count(result: Result<usize>, collection: Collection, errors: &mut Vec<String>) -> Option<usize> {
    match result {
        Ok(count) => Some(count),
        Err(err) => {
            error!(%collection, error = %err, "Failed to count records");
            errors.push(format!("Could not count {}: {}", collection, err));
            None
        }
    }
}

/// Dashboard: counts every collection, rendering whatever succeeded
pub async fn index(catalog: &Catalog) -> Outcome {
    let (vendors, categories, items) = tokio::join!(
        catalog.vendors.count(),
        catalog.categories.count(),
        catalog.items.count(),
    );

    let mut errors = Vec::new();
    let dashboard = Dashboard {
        vendor_count: keep_count(vendors, Collection::Vendors, &mut errors),
        category_count: keep_count(categories, Collection::Categories, &mut errors),
        item_count: keep_count(items, Collection::Items, &mut errors),
    };

    Outcome::Render(View::Index { dashboard, errors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CatalogStore, DatabaseBackend, BackendType, MemoryBackend};
    use crate::models::{Category, Vendor};
    use std::sync::Arc;

    /// A store whose item collection is unreachable
    struct BrokenItems(MemoryBackend);

    impl DatabaseBackend for BrokenItems {
        fn backend_type(&self) -> BackendType {
            BackendType::Memory
        }

        fn location(&self) -> String {
            "broken://".into()
        }

        fn load(&self) -> anyhow::Result<CatalogStore> {
            self.0.load()
        }

        fn save(&self, store: &CatalogStore) -> anyhow::Result<()> {
            self.0.save(store)
        }

        fn count(&self, collection: Collection) -> anyhow::Result<usize> {
            if collection == Collection::Items {
                anyhow::bail!("items collection offline");
            }
            self.0.count(collection)
        }
    }

    #[tokio::test]
    async fn test_index_counts() {
        let catalog = Catalog::in_memory();
        catalog
            .vendors
            .create(Vendor::new("Piaget".into(), "d".into()))
            .await
            .unwrap();
        catalog
            .categories
            .create(Category::new("Pilot".into(), "d".into()))
            .await
            .unwrap();

        let outcome = index(&catalog).await;
        match outcome.view() {
            Some(View::Index { dashboard, errors }) => {
                assert_eq!(dashboard.vendor_count, Some(1));
                assert_eq!(dashboard.category_count, Some(1));
                assert_eq!(dashboard.item_count, Some(0));
                assert!(errors.is_empty());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(outcome.view().unwrap().title(), "Local Watch Stock");
    }

    #[tokio::test]
    async fn test_index_tolerates_partial_failure() {
        let catalog = Catalog::new(Arc::new(BrokenItems(MemoryBackend::new())));
        catalog
            .vendors
            .create(Vendor::new("Cartier".into(), "d".into()))
            .await
            .unwrap();

        match index(&catalog).await.view() {
            Some(View::Index { dashboard, errors }) => {
                assert_eq!(dashboard.vendor_count, Some(1));
                assert_eq!(dashboard.category_count, Some(0));
                assert_eq!(dashboard.item_count, None);
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("items collection offline"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(Collection::Items, &id.to_string()).unwrap(), id);
        assert!(parse_id(Collection::Items, "not-an-id").unwrap_err().is_not_found());
    }
}
