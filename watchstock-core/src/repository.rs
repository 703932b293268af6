//! Typed repositories over the document store
//!
//! Each repository converts between `Record<E>` and stored documents and
//! runs the blocking backend call on tokio's blocking pool, so handlers can
//! issue several reads at once and join them.

use anyhow::{anyhow, Context};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::db::{self, DatabaseBackend, Document, Fields};
use crate::error::{CatalogError, Result};
use crate::models::{Category, Entity, Item, Record, Vendor};

/// Serializes an entity body into document fields
fn to_fields<E: Entity>(entity: &E) -> anyhow::Result<Fields> {
    match serde_json::to_value(entity)? {
        Value::Object(fields) => Ok(fields),
        other => Err(anyhow!(
            "{} serialized to a non-object value: {}",
            E::COLLECTION.kind(),
            other
        )),
    }
}

/// Reconstructs a record from a stored document
fn from_document<E: Entity>(document: Document) -> anyhow::Result<Record<E>> {
    let id = document.id;
    let data = serde_json::from_value(Value::Object(document.fields))
        .with_context(|| format!("Malformed {} document {}", E::COLLECTION.kind(), id))?;
    Ok(Record::new(id, data))
}

fn from_documents<E: Entity>(documents: Vec<Document>) -> anyhow::Result<Vec<Record<E>>> {
    documents.into_iter().map(from_document).collect()
}

/// Orders records ascending by their primary name field
fn sort_by_name<E: Entity>(records: &mut [Record<E>]) {
    records.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
}

/// Outcome of a create that may resolve to an existing record
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome<E> {
    Created(Record<E>),
    Existing(Record<E>),
}

impl<E> CreateOutcome<E> {
    pub fn record(&self) -> &Record<E> {
        match self {
            CreateOutcome::Created(record) | CreateOutcome::Existing(record) => record,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, CreateOutcome::Created(_))
    }
}

/// Data access for one entity type
pub struct Repository<E> {
    backend: Arc<dyn DatabaseBackend>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(backend: Arc<dyn DatabaseBackend>) -> Self {
        Self {
            backend,
            _entity: PhantomData,
        }
    }

    /// Runs a blocking backend operation off the async executor
    async fn run<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&dyn DatabaseBackend) -> anyhow::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let result = tokio::task::spawn_blocking(move || op(backend.as_ref())).await?;
        Ok(result?)
    }

    /// Single lookup by identifier
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Record<E>>> {
        debug!(collection = %E::COLLECTION, %id, "find_by_id");
        self.run(move |backend| {
            backend
                .find_by_id(E::COLLECTION, &id)?
                .map(from_document::<E>)
                .transpose()
        })
        .await
    }

    /// Lookup that treats a missing record as an error
    pub async fn get(&self, id: Uuid) -> Result<Record<E>> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::not_found(E::COLLECTION, id))
    }

    /// Every record, ascending by primary name
    pub async fn find_all(&self) -> Result<Vec<Record<E>>> {
        debug!(collection = %E::COLLECTION, "find_all");
        let mut records = self
            .run(|backend| from_documents::<E>(backend.find_all(E::COLLECTION)?))
            .await?;
        sort_by_name(&mut records);
        Ok(records)
    }

    /// Records whose field equals the value (or contains it, for list fields)
    pub async fn find_by_field(&self, field: &'static str, value: impl ToString) -> Result<Vec<Record<E>>> {
        let value = value.to_string();
        debug!(collection = %E::COLLECTION, field, %value, "find_by_field");
        self.run(move |backend| from_documents::<E>(backend.find_by_field(E::COLLECTION, field, &value)?))
            .await
    }

    /// Records for the given identifiers, in the order given; unknown ids are skipped
    pub async fn find_many(&self, ids: Vec<Uuid>) -> Result<Vec<Record<E>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let all = self.run(|backend| from_documents::<E>(backend.find_all(E::COLLECTION)?)).await?;
        Ok(ids
            .iter()
            .filter_map(|id| all.iter().find(|r| &r.id == id).cloned())
            .collect())
    }

    pub async fn count(&self) -> Result<usize> {
        self.run(|backend| backend.count(E::COLLECTION)).await
    }

    /// Inserts a new record; the store assigns its identifier
    pub async fn create(&self, entity: E) -> Result<Record<E>> {
        let fields = to_fields(&entity)?;
        let id = self.run(move |backend| backend.insert(E::COLLECTION, fields)).await?;
        Ok(Record::new(id, entity))
    }

    /// Replaces every field of an existing record, keeping its identifier
    /// Returns None if no record has that id
    pub async fn update(&self, id: Uuid, entity: E) -> Result<Option<Record<E>>> {
        let document = Document::new(id, to_fields(&entity)?);
        let replaced = self
            .run(move |backend| backend.replace(E::COLLECTION, &document))
            .await?;
        Ok(replaced.then(|| Record::new(id, entity)))
    }

    /// Removes a record unconditionally
    /// Returns false if no record has that id
    pub async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        self.run(move |backend| backend.remove(E::COLLECTION, &id)).await
    }
}

impl Repository<Category> {
    /// Creates a category unless one with the same name already exists,
    /// in which case the existing record is returned
    pub async fn create_unique(&self, category: Category) -> Result<CreateOutcome<Category>> {
        let existing = self
            .find_by_field("category_name", category.category_name.clone())
            .await?;
        if let Some(found) = existing.into_iter().next() {
            return Ok(CreateOutcome::Existing(found));
        }
        Ok(CreateOutcome::Created(self.create(category).await?))
    }
}

/// Handle to the whole catalog, passed explicitly to every handler
#[derive(Clone)]
pub struct Catalog {
    backend: Arc<dyn DatabaseBackend>,
    pub vendors: Repository<Vendor>,
    pub categories: Repository<Category>,
    pub items: Repository<Item>,
}

impl Catalog {
    pub fn new(backend: Arc<dyn DatabaseBackend>) -> Self {
        Self {
            vendors: Repository::new(Arc::clone(&backend)),
            categories: Repository::new(Arc::clone(&backend)),
            items: Repository::new(Arc::clone(&backend)),
            backend,
        }
    }

    /// Opens the store named by a connection string
    pub fn open(connection: &str) -> anyhow::Result<Self> {
        Ok(Self::new(db::open(connection)?))
    }

    /// A catalog over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(db::MemoryBackend::new()))
    }

    pub fn backend(&self) -> &Arc<dyn DatabaseBackend> {
        &self.backend
    }

    /// Items supplied by a vendor
    pub async fn items_by_vendor(&self, vendor: Uuid) -> Result<Vec<Record<Item>>> {
        self.items.find_by_field("vendor", vendor).await
    }

    /// Items filed under a category
    pub async fn items_by_category(&self, category: Uuid) -> Result<Vec<Record<Item>>> {
        self.items.find_by_field("category", category).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vendor(name: &str) -> Vendor {
        Vendor::new(name.to_string(), format!("{} description", name))
    }

    #[tokio::test]
    async fn test_create_assigns_fresh_ids() {
        let catalog = Catalog::in_memory();
        let first = catalog.vendors.create(vendor("Piaget")).await.unwrap();
        let second = catalog.vendors.create(vendor("Piaget")).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(catalog.vendors.count().await.unwrap(), 2);

        let loaded = catalog.vendors.find_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(loaded, first);
    }

    #[tokio::test]
    async fn test_find_all_sorted_by_name() {
        let catalog = Catalog::in_memory();
        for name in ["Piaget", "Blancpain", "Cartier"] {
            catalog.vendors.create(vendor(name)).await.unwrap();
        }

        let names: Vec<_> = catalog
            .vendors
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.data.company_name)
            .collect();
        assert_eq!(names, vec!["Blancpain", "Cartier", "Piaget"]);
    }

    #[tokio::test]
    async fn test_update_keeps_identifier() {
        let catalog = Catalog::in_memory();
        let created = catalog.vendors.create(vendor("Piaget")).await.unwrap();

        let mut changed = created.data.clone();
        changed.description = "Thinnest automatic".into();
        let updated = catalog.vendors.update(created.id, changed.clone()).await.unwrap().unwrap();
        assert_eq!(updated.id, created.id);

        let loaded = catalog.vendors.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(loaded.data, changed);

        let missing = catalog.vendors.update(Uuid::new_v4(), changed).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_category_create_unique_by_name() {
        let catalog = Catalog::in_memory();
        let dress = Category::new("Dress".into(), "Elegant".into());

        let first = catalog.categories.create_unique(dress.clone()).await.unwrap();
        let second = catalog.categories.create_unique(dress).await.unwrap();

        assert!(first.was_created());
        assert!(!second.was_created());
        assert_eq!(first.record().id, second.record().id);
        assert_eq!(catalog.categories.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reverse_lookups_and_delete() {
        let catalog = Catalog::in_memory();
        let v = catalog.vendors.create(vendor("Cartier")).await.unwrap();
        let c = catalog
            .categories
            .create(Category::new("Dress".into(), "d".into()))
            .await
            .unwrap();

        let mut item = Item::new("Tank".into(), "Rectangular".into(), v.id, 5000.0, 2.0);
        item.category.push(c.id);
        let item = catalog.items.create(item).await.unwrap();

        let by_vendor = catalog.items_by_vendor(v.id).await.unwrap();
        assert_eq!(by_vendor.len(), 1);
        assert_eq!(by_vendor[0].id, item.id);
        assert_eq!(catalog.items_by_category(c.id).await.unwrap().len(), 1);
        assert!(catalog.items_by_vendor(Uuid::new_v4()).await.unwrap().is_empty());

        assert!(catalog.items.delete_by_id(item.id).await.unwrap());
        assert!(!catalog.items.delete_by_id(item.id).await.unwrap());
        assert!(catalog.items_by_vendor(v.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_many_preserves_order_and_skips_unknown() {
        let catalog = Catalog::in_memory();
        let a = catalog.categories.create(Category::new("A".into(), "a".into())).await.unwrap();
        let b = catalog.categories.create(Category::new("B".into(), "b".into())).await.unwrap();

        let found = catalog
            .categories
            .find_many(vec![b.id, Uuid::new_v4(), a.id])
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }
}
