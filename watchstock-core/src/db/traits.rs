//! Database abstraction traits
//!
//! This module defines the core trait that all storage backends must implement.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::Collection;

/// Field map of a stored document, excluding its identifier
pub type Fields = serde_json::Map<String, Value>;

/// Types of database backends available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// YAML file storage (single file)
    Yaml,
    /// SQLite database storage
    Sqlite,
    /// Process-local storage, lost on exit
    Memory,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Yaml => write!(f, "YAML"),
            BackendType::Sqlite => write!(f, "SQLite"),
            BackendType::Memory => write!(f, "Memory"),
        }
    }
}

/// A single stored record: an identifier plus arbitrary fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,

    #[serde(flatten)]
    pub fields: Fields,
}

impl Document {
    pub fn new(id: Uuid, fields: Fields) -> Self {
        Self { id, fields }
    }

    /// Equality match on a field. An array field matches when any of its
    /// elements equals the value.
    pub fn field_matches(&self, field: &str, value: &str) -> bool {
        if field == "id" {
            return self.id.to_string() == value;
        }
        match self.fields.get(field) {
            Some(Value::Array(values)) => values.iter().any(|v| scalar_matches(v, value)),
            Some(other) => scalar_matches(other, value),
            None => false,
        }
    }
}

fn scalar_matches(stored: &Value, value: &str) -> bool {
    match stored {
        Value::String(s) => s == value,
        Value::Number(n) => n.to_string() == value,
        Value::Bool(b) => b.to_string() == value,
        _ => false,
    }
}

/// Every collection held in one structure, used by whole-store backends
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogStore {
    #[serde(default)]
    pub vendors: Vec<Document>,
    #[serde(default)]
    pub categories: Vec<Document>,
    #[serde(default)]
    pub items: Vec<Document>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(&self, collection: Collection) -> &Vec<Document> {
        match collection {
            Collection::Vendors => &self.vendors,
            Collection::Categories => &self.categories,
            Collection::Items => &self.items,
        }
    }

    pub fn collection_mut(&mut self, collection: Collection) -> &mut Vec<Document> {
        match collection {
            Collection::Vendors => &mut self.vendors,
            Collection::Categories => &mut self.categories,
            Collection::Items => &mut self.items,
        }
    }
}

/// Core trait for database backends
///
/// Every collection is a list of documents keyed by a store-assigned UUID.
/// - `load()` and `save()` work with the full `CatalogStore`
/// - Per-collection operations default to load/modify/save; backends with
///   real query support override them
pub trait DatabaseBackend: Send + Sync {
    /// Returns the backend type
    fn backend_type(&self) -> BackendType;

    /// Where the data lives, for logging
    fn location(&self) -> String;

    // =========================================================================
    // Full Store Operations
    // =========================================================================

    /// Loads every collection
    fn load(&self) -> Result<CatalogStore>;

    /// Replaces every collection
    fn save(&self, store: &CatalogStore) -> Result<()>;

    /// Performs an atomic read-modify-write of the whole store
    /// Default implementation loads, applies changes, and saves
    fn update_atomically(&self, update_fn: &mut dyn FnMut(&mut CatalogStore)) -> Result<CatalogStore> {
        let mut store = self.load()?;
        update_fn(&mut store);
        self.save(&store)?;
        Ok(store)
    }

    // =========================================================================
    // Document Operations
    // =========================================================================

    /// Gets a document by id
    fn find_by_id(&self, collection: Collection, id: &Uuid) -> Result<Option<Document>> {
        let store = self.load()?;
        Ok(store
            .collection(collection)
            .iter()
            .find(|d| &d.id == id)
            .cloned())
    }

    /// Lists every document of a collection in insertion order
    fn find_all(&self, collection: Collection) -> Result<Vec<Document>> {
        let mut store = self.load()?;
        Ok(std::mem::take(store.collection_mut(collection)))
    }

    /// Lists the documents whose field equals (or, for arrays, contains) the value
    fn find_by_field(&self, collection: Collection, field: &str, value: &str) -> Result<Vec<Document>> {
        let store = self.load()?;
        Ok(store
            .collection(collection)
            .iter()
            .filter(|d| d.field_matches(field, value))
            .cloned()
            .collect())
    }

    /// Counts the documents of a collection
    fn count(&self, collection: Collection) -> Result<usize> {
        Ok(self.load()?.collection(collection).len())
    }

    /// Inserts a new document and returns its freshly assigned id
    fn insert(&self, collection: Collection, fields: Fields) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let mut fields = Some(fields);
        self.update_atomically(&mut |store| {
            if let Some(fields) = fields.take() {
                store.collection_mut(collection).push(Document::new(id, fields));
            }
        })?;
        Ok(id)
    }

    /// Replaces the fields of an existing document
    /// Returns false if no document has that id
    fn replace(&self, collection: Collection, document: &Document) -> Result<bool> {
        let mut replaced = false;
        self.update_atomically(&mut |store| {
            let docs = store.collection_mut(collection);
            if let Some(pos) = docs.iter().position(|d| d.id == document.id) {
                docs[pos] = document.clone();
                replaced = true;
            }
        })?;
        Ok(replaced)
    }

    /// Removes a document by id
    /// Returns false if no document has that id
    fn remove(&self, collection: Collection, id: &Uuid) -> Result<bool> {
        let mut removed = false;
        self.update_atomically(&mut |store| {
            let docs = store.collection_mut(collection);
            let original_len = docs.len();
            docs.retain(|d| &d.id != id);
            removed = docs.len() != original_len;
        })?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: Value) -> Document {
        match fields {
            Value::Object(map) => Document::new(Uuid::new_v4(), map),
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_field_matches_scalar_and_array() {
        let vendor = Uuid::new_v4().to_string();
        let category = Uuid::new_v4().to_string();
        let d = doc(json!({ "vendor": vendor, "category": [category], "stock": 5 }));

        assert!(d.field_matches("vendor", &vendor));
        assert!(d.field_matches("category", &category));
        assert!(d.field_matches("stock", "5"));
        assert!(!d.field_matches("vendor", &category));
        assert!(!d.field_matches("missing", &vendor));
        assert!(d.field_matches("id", &d.id.to_string()));
    }

    #[test]
    fn test_document_serializes_flat() {
        let d = doc(json!({ "category_name": "Dress" }));
        let value = serde_json::to_value(&d).unwrap();
        assert_eq!(value["category_name"], json!("Dress"));
        assert_eq!(value["id"], json!(d.id.to_string()));
    }
}
