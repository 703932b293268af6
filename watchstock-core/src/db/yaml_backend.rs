//! YAML file storage backend
//!
//! This backend stores every collection in a single YAML file, using the
//! locking `Storage` for each read and write.

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::traits::{BackendType, CatalogStore, DatabaseBackend};
use crate::storage::Storage;

/// YAML file backend implementation
pub struct YamlBackend {
    storage: Storage,
    path: PathBuf,
}

impl YamlBackend {
    /// Creates a new YAML backend for the given file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            storage: Storage::new(&path),
            path,
        }
    }
}

impl DatabaseBackend for YamlBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Yaml
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<CatalogStore> {
        self.storage.load()
    }

    fn save(&self, store: &CatalogStore) -> Result<()> {
        self.storage.save(store)
    }

    fn update_atomically(&self, update_fn: &mut dyn FnMut(&mut CatalogStore)) -> Result<CatalogStore> {
        self.storage.update_atomically(|store| update_fn(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Collection;
    use serde_json::json;
    use tempfile::TempDir;

    fn fields(value: serde_json::Value) -> crate::db::Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_yaml_backend_document_crud() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.yaml");
        let backend = YamlBackend::new(&path);

        let id = backend
            .insert(Collection::Vendors, fields(json!({ "company_name": "Piaget" })))
            .unwrap();
        let loaded = backend.find_by_id(Collection::Vendors, &id).unwrap().unwrap();
        assert_eq!(loaded.fields["company_name"], json!("Piaget"));
        assert_eq!(backend.count(Collection::Vendors).unwrap(), 1);
        assert_eq!(backend.count(Collection::Items).unwrap(), 0);

        let mut updated = loaded.clone();
        updated.fields.insert("company_name".into(), json!("Cartier"));
        assert!(backend.replace(Collection::Vendors, &updated).unwrap());

        // A second backend on the same file sees the change
        let other = YamlBackend::new(&path);
        let reloaded = other.find_by_id(Collection::Vendors, &id).unwrap().unwrap();
        assert_eq!(reloaded.fields["company_name"], json!("Cartier"));

        assert!(backend.remove(Collection::Vendors, &id).unwrap());
        assert!(!backend.remove(Collection::Vendors, &id).unwrap());
        assert!(backend.find_by_id(Collection::Vendors, &id).unwrap().is_none());
    }

    #[test]
    fn test_yaml_backend_find_by_field() {
        let temp_dir = TempDir::new().unwrap();
        let backend = YamlBackend::new(temp_dir.path().join("catalog.yaml"));

        let category = uuid::Uuid::new_v4().to_string();
        backend
            .insert(Collection::Items, fields(json!({ "name": "a", "category": [category] })))
            .unwrap();
        backend
            .insert(Collection::Items, fields(json!({ "name": "b", "category": [] })))
            .unwrap();

        let found = backend.find_by_field(Collection::Items, "category", &category).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].fields["name"], json!("a"));
    }
}
