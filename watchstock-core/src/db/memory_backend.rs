//! In-memory storage backend
//!
//! Holds the catalog in process memory. Nothing survives a restart; used by
//! tests and for throwaway demo servers.

use anyhow::{anyhow, Result};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::traits::{BackendType, CatalogStore, DatabaseBackend};

#[derive(Default)]
pub struct MemoryBackend {
    store: RwLock<CatalogStore>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CatalogStore>> {
        self.store.read().map_err(|_| anyhow!("In-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CatalogStore>> {
        self.store.write().map_err(|_| anyhow!("In-memory store lock poisoned"))
    }
}

impl DatabaseBackend for MemoryBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }

    fn location(&self) -> String {
        "memory://".to_string()
    }

    fn load(&self) -> Result<CatalogStore> {
        Ok(self.read()?.clone())
    }

    fn save(&self, store: &CatalogStore) -> Result<()> {
        *self.write()? = store.clone();
        Ok(())
    }

    fn update_atomically(&self, update_fn: &mut dyn FnMut(&mut CatalogStore)) -> Result<CatalogStore> {
        let mut guard = self.write()?;
        update_fn(&mut *guard);
        Ok(guard.clone())
    }

    fn count(&self, collection: crate::models::Collection) -> Result<usize> {
        Ok(self.read()?.collection(collection).len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Collection;
    use serde_json::json;

    #[test]
    fn test_memory_backend_assigns_distinct_ids() {
        let backend = MemoryBackend::new();
        let fields = json!({ "category_name": "Dress" }).as_object().cloned().unwrap();

        let first = backend.insert(Collection::Categories, fields.clone()).unwrap();
        let second = backend.insert(Collection::Categories, fields).unwrap();

        assert_ne!(first, second);
        assert_eq!(backend.count(Collection::Categories).unwrap(), 2);
        assert_eq!(backend.backend_type(), BackendType::Memory);
    }

    #[test]
    fn test_memory_backend_replace_unknown_id() {
        let backend = MemoryBackend::new();
        let doc = crate::db::Document::new(uuid::Uuid::new_v4(), Default::default());
        assert!(!backend.replace(Collection::Items, &doc).unwrap());
    }
}
