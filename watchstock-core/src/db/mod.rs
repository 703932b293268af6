//! Database abstraction layer for the watchstock catalog
//!
//! This module provides a trait-based abstraction for storage backends,
//! allowing the catalog to live in SQLite, a YAML file, or memory while
//! the repositories see a single document-store interface.

mod memory_backend;
mod sqlite_backend;
mod traits;
mod yaml_backend;

pub use memory_backend::MemoryBackend;
pub use sqlite_backend::SqliteBackend;
pub use traits::{BackendType, CatalogStore, DatabaseBackend, Document, Fields};
pub use yaml_backend::YamlBackend;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A parsed store connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub backend_type: BackendType,
    pub path: Option<PathBuf>,
}

impl ConnectionTarget {
    /// Parses `sqlite://path`, `yaml://path`, `memory://`, or a bare path
    /// whose extension selects the backend
    pub fn parse(connection: &str) -> Result<Self> {
        let connection = connection.trim();
        if connection.is_empty() {
            anyhow::bail!("Empty database connection string");
        }

        if let Some((scheme, rest)) = connection.split_once("://") {
            let backend_type = match scheme.to_lowercase().as_str() {
                "sqlite" => BackendType::Sqlite,
                "yaml" | "yml" => BackendType::Yaml,
                "memory" | "mem" => BackendType::Memory,
                other => anyhow::bail!("Unsupported database scheme '{}://'", other),
            };
            let path = match backend_type {
                BackendType::Memory => None,
                _ if rest.is_empty() => {
                    anyhow::bail!("Database connection '{}' is missing a path", connection)
                }
                _ => Some(PathBuf::from(rest)),
            };
            return Ok(Self { backend_type, path });
        }

        let path = Path::new(connection);
        let backend_type = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => BackendType::Yaml,
            Some("db") | Some("sqlite") | Some("sqlite3") => BackendType::Sqlite,
            _ => anyhow::bail!(
                "Cannot infer database type from '{}'; use sqlite://, yaml:// or memory://",
                connection
            ),
        };
        Ok(Self {
            backend_type,
            path: Some(path.to_path_buf()),
        })
    }
}

/// Creates a database backend from a parsed target
pub fn create_backend(target: &ConnectionTarget) -> Result<Arc<dyn DatabaseBackend>> {
    let backend: Arc<dyn DatabaseBackend> = match (target.backend_type, &target.path) {
        (BackendType::Memory, _) => Arc::new(MemoryBackend::new()),
        (BackendType::Yaml, Some(path)) => Arc::new(YamlBackend::new(path)),
        (BackendType::Sqlite, Some(path)) => Arc::new(SqliteBackend::new(path)?),
        (backend_type, None) => anyhow::bail!("{} backend requires a path", backend_type),
    };
    Ok(backend)
}

/// Opens the store named by a connection string
pub fn open(connection: &str) -> Result<Arc<dyn DatabaseBackend>> {
    create_backend(&ConnectionTarget::parse(connection)?)
}
