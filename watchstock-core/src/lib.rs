pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod models;
pub mod repository;
pub mod seed;
pub mod storage;
pub mod validation;
pub mod views;

// Re-export commonly used types
pub use config::{settings_path, Settings};
pub use db::{create_backend, BackendType, ConnectionTarget, DatabaseBackend};
pub use error::{CatalogError, Result};
pub use models::{entity_url, Category, Collection, Entity, Item, Record, Vendor, MAX_NAME_LENGTH};
pub use repository::{Catalog, CreateOutcome, Repository};
pub use seed::{populate, SeedSummary};
pub use storage::Storage;
pub use validation::{CategoryForm, EntityForm, FieldError, FormData, ItemForm, Validated, VendorForm};
pub use views::{FormMode, Outcome, Renderer, View, SITE_TITLE};
