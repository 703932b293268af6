use thiserror::Error;

use crate::models::Collection;

/// Errors surfaced by repositories and request handlers
///
/// Validation failures are not errors: they are returned alongside the
/// sanitized form so the page can be re-rendered.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No record with the requested identifier
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Any failure of the persistence layer
    #[error("Store error: {0:#}")]
    Store(#[from] anyhow::Error),

    /// A concurrent read task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(String),
}

impl CatalogError {
    pub fn not_found(collection: Collection, id: impl ToString) -> Self {
        CatalogError::NotFound {
            kind: collection.kind(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }
}

impl From<tokio::task::JoinError> for CatalogError {
    fn from(err: tokio::task::JoinError) -> Self {
        CatalogError::Task(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = CatalogError::not_found(Collection::Vendors, "abc");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Vendor not found: abc");
    }

    #[test]
    fn test_store_error_keeps_context() {
        let err: CatalogError = anyhow::anyhow!("disk full").context("Failed to write").into();
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "Store error: Failed to write: disk full");
    }
}
