//! Model error types.

use thiserror::Error;

/// Errors that can occur while maintaining a view.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("catalog error: {0}")]
    Catalog(#[from] sysupdate_catalog::CatalogError),

    #[error("invalid image version: {0}")]
    InvalidVersion(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
