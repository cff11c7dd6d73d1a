//! Catalog error types.

use thiserror::Error;

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Failures surfaced by [`CatalogStore`](crate::CatalogStore) and the
/// string forms of catalog enums. Backend errors are carried as text.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot open update catalog: {0}")]
    Open(String),

    #[error("catalog transaction failed: {0}")]
    Transaction(String),

    #[error("catalog table unavailable: {0}")]
    Table(String),

    #[error("cannot read update records: {0}")]
    Read(String),

    #[error("cannot write update record: {0}")]
    Write(String),

    #[error("cannot encode update record: {0}")]
    Serialize(String),

    #[error("stored update record is corrupt: {0}")]
    Deserialize(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("unknown filter `{0}`")]
    InvalidFilter(String),
}
