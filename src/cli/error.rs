//! CLI error types and conversions

use crate::ingest::IngestError;
use crate::store::StoreError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Ingestion error
    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Metrics system error
    #[error("metrics error: {0}")]
    Metrics(String),
}
