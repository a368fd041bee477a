//! Catalog error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading a field catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Mapping file could not be read
    #[error("Failed to read mapping {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Mapping document is not valid JSON
    #[error("Failed to parse mapping: {0}")]
    Parse(#[from] serde_json::Error),

    /// Mapping document lacks `mappings.properties` for an index
    #[error("Invalid mapping structure for index '{0}'")]
    InvalidMapping(String),
}

/// Result type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
