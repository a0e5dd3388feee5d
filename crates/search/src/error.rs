use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),

    #[error("Invalid lexicon: {0}")]
    InvalidLexicon(String),

    #[error("Mapping fetch failed: {0}")]
    MappingFetch(String),
}

/// Reasons a single dataset could not be turned into a payload.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("dataset file not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("dataset reference escapes the store root: {reference}")]
    OutsideRoot { reference: String },

    #[error("failed to read dataset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dataset {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
