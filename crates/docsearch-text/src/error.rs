use std::path::PathBuf;

use tantivy::TantivyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to open index at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: TantivyError,
    },

    /// Another writer holds the index lock.
    #[error("Index is locked by another writer: {0}")]
    Lock(String),

    /// Fatal to the whole batch; nothing from the batch becomes visible.
    #[error("Index write failed: {0}")]
    IndexWrite(String),

    #[error("Search failed: {0}")]
    Search(#[from] TantivyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn from_writer(err: TantivyError) -> Self {
        match err {
            TantivyError::LockFailure(lock, detail) => {
                Self::Lock(detail.unwrap_or_else(|| lock.to_string()))
            }
            other => Self::IndexWrite(other.to_string()),
        }
    }

    #[must_use]
    pub fn is_lock(&self) -> bool {
        matches!(self, Self::Lock(_))
    }
}

#[derive(Debug, Error)]
pub enum QueryParseError {
    #[error("Query is empty")]
    Empty,

    #[error("Query has no searchable words: '{0}'")]
    NoTerms(String),
}
