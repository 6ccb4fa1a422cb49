use std::path::Path;

use crate::error::ExtractionError;

/// Turns a file on disk into plain text.
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

impl<F> ContentExtractor for F
where
    F: Fn(&Path) -> Result<String, ExtractionError> + Send + Sync,
{
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        self(path)
    }
}
