use std::fs;
use std::path::Path;

use docsearch_core::ExtractionError;

pub(crate) fn extract(path: &Path) -> Result<String, ExtractionError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            let bytes = fs::read(path).map_err(|e| ExtractionError::io(path, e))?;
            Ok(String::from_utf8_lossy(&bytes).to_string())
        }
        Err(e) => Err(ExtractionError::io(path, e)),
    }
}
