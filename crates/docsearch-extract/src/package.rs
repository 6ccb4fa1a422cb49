//! Zip-packaged XML documents (hwpx, xlsx).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use docsearch_core::ExtractionError;
use zip::result::ZipError;
use zip::ZipArchive;

pub(crate) type Archive = ZipArchive<File>;

pub(crate) fn open_archive(path: &Path, format: &'static str) -> Result<Archive, ExtractionError> {
    let file = File::open(path).map_err(|e| ExtractionError::io(path, e))?;
    ZipArchive::new(file).map_err(|e| malformed(format, e))
}

/// Reads a named part as UTF-8. A missing part is `Ok(None)`.
pub(crate) fn read_entry(archive: &mut Archive, name: &str, format: &'static str) -> Result<Option<String>, ExtractionError> {
    match archive.by_name(name) {
        Ok(mut entry) => {
            let mut xml = String::new();
            entry.read_to_string(&mut xml).map_err(|e| malformed(format, e))?;
            Ok(Some(xml))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(malformed(format, e)),
    }
}

pub(crate) fn malformed(format: &'static str, err: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::Malformed { format, message: err.to_string() }
}
