//! Recursive discovery of indexable files under a set of root folders.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::types::normalize_extension;

/// Walks every root and returns regular files whose extension is in
/// `extensions` (case-insensitive, with or without a leading dot).
/// The result is sorted and free of duplicates even when roots overlap.
pub fn discover_files<P: AsRef<Path>, S: AsRef<str>>(roots: &[P], extensions: &[S]) -> Vec<PathBuf> {
    let wanted: BTreeSet<String> = extensions.iter().map(|e| normalize_extension(e.as_ref())).collect();
    let mut files = BTreeSet::new();
    for root in roots {
        let root = root.as_ref();
        if !root.exists() {
            tracing::warn!(root = %root.display(), "Skipping missing search folder");
            continue;
        }
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            let ext = path.extension().map(|e| normalize_extension(&e.to_string_lossy())).unwrap_or_default();
            if wanted.contains(&ext) {
                files.insert(path.to_path_buf());
            }
        }
    }
    files.into_iter().collect()
}
