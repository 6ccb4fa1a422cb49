//! Domain types used by the index, query and ingestion crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::ParseModeError;

/// One indexed file. `path` is the unique key.
///
/// - `filename`: final path component, as shown to the user
/// - `extension`: lowercase extension including the leading dot (`.pdf`),
///   empty when the file has none
/// - `content`: extracted plain text; may be empty, in which case the
///   document is still found by filename
/// - `modified`: file modification time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub path: String,
    pub filename: String,
    pub extension: String,
    pub content: String,
    pub modified: DateTime<Utc>,
}

impl Document {
    pub fn from_path(path: &Path, content: String, modified: DateTime<Utc>) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| normalize_extension(&e.to_string_lossy()))
            .unwrap_or_default();
        Self { path: path.to_string_lossy().to_string(), filename, extension, content, modified }
    }
}

/// Lowercases and prefixes a dot: `"PDF"`, `".pdf"` and `"pdf"` all become `".pdf"`.
pub fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(".{}", trimmed.to_lowercase())
    }
}

/// How query terms combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoolMode {
    /// Every term must match in filename or content.
    And,
    /// At least one term must match.
    #[default]
    Or,
}

impl FromStr for BoolMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            _ => Err(ParseModeError { kind: "boolean mode", value: s.to_string() }),
        }
    }
}

impl fmt::Display for BoolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "AND",
            Self::Or => "OR",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// BM25 score, descending.
    #[default]
    Relevance,
    /// Modification time, newest first.
    Date,
}

impl FromStr for SortMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relevance" => Ok(Self::Relevance),
            "date" => Ok(Self::Date),
            _ => Err(ParseModeError { kind: "sort mode", value: s.to_string() }),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Relevance => "relevance",
            Self::Date => "date",
        })
    }
}

/// Client-side extension post-filter. The default lets everything through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionFilter {
    allowed: Option<BTreeSet<String>>,
}

impl ExtensionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = extensions.into_iter().map(|e| normalize_extension(e.as_ref())).collect();
        Self { allowed: Some(allowed) }
    }

    pub fn is_all(&self) -> bool {
        self.allowed.is_none()
    }

    pub fn allows(&self, extension: &str) -> bool {
        match &self.allowed {
            None => true,
            Some(set) => set.contains(&normalize_extension(extension)),
        }
    }
}

/// One search call: query text, boolean mode, sort policy and extension filter.
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub query: String,
    pub mode: BoolMode,
    pub sort: SortMode,
    pub extensions: ExtensionFilter,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), ..Self::default() }
    }

    #[must_use]
    pub fn mode(mut self, mode: BoolMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn extensions(mut self, filter: ExtensionFilter) -> Self {
        self.extensions = filter;
        self
    }
}

/// A detached copy of a stored document plus its position in the result window.
///
/// `rank` is 1-based and assigned before extension filtering, so filtered
/// results keep their original ranks. `score` is set for relevance sorting only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub rank: usize,
    pub score: Option<f32>,
    #[serde(flatten)]
    pub document: Document,
}
