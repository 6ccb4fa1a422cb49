//! docsearch-extract
//!
//! Plain-text extraction for the supported document formats. Formats are a
//! closed set dispatched through an extension table; adding a format means
//! adding a `Format` variant and a table entry.

mod command;
mod hwpx;
mod package;
mod text;
mod xlsx;

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::Path;

use docsearch_core::config::ExtractSettings;
use docsearch_core::types::normalize_extension;
use docsearch_core::{ContentExtractor, ExtractionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Hangul word processor (binary), via `hwp5txt`.
    Hwp,
    /// Hangul OWPML package (zip of XML parts).
    Hwpx,
    /// PDF, via `pdftotext`.
    Pdf,
    /// Legacy Excel workbook, via `xls2csv`.
    Xls,
    /// Office Open XML workbook.
    Xlsx,
    PlainText,
}

impl Format {
    pub fn name(self) -> &'static str {
        match self {
            Self::Hwp => "hwp",
            Self::Hwpx => "hwpx",
            Self::Pdf => "pdf",
            Self::Xls => "xls",
            Self::Xlsx => "xlsx",
            Self::PlainText => "text",
        }
    }
}

/// Extension to format dispatch table. Keys are normalized (`.pdf`).
#[derive(Debug, Clone)]
pub struct FormatTable {
    by_extension: BTreeMap<String, Format>,
}

impl Default for FormatTable {
    fn default() -> Self {
        Self::empty()
            .with("hwp", Format::Hwp)
            .with("hwpx", Format::Hwpx)
            .with("pdf", Format::Pdf)
            .with("xls", Format::Xls)
            .with("xlsx", Format::Xlsx)
            .with("txt", Format::PlainText)
    }
}

impl FormatTable {
    pub fn empty() -> Self {
        Self { by_extension: BTreeMap::new() }
    }

    #[must_use]
    pub fn with(mut self, extension: &str, format: Format) -> Self {
        self.by_extension.insert(normalize_extension(extension), format);
        self
    }

    pub fn lookup(&self, path: &Path) -> Result<Format, ExtractionError> {
        let ext = path.extension().map(|e| normalize_extension(&e.to_string_lossy())).unwrap_or_default();
        self.by_extension
            .get(&ext)
            .copied()
            .ok_or_else(|| ExtractionError::UnsupportedFormat(if ext.is_empty() { path.display().to_string() } else { ext }))
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.by_extension.keys().map(String::as_str)
    }
}

/// The production extractor: table dispatch plus the external tool names.
#[derive(Debug, Clone, Default)]
pub struct DocumentExtractor {
    table: FormatTable,
    tools: ExtractSettings,
}

impl DocumentExtractor {
    pub fn new(tools: ExtractSettings) -> Self {
        Self { table: FormatTable::default(), tools }
    }

    #[must_use]
    pub fn with_table(mut self, table: FormatTable) -> Self {
        self.table = table;
        self
    }

    pub fn table(&self) -> &FormatTable {
        &self.table
    }
}

impl ContentExtractor for DocumentExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let format = self.table.lookup(path)?;
        tracing::debug!(path = %path.display(), format = format.name(), "Extracting");
        match format {
            Format::Hwp => command::run_tool(&self.tools.hwp5txt, [path.as_os_str()]),
            Format::Pdf => command::run_tool(
                &self.tools.pdftotext,
                [OsStr::new("-enc"), OsStr::new("UTF-8"), path.as_os_str(), OsStr::new("-")],
            ),
            Format::Xls => command::run_tool(&self.tools.xls2csv, [path.as_os_str()]),
            Format::Hwpx => hwpx::extract(path),
            Format::Xlsx => xlsx::extract(path),
            Format::PlainText => text::extract(path),
        }
    }
}
