//! docsearch-core
//!
//! Domain types shared by the extraction, index and ingestion crates, the
//! extraction error taxonomy, configuration loading and file discovery.

pub mod config;
pub mod discovery;
pub mod error;
pub mod traits;
pub mod types;

pub use error::ExtractionError;
pub use traits::ContentExtractor;
pub use types::{BoolMode, Document, ExtensionFilter, QueryRequest, SearchHit, SortMode};
