//! docsearch-text
//!
//! Tantivy-backed document index: the persistent store, the query engine
//! and snippet generation for result previews.

pub mod error;
pub mod query;
pub mod snippet;
pub mod store;
pub mod tantivy_utils;

pub use error::{QueryParseError, StoreError};
pub use query::{filter_extensions, QueryEngine, SearchResponse, SearchStatus};
pub use snippet::{generate_snippet, SnippetGenerator};
pub use store::{BatchWriter, IndexStore, StoreOptions, RESULT_LIMIT};
