//! docsearch-ingest
//!
//! Turns a list of discovered paths into committed index documents:
//! parallel extraction on a fixed-width pool, a join barrier, then one
//! sequential commit phase. [`Reindexer`] wraps the pipeline in a session
//! that allows a single run at a time.

pub mod error;
pub mod pipeline;
pub mod progress;
pub mod session;

pub use error::{IngestError, JobError};
pub use pipeline::{IngestOutcome, IngestPipeline, IngestSummary, DEFAULT_CONCURRENCY};
pub use progress::Progress;
pub use session::{IndexSession, ReindexResult, Reindexer, SessionState};
