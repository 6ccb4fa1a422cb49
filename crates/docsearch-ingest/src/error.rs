use docsearch_core::ExtractionError;
use docsearch_text::StoreError;
use thiserror::Error;

/// Failure of a whole ingestion run. Per-file problems never surface here.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to start extraction pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a single file was left out of the commit.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error("extractor panicked: {0}")]
    Panicked(String),
}
