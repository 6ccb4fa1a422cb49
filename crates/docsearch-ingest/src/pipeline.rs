use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use docsearch_core::{ContentExtractor, Document, ExtractionError};
use docsearch_text::IndexStore;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info, warn};

use crate::error::{IngestError, JobError};
use crate::progress::Progress;

pub const DEFAULT_CONCURRENCY: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    /// Documents made visible by the commit.
    pub indexed: usize,
    /// Files skipped because extraction failed.
    pub failed: usize,
    pub total: usize,
    /// Progress events delivered before cancellation was observed.
    pub reported: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Completed(IngestSummary),
    /// Cancellation only stopped progress reporting; every dispatched job
    /// still finished and its result was committed.
    Cancelled(IngestSummary),
}

impl IngestOutcome {
    pub fn summary(&self) -> &IngestSummary {
        match self {
            Self::Completed(s) | Self::Cancelled(s) => s,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

pub struct IngestPipeline {
    extractor: Arc<dyn ContentExtractor>,
    concurrency: usize,
}

impl IngestPipeline {
    pub fn new(extractor: Arc<dyn ContentExtractor>) -> Self {
        Self { extractor, concurrency: DEFAULT_CONCURRENCY }
    }

    /// Pool width; clamped to at least one worker.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Extracts every path on the pool, waits for all jobs, then upserts the
    /// successes and commits once.
    ///
    /// `progress` runs on the calling thread after each completion and
    /// `cancel` is polled right after it. Once `cancel` returns true no more
    /// progress is reported, but the remaining results are still drained and
    /// committed. A store failure in the commit phase aborts the run with
    /// nothing committed.
    pub fn run<P, C>(
        &self,
        store: &IndexStore,
        paths: &[PathBuf],
        mut progress: P,
        cancel: C,
    ) -> Result<IngestOutcome, IngestError>
    where
        P: FnMut(&Progress<'_>),
        C: Fn() -> bool,
    {
        let started = Instant::now();
        let total = paths.len();
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .thread_name(|i| format!("docsearch-extract-{i}"))
            .build()?;
        info!(total, concurrency = self.concurrency, "Starting extraction");

        let (tx, rx) = crossbeam_channel::unbounded::<(PathBuf, Result<Document, JobError>)>();
        for path in paths {
            let tx = tx.clone();
            let extractor = Arc::clone(&self.extractor);
            let path = path.clone();
            pool.spawn(move || {
                let result = extract_document(extractor.as_ref(), &path);
                // The receiver outlives every job, so a send cannot fail.
                let _ = tx.send((path, result));
            });
        }
        drop(tx);

        let mut documents = Vec::with_capacity(total);
        let mut failed = 0;
        let mut completed = 0;
        let mut reported = 0;
        let mut cancelled = false;
        // Ends once every job has dropped its sender: the join barrier.
        for (path, result) in rx {
            completed += 1;
            match result {
                Ok(document) => {
                    debug!(path = %path.display(), chars = document.content.len(), "Extracted");
                    documents.push(document);
                }
                Err(err) => {
                    failed += 1;
                    warn!(path = %path.display(), error = %err, "Skipping file");
                }
            }
            if cancelled {
                continue;
            }
            progress(&Progress { completed, total, elapsed: started.elapsed(), path: &path });
            reported += 1;
            if cancel() {
                cancelled = true;
                info!(completed, total, "Cancellation requested; draining remaining jobs");
            }
        }

        let mut batch = store.begin_batch()?;
        for document in &documents {
            batch.upsert(document)?;
        }
        let indexed = batch.commit()?;

        let summary = IngestSummary { indexed, failed, total, reported, elapsed: started.elapsed() };
        info!(
            indexed,
            failed,
            total,
            cancelled,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Ingestion finished"
        );
        Ok(if cancelled { IngestOutcome::Cancelled(summary) } else { IngestOutcome::Completed(summary) })
    }
}

/// Structural failures degrade to empty content so the file stays
/// searchable by name; anything else drops the file from the batch.
fn extract_document(extractor: &dyn ContentExtractor, path: &Path) -> Result<Document, JobError> {
    let modified = std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|err| ExtractionError::io(path, err))?;
    let content = match catch_unwind(AssertUnwindSafe(|| extractor.extract(path))) {
        Ok(Ok(text)) => text,
        Ok(Err(err)) if err.degrades_to_empty() => {
            warn!(path = %path.display(), error = %err, "Indexing without content");
            String::new()
        }
        Ok(Err(err)) => return Err(err.into()),
        Err(panic) => return Err(JobError::Panicked(panic_message(panic.as_ref()))),
    };
    Ok(Document::from_path(path, content, DateTime::<Utc>::from(modified)))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
