use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use docsearch_text::IndexStore;
use tracing::{info, warn};

use crate::error::IngestError;
use crate::pipeline::{IngestOutcome, IngestPipeline};
use crate::progress::Progress;

/// `Idle -> Indexing -> {Completed, Cancelled}`. The terminal states are
/// resting states: a new run may start from any state except `Indexing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Indexing,
    Completed,
    Cancelled,
}

/// Shared view of the indexing session, safe to poll from another thread.
#[derive(Debug, Default)]
pub struct IndexSession {
    state: Mutex<SessionState>,
    cancel: AtomicBool,
    last_indexed_at: Mutex<Option<DateTime<Utc>>>,
}

impl IndexSession {
    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    pub fn is_indexing(&self) -> bool {
        self.state() == SessionState::Indexing
    }

    /// Flags the running session for cancellation. Returns false when
    /// nothing is running.
    pub fn request_cancel(&self) -> bool {
        let state = lock(&self.state);
        if *state == SessionState::Indexing {
            self.cancel.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn last_indexed_at(&self) -> Option<DateTime<Utc>> {
        *lock(&self.last_indexed_at)
    }

    fn try_begin(&self) -> bool {
        let mut state = lock(&self.state);
        if *state == SessionState::Indexing {
            return false;
        }
        *state = SessionState::Indexing;
        self.cancel.store(false, Ordering::SeqCst);
        true
    }

    fn set_state(&self, next: SessionState) {
        *lock(&self.state) = next;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Returns the session to `Idle` unless the run reached a terminal state.
struct ActiveRun<'a> {
    session: &'a IndexSession,
    finished: bool,
}

impl ActiveRun<'_> {
    fn finish(mut self, state: SessionState) {
        self.session.set_state(state);
        self.finished = true;
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.session.set_state(SessionState::Idle);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReindexResult {
    Ran(IngestOutcome),
    /// A run was already in progress; it has been asked to cancel instead.
    CancelRequested,
    /// The index was cleared and there was nothing to add.
    NothingToIndex,
}

/// Full rebuild of the index: clear, then run the pipeline over `paths`.
pub struct Reindexer {
    store: Arc<IndexStore>,
    pipeline: IngestPipeline,
    session: Arc<IndexSession>,
}

impl Reindexer {
    pub fn new(store: Arc<IndexStore>, pipeline: IngestPipeline) -> Self {
        Self { store, pipeline, session: Arc::new(IndexSession::default()) }
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn session(&self) -> Arc<IndexSession> {
        Arc::clone(&self.session)
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn request_cancel(&self) -> bool {
        self.session.request_cancel()
    }

    pub fn reindex<P>(&self, paths: &[PathBuf], progress: P) -> Result<ReindexResult, IngestError>
    where
        P: FnMut(&Progress<'_>),
    {
        if !self.session.try_begin() {
            info!("Indexing already running; requesting cancellation");
            self.session.request_cancel();
            return Ok(ReindexResult::CancelRequested);
        }
        let run = ActiveRun { session: &self.session, finished: false };

        match self.store.clear() {
            Ok(()) => {}
            Err(err) if err.is_lock() => {
                warn!(error = %err, "Could not clear index; indexing over existing documents");
            }
            Err(err) => return Err(err.into()),
        }

        if paths.is_empty() {
            info!("No files to index");
            run.finish(SessionState::Completed);
            return Ok(ReindexResult::NothingToIndex);
        }

        let outcome = self.pipeline.run(&self.store, paths, progress, || self.session.is_cancel_requested())?;
        *lock(&self.session.last_indexed_at) = Some(Utc::now());
        run.finish(if outcome.is_cancelled() { SessionState::Cancelled } else { SessionState::Completed });
        Ok(ReindexResult::Ran(outcome))
    }
}
