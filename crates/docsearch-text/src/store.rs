//! Persistent inverted index over documents keyed by path.
//!
//! Writes go through a [`BatchWriter`]: upserts accumulate in the writer and
//! become visible to readers together on `commit`. Tantivy's directory lock
//! allows a single live writer per index; searches run on searcher
//! snapshots, so a reader sees either the previous or the committed state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tantivy::collector::{Count, TopDocs};
use tantivy::directory::MmapDirectory;
use tantivy::query::{Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{doc, DocAddress, Index, IndexReader, IndexWriter, Order, ReloadPolicy, TantivyDocument, TantivyError, Term};

use docsearch_core::{Document, SearchHit, SortMode};

use crate::error::StoreError;
use crate::tantivy_utils::{build_schema, register_tokenizer, DocFields, MODIFIED};

/// Hard cap on hits returned by a single search.
pub const RESULT_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct StoreOptions {
	pub writer_memory_bytes: usize,
	/// Pause before the single retry when `clear` finds the index locked.
	pub clear_retry_delay: Duration,
}

impl Default for StoreOptions {
	fn default() -> Self {
		Self { writer_memory_bytes: 50_000_000, clear_retry_delay: Duration::from_millis(500) }
	}
}

pub struct IndexStore {
	index: Index,
	reader: IndexReader,
	fields: DocFields,
	dir: PathBuf,
	options: StoreOptions,
}

impl IndexStore {
	pub fn open_or_create(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
		Self::open_with(dir, StoreOptions::default())
	}

	/// Opens the index in `dir`, creating the directory and an empty index
	/// when absent. An index written with a different schema is recreated.
	pub fn open_with(dir: impl AsRef<Path>, options: StoreOptions) -> Result<Self, StoreError> {
		let dir = dir.as_ref().to_path_buf();
		std::fs::create_dir_all(&dir)?;
		let index = match Self::open_index(&dir) {
			Err(TantivyError::SchemaError(msg)) => {
				tracing::warn!(dir = %dir.display(), reason = %msg, "Schema mismatch detected - recreating index");
				std::fs::remove_dir_all(&dir)?;
				std::fs::create_dir_all(&dir)?;
				Self::open_index(&dir)
			}
			other => other,
		};
		let open_err = |source| StoreError::Open { path: dir.clone(), source };
		let index = index.map_err(open_err)?;
		register_tokenizer(&index);
		let fields = DocFields::resolve(&index.schema()).map_err(open_err)?;
		let reader: IndexReader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().map_err(open_err)?;
		tracing::debug!(dir = %dir.display(), docs = reader.searcher().num_docs(), "Opened index");
		Ok(Self { index, reader, fields, dir, options })
	}

	fn open_index(dir: &Path) -> tantivy::Result<Index> {
		let directory = MmapDirectory::open(dir)?;
		Index::open_or_create(directory, build_schema())
	}

	pub fn index(&self) -> &Index { &self.index }
	pub fn fields(&self) -> DocFields { self.fields }
	pub fn dir(&self) -> &Path { &self.dir }

	pub fn num_docs(&self) -> u64 { self.reader.searcher().num_docs() }

	/// Releases the index handles.
	pub fn close(self) {
		tracing::debug!(dir = %self.dir.display(), "Closing index");
	}

	fn writer(&self) -> Result<IndexWriter, StoreError> {
		self.index.writer(self.options.writer_memory_bytes).map_err(StoreError::from_writer)
	}

	/// Starts a write batch. Fails with [`StoreError::Lock`] while another
	/// writer is alive.
	pub fn begin_batch(&self) -> Result<BatchWriter<'_>, StoreError> {
		Ok(BatchWriter { store: self, writer: self.writer()?, pending: 0 })
	}

	/// Drops every document in one commit. A locked index is retried once
	/// after `clear_retry_delay`.
	pub fn clear(&self) -> Result<(), StoreError> {
		match self.try_clear() {
			Err(err) if err.is_lock() => {
				tracing::warn!(error = %err, delay_ms = self.options.clear_retry_delay.as_millis() as u64, "Index busy, retrying clear");
				std::thread::sleep(self.options.clear_retry_delay);
				self.try_clear()
			}
			result => result,
		}
	}

	fn try_clear(&self) -> Result<(), StoreError> {
		let mut writer = self.writer()?;
		writer.delete_all_documents().map_err(StoreError::from_writer)?;
		writer.commit().map_err(StoreError::from_writer)?;
		self.reader.reload()?;
		tracing::info!(dir = %self.dir.display(), "Index cleared");
		Ok(())
	}

	/// Runs `query` and returns at most `limit` hits, ranked by score or by
	/// modification time (newest first).
	pub fn search(&self, query: &dyn Query, sort: SortMode, limit: usize) -> Result<Vec<SearchHit>, StoreError> {
		if limit == 0 {
			return Ok(Vec::new());
		}
		let searcher = self.reader.searcher();
		let addresses: Vec<(Option<f32>, DocAddress)> = match sort {
			SortMode::Relevance => searcher
				.search(query, &TopDocs::with_limit(limit))?
				.into_iter()
				.map(|(score, addr)| (Some(score), addr))
				.collect(),
			SortMode::Date => searcher
				.search(query, &TopDocs::with_limit(limit).order_by_fast_field::<tantivy::DateTime>(MODIFIED, Order::Desc))?
				.into_iter()
				.map(|(_, addr)| (None, addr))
				.collect(),
		};
		let mut hits = Vec::with_capacity(addresses.len());
		for (i, (score, addr)) in addresses.into_iter().enumerate() {
			let doc: TantivyDocument = searcher.doc(addr)?;
			hits.push(SearchHit { rank: i + 1, score, document: self.to_document(&doc) });
		}
		Ok(hits)
	}

	pub fn document(&self, path: &str) -> Result<Option<Document>, StoreError> {
		let searcher = self.reader.searcher();
		let top = searcher.search(&self.path_query(path), &TopDocs::with_limit(1))?;
		match top.first() {
			Some((_, addr)) => {
				let doc: TantivyDocument = searcher.doc(*addr)?;
				Ok(Some(self.to_document(&doc)))
			}
			None => Ok(None),
		}
	}

	/// Number of live documents stored under `path` (0 or 1).
	pub fn count_path(&self, path: &str) -> Result<usize, StoreError> {
		Ok(self.reader.searcher().search(&self.path_query(path), &Count)?)
	}

	fn path_query(&self, path: &str) -> TermQuery {
		TermQuery::new(Term::from_field_text(self.fields.path, path), IndexRecordOption::Basic)
	}

	fn to_document(&self, doc: &TantivyDocument) -> Document {
		let f = self.fields;
		let text = |field| doc.get_first(field).and_then(|v| v.as_str()).unwrap_or("").to_string();
		let modified = doc
			.get_first(f.modified)
			.and_then(|v| v.as_datetime())
			.and_then(|d| DateTime::<Utc>::from_timestamp(d.into_timestamp_secs(), 0))
			.unwrap_or_default();
		Document { path: text(f.path), filename: text(f.filename), extension: text(f.extension), content: text(f.content), modified }
	}
}

/// A pending batch of upserts. Dropping it without `commit` discards the batch.
pub struct BatchWriter<'a> {
	store: &'a IndexStore,
	writer: IndexWriter,
	pending: usize,
}

impl BatchWriter<'_> {
	/// Inserts `document`, replacing any earlier version with the same path,
	/// including one upserted earlier in this batch.
	pub fn upsert(&mut self, document: &Document) -> Result<(), StoreError> {
		let f = self.store.fields;
		self.writer.delete_term(Term::from_field_text(f.path, &document.path));
		self.writer
			.add_document(doc!(
				f.path => document.path.clone(),
				f.filename => document.filename.clone(),
				f.extension => document.extension.clone(),
				f.content => document.content.clone(),
				f.modified => tantivy::DateTime::from_timestamp_secs(document.modified.timestamp()),
			))
			.map_err(StoreError::from_writer)?;
		self.pending += 1;
		Ok(())
	}

	pub fn pending(&self) -> usize { self.pending }

	/// Publishes the batch atomically and refreshes the store's reader.
	/// Returns the number of upserts in the batch.
	pub fn commit(mut self) -> Result<usize, StoreError> {
		self.writer.commit().map_err(|e| StoreError::IndexWrite(e.to_string()))?;
		self.store.reader.reload()?;
		tracing::debug!(docs = self.pending, "Committed batch");
		Ok(self.pending)
	}
}
