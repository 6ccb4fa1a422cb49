//! Compiles user queries into multi-field tantivy queries and runs them
//! against an [`IndexStore`].

use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::tokenizer::TokenStream;
use tantivy::Term;

use docsearch_core::{BoolMode, ExtensionFilter, QueryRequest, SearchHit, SortMode};

use crate::error::{QueryParseError, StoreError};
use crate::store::{IndexStore, RESULT_LIMIT};
use crate::tantivy_utils::doc_words_analyzer;

/// Filename matches weigh double against content matches.
pub const FILENAME_BOOST: f32 = 2.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
	Ok,
	/// The query could not be parsed; `hits` is empty.
	InvalidQuery(String),
}

#[derive(Debug, Clone)]
pub struct SearchResponse {
	pub hits: Vec<SearchHit>,
	/// Hits inside the result cap before extension filtering.
	pub window: usize,
	pub status: SearchStatus,
}

impl SearchResponse {
	fn invalid(err: &QueryParseError) -> Self {
		Self { hits: Vec::new(), window: 0, status: SearchStatus::InvalidQuery(err.to_string()) }
	}

	pub fn is_ok(&self) -> bool {
		self.status == SearchStatus::Ok
	}
}

pub struct QueryEngine<'a> {
	store: &'a IndexStore,
}

impl<'a> QueryEngine<'a> {
	pub fn new(store: &'a IndexStore) -> Self {
		Self { store }
	}

	/// Splits `query` into word terms with the index analyzer and builds a
	/// query over `filename` and `content`. In `And` mode every term must
	/// match in at least one of the fields; in `Or` mode any term will do.
	/// Punctuation is a separator, never syntax.
	pub fn parse(&self, query: &str, mode: BoolMode) -> Result<Box<dyn Query>, QueryParseError> {
		if query.trim().is_empty() {
			return Err(QueryParseError::Empty);
		}
		let terms = query_terms(query);
		if terms.is_empty() {
			return Err(QueryParseError::NoTerms(query.to_string()));
		}
		let fields = self.store.fields();
		let occur = match mode {
			BoolMode::And => Occur::Must,
			BoolMode::Or => Occur::Should,
		};
		let clauses = terms
			.iter()
			.map(|text| {
				let filename: Box<dyn Query> = Box::new(BoostQuery::new(term_query(fields.filename, text), FILENAME_BOOST));
				let content = term_query(fields.content, text);
				let either: Box<dyn Query> = Box::new(BooleanQuery::new(vec![(Occur::Should, filename), (Occur::Should, content)]));
				(occur, either)
			})
			.collect();
		Ok(Box::new(BooleanQuery::new(clauses)))
	}

	/// Runs a compiled query; the store caps the result at [`RESULT_LIMIT`].
	pub fn execute(&self, query: &dyn Query, sort: SortMode) -> Result<Vec<SearchHit>, StoreError> {
		self.store.search(query, sort, RESULT_LIMIT)
	}

	/// Parse, execute, then post-filter by extension. A malformed query
	/// yields an empty response with an explanatory status, not an error.
	pub fn search(&self, request: &QueryRequest) -> Result<SearchResponse, StoreError> {
		let query = match self.parse(&request.query, request.mode) {
			Ok(query) => query,
			Err(err) => {
				tracing::warn!(query = %request.query, error = %err, "Rejected query");
				return Ok(SearchResponse::invalid(&err));
			}
		};
		let start = std::time::Instant::now();
		let hits = self.execute(query.as_ref(), request.sort)?;
		let window = hits.len();
		let hits = filter_extensions(hits, &request.extensions);
		tracing::debug!(
			query = %request.query,
			mode = %request.mode,
			sort = %request.sort,
			window,
			returned = hits.len(),
			duration_ms = start.elapsed().as_millis() as u64,
			"Search completed"
		);
		Ok(SearchResponse { hits, window, status: SearchStatus::Ok })
	}
}

/// Narrows an already-capped hit list. Never re-queries, so documents removed
/// here still took one of the capped slots.
pub fn filter_extensions(hits: Vec<SearchHit>, filter: &ExtensionFilter) -> Vec<SearchHit> {
	if filter.is_all() {
		return hits;
	}
	hits.into_iter().filter(|h| filter.allows(&h.document.extension)).collect()
}

/// Distinct analyzed terms of `query`, in order of first appearance.
pub fn query_terms(query: &str) -> Vec<String> {
	let mut analyzer = doc_words_analyzer();
	let mut stream = analyzer.token_stream(query);
	let mut terms: Vec<String> = Vec::new();
	while stream.advance() {
		let text = &stream.token().text;
		if !terms.iter().any(|t| t == text) {
			terms.push(text.clone());
		}
	}
	terms
}

fn term_query(field: Field, text: &str) -> Box<dyn Query> {
	Box::new(TermQuery::new(Term::from_field_text(field, text), IndexRecordOption::WithFreqs))
}
