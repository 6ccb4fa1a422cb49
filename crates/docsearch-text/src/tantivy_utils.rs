use tantivy::schema::{
	DateOptions, Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING,
};
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer};
use tantivy::Index;

pub const TOKENIZER: &str = "doc_words";

pub const PATH: &str = "path";
pub const FILENAME: &str = "filename";
pub const EXTENSION: &str = "extension";
pub const CONTENT: &str = "content";
pub const MODIFIED: &str = "modified";

/// Field handles resolved once per opened index.
#[derive(Debug, Clone, Copy)]
pub struct DocFields {
	pub path: Field,
	pub filename: Field,
	pub extension: Field,
	pub content: Field,
	pub modified: Field,
}

impl DocFields {
	pub fn resolve(schema: &Schema) -> tantivy::Result<Self> {
		Ok(Self {
			path: schema.get_field(PATH)?,
			filename: schema.get_field(FILENAME)?,
			extension: schema.get_field(EXTENSION)?,
			content: schema.get_field(CONTENT)?,
			modified: schema.get_field(MODIFIED)?,
		})
	}
}

/// `path` is the raw unique key; `filename` and `content` are tokenized for
/// full-text search; `modified` is a fast field so results can be ordered by date.
pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field(PATH, STRING | STORED);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
	schema_builder.add_text_field(FILENAME, text_options.clone());
	schema_builder.add_text_field(EXTENSION, STRING | STORED);
	schema_builder.add_text_field(CONTENT, text_options);
	schema_builder.add_date_field(MODIFIED, DateOptions::default().set_stored().set_indexed().set_fast());
	schema_builder.build()
}

/// Word analyzer shared by indexing and query term extraction. No stop
/// words: every query term must stay matchable.
pub fn doc_words_analyzer() -> TextAnalyzer {
	TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(RemoveLongFilter::limit(40))
		.filter(LowerCaser)
		.build()
}

pub fn register_tokenizer(index: &Index) {
	index.tokenizers().register(TOKENIZER, doc_words_analyzer());
}
