//! One-line previews of a document's content around the query terms.

use regex::{Captures, Regex};

/// Preview length in characters before the ellipsis.
pub const SNIPPET_CHARS: usize = 100;
pub const ELLIPSIS: &str = "...";
pub const NO_PREVIEW: &str = "[no preview available]";
pub const EMPHASIS: &str = "**";

/// Terms are extracted once per query and reused for every hit.
pub struct SnippetGenerator {
	terms: Vec<String>,
	highlighter: Option<Regex>,
}

impl SnippetGenerator {
	pub fn new(query: &str) -> Self {
		let mut terms: Vec<String> = query
			.to_lowercase()
			.split(|c: char| !(c.is_alphanumeric() || c == '_'))
			.filter(|t| !t.is_empty())
			.map(str::to_string)
			.collect();
		terms.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));
		terms.dedup();
		let highlighter = if terms.is_empty() {
			None
		} else {
			let alternation = terms.iter().map(|t| regex::escape(t)).collect::<Vec<_>>().join("|");
			match Regex::new(&format!(r"(?i)\b(?:{alternation})\b")) {
				Ok(re) => Some(re),
				Err(err) => {
					tracing::warn!(terms = terms.len(), error = %err, "Highlighting disabled for query");
					None
				}
			}
		};
		Self { terms, highlighter }
	}

	pub fn terms(&self) -> &[String] {
		&self.terms
	}

	/// First line containing any term (case-insensitive substring), trimmed,
	/// cut to [`SNIPPET_CHARS`] plus an ellipsis, with whole-word occurrences
	/// of the terms wrapped in [`EMPHASIS`].
	pub fn generate(&self, content: &str) -> String {
		if self.terms.is_empty() {
			return NO_PREVIEW.to_string();
		}
		let line = content.split('\n').map(str::trim).find(|line| {
			let lower = line.to_lowercase();
			self.terms.iter().any(|t| lower.contains(t.as_str()))
		});
		let Some(line) = line else {
			return NO_PREVIEW.to_string();
		};
		let snippet = truncate(line);
		match &self.highlighter {
			Some(re) => re.replace_all(&snippet, |caps: &Captures<'_>| format!("{EMPHASIS}{}{EMPHASIS}", &caps[0])).into_owned(),
			None => snippet,
		}
	}
}

fn truncate(line: &str) -> String {
	match line.char_indices().nth(SNIPPET_CHARS) {
		Some((cut, _)) => format!("{}{ELLIPSIS}", &line[..cut]),
		None => line.to_string(),
	}
}

pub fn generate_snippet(content: &str, query: &str) -> String {
	SnippetGenerator::new(query).generate(content)
}
