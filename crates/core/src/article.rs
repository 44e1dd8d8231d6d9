//! Readability output: the extracted article with its metadata.
//!
//! [`Article`] is what the readability pass produces before the content
//! extractor turns it into an [`ExtractionResult`](crate::ExtractionResult).

use crate::{Document, Metadata};
use serde::Serialize;

/// The complete result of reading an HTML document.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    /// Extracted readable content as clean HTML.
    pub content: String,

    /// Plain text of `content`, as produced by the parser (not collapsed).
    pub text_content: String,

    /// Extracted metadata. `excerpt` falls back to the first paragraph of
    /// `content` when the document head has none.
    pub metadata: Metadata,

    /// Length of `text_content` in characters.
    pub length: usize,

    /// Source URL if known.
    pub source_url: Option<String>,
}

impl Article {
    /// Creates a new Article, deriving the plain text and excerpt from `content`.
    pub fn new(content: String, mut metadata: Metadata, source_url: Option<String>) -> Self {
        let fragment = Document::parse_fragment(&content);
        let text_content = fragment.text_content();
        let length = text_content.chars().count();

        if metadata.excerpt.is_none() {
            metadata.excerpt = first_paragraph(&fragment);
        }

        Self { content, text_content, metadata, length, source_url }
    }

    /// Title, or an empty string when none could be found.
    pub fn title(&self) -> &str {
        self.metadata.title.as_deref().unwrap_or_default()
    }

    /// Excerpt, or an empty string when neither metadata nor content had one.
    pub fn excerpt(&self) -> &str {
        self.metadata.excerpt.as_deref().unwrap_or_default()
    }
}

/// Trimmed text of the first non-empty `<p>` in the fragment
fn first_paragraph(fragment: &Document) -> Option<String> {
    fragment
        .select("p")
        .ok()?
        .into_iter()
        .map(|p| p.text().trim().to_string())
        .find(|t| !t.is_empty())
}
