//! Headless-browser article extraction.
//!
//! A URL goes through a bounded pipeline: the [`ConcurrencyGate`] admits it,
//! the [`RetryPolicy`] runs attempts, each attempt renders the page with a
//! fresh user agent through a [`PageFetcher`], the [`Sanitizer`] cleans the
//! HTML and the [`ContentExtractor`] turns it into an [`ExtractionResult`].
//!
//! ```rust
//! use siphon_core::{ContentExtractor, Sanitizer};
//!
//! let html = r#"<html><head><title>Notes</title></head><body><article>
//!     <p>Readable pages have paragraphs, commas, and enough words to score well, which this one does.</p>
//!     <p>They also tend to repeat that pattern, paragraph after paragraph, until the story is told.</p>
//!     </article></body></html>"#;
//!
//! let sanitized = Sanitizer::new().sanitize(html);
//! let result = ContentExtractor::default().extract(&sanitized, "https://example.com/notes", 200).unwrap();
//! assert_eq!(result.title, "Notes");
//! ```

pub mod article;
pub mod browser;
pub mod error;
pub mod extract;
pub mod extractor;
pub mod gate;
pub mod language;
pub mod metadata;
pub mod parse;
pub mod postprocess;
pub mod preprocess;
pub mod readability;
pub mod retry;
pub mod sanitize;
pub mod scoring;
pub mod service;
pub mod user_agent;

pub use article::Article;
#[cfg(feature = "browser")]
pub use browser::{BrowserFetcher, BrowserSession};
pub use browser::{BrowserSettings, PageFetcher, RenderedPage, WaitUntil};
pub use error::{Result, SiphonError};
#[doc(hidden)]
pub use extract::{ExtractConfig, ExtractedContent, extract_content};
pub use extractor::{ContentExtractor, ExtractionResult};
pub use gate::{ConcurrencyGate, GatePermit, MAX_CONCURRENT};
pub use language::{GrammarDetector, LanguageDetector, NoopDetector};
pub use metadata::Metadata;
pub use parse::{Document, Element};
#[doc(hidden)]
pub use postprocess::{PostProcessConfig, postprocess_html};
#[doc(hidden)]
pub use preprocess::{PreprocessConfig, preprocess_html};
pub use readability::{
    Readability, ReadabilityConfig, ReadabilityConfigBuilder, is_probably_readable, parse, parse_with_url,
};
pub use retry::{DEFAULT_MAX_RETRIES, RetryPolicy};
pub use sanitize::Sanitizer;
#[doc(hidden)]
pub use scoring::{ScoreConfig, base_tag_score, class_id_weight, link_density};
pub use service::{ExtractionService, ServiceConfig, validate_url};
