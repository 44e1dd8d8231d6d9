//! Readability: finding the article body of an HTML page.
//!
//! The main entry point is [`Readability`], with [`parse`] and
//! [`parse_with_url`] as one-liners over the default configuration.
//!
//! # Example
//!
//! ```rust
//! use siphon_core::readability::parse;
//!
//! let paragraph = "<p>Readable pages have paragraphs, with commas, and with enough words to score well.</p>";
//! let html = format!("<html><body><article>{}</article></body></html>", paragraph.repeat(4));
//! let article = parse(&html).unwrap();
//! assert!(article.text_content.contains("Readable pages"));
//! ```

use crate::article::Article;
use crate::extract::{ExtractConfig, extract_content};
use crate::parse::Document;
use crate::postprocess::PostProcessConfig;
use crate::preprocess::PreprocessConfig;
use crate::{Result, SiphonError};
use url::Url;

/// Tuning knobs for article detection.
///
/// ```rust
/// use siphon_core::ReadabilityConfig;
///
/// let strict = ReadabilityConfig::builder().min_score(25.0).keep_classes(false).build();
/// assert_eq!(strict.char_threshold, 500);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReadabilityConfig {
    /// Minimum score the top candidate must reach (default: 10.0).
    pub min_score: f64,

    /// Text length below which a second, less aggressive pass is tried (default: 500).
    pub char_threshold: usize,

    /// Number of top candidates consulted for a shared ancestor (default: 5).
    pub nb_top_candidates: usize,

    /// Sibling score threshold as a fraction of the top score (default: 0.2).
    pub sibling_threshold: f64,

    /// Whether the first pass unwraps unlikely candidates (default: true).
    pub remove_unlikely: bool,

    /// Keep `class` attributes on the extracted content (default: false).
    pub keep_classes: bool,

    /// Keep `img` elements in the extracted content (default: true).
    pub preserve_images: bool,
}

impl Default for ReadabilityConfig {
    fn default() -> Self {
        Self {
            min_score: 10.0,
            char_threshold: 500,
            nb_top_candidates: 5,
            sibling_threshold: 0.2,
            remove_unlikely: true,
            keep_classes: false,
            preserve_images: true,
        }
    }
}

impl ReadabilityConfig {
    /// Creates a new builder for ReadabilityConfig.
    pub fn builder() -> ReadabilityConfigBuilder {
        ReadabilityConfigBuilder::new()
    }
}

/// Fluent builder for [`ReadabilityConfig`].
#[derive(Debug, Clone, Default)]
pub struct ReadabilityConfigBuilder {
    config: ReadabilityConfig,
}

impl ReadabilityConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_score(mut self, value: f64) -> Self {
        self.config.min_score = value;
        self
    }

    pub fn char_threshold(mut self, value: usize) -> Self {
        self.config.char_threshold = value;
        self
    }

    pub fn nb_top_candidates(mut self, value: usize) -> Self {
        self.config.nb_top_candidates = value;
        self
    }

    pub fn sibling_threshold(mut self, value: f64) -> Self {
        self.config.sibling_threshold = value;
        self
    }

    pub fn remove_unlikely(mut self, value: bool) -> Self {
        self.config.remove_unlikely = value;
        self
    }

    pub fn keep_classes(mut self, value: bool) -> Self {
        self.config.keep_classes = value;
        self
    }

    pub fn preserve_images(mut self, value: bool) -> Self {
        self.config.preserve_images = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> ReadabilityConfig {
        self.config
    }
}

/// Minimum text length for a node to count in [`Readability::is_probably_readable`]
const READABLE_NODE_CHARS: usize = 140;

/// Score [`Readability::is_probably_readable`] needs to reach
const READABLE_MIN_SCORE: f64 = 20.0;

/// Finds the article body of a page.
///
/// ```rust
/// use siphon_core::{Readability, ReadabilityConfig, SiphonError};
///
/// let reader = Readability::with_config(ReadabilityConfig::builder().min_score(5.0).build());
/// match reader.parse("<html><body><nav>Home</nav></body></html>") {
///     Ok(article) => println!("{} chars", article.length),
///     Err(SiphonError::NoContent | SiphonError::NotReadable { .. }) => println!("nothing to read"),
///     Err(e) => panic!("{e}"),
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Readability {
    config: ReadabilityConfig,
}

impl Readability {
    /// Reader with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReadabilityConfig) -> Self {
        Self { config }
    }

    /// Gets the active configuration.
    pub fn config(&self) -> &ReadabilityConfig {
        &self.config
    }

    /// Parses an HTML string and extracts the article.
    ///
    /// # Errors
    ///
    /// [`SiphonError::NoContent`] when nothing looks like an article body,
    /// [`SiphonError::NotReadable`] when the best candidate scores too low.
    pub fn parse(&self, html: &str) -> Result<Article> {
        self.parse_document(html, None)
    }

    /// Parses HTML with the URL it was loaded from.
    ///
    /// # Errors
    ///
    /// Returns [`SiphonError::InvalidInput`] if the URL is invalid.
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<Article> {
        let base_url = Url::parse(url).map_err(|e| SiphonError::InvalidInput(format!("{url}: {e}")))?;
        self.parse_document(html, Some(base_url))
    }

    /// Extracts the article from `html`, optionally tied to a base URL.
    ///
    /// The first pass unwraps unlikely candidates. When that yields less
    /// text than `char_threshold`, a second pass keeps them and the longer
    /// of the two results wins.
    pub fn parse_document(&self, html: &str, base_url: Option<Url>) -> Result<Article> {
        let source = Document::parse(html)?;
        let source = match &base_url {
            Some(url) => source.with_base_url(url.clone()),
            None => source,
        };
        let metadata = source.extract_metadata();
        let source_url = base_url.as_ref().map(|u| u.to_string());

        let passes: &[bool] = if self.config.remove_unlikely { &[true, false] } else { &[false] };
        let mut best: Option<Article> = None;
        let mut first_error: Option<SiphonError> = None;

        for &remove_unlikely in passes {
            let preprocess = PreprocessConfig { remove_unlikely, ..Default::default() };
            let result = Document::parse_with_preprocessing(html, &preprocess, base_url.clone())
                .and_then(|doc| extract_content(&doc, &self.extract_config()));

            match result {
                Ok(extracted) => {
                    let article = Article::new(extracted.content, metadata.clone(), source_url.clone());
                    if article.length >= self.config.char_threshold {
                        return Ok(article);
                    }
                    if best.as_ref().is_none_or(|b| article.length > b.length) {
                        best = Some(article);
                    }
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        best.ok_or_else(|| first_error.unwrap_or(SiphonError::NoContent))
    }

    /// Checks whether a page probably has an article without extracting it.
    ///
    /// Each `p`, `pre` or `article` with at least 140 characters of text adds
    /// `sqrt(length - 140)`; the page is readable once the sum passes 20.
    pub fn is_probably_readable(&self, html: &str) -> bool {
        let Ok(doc) = Document::parse(html) else {
            return false;
        };
        let Ok(nodes) = doc.select("p, pre, article") else {
            return false;
        };

        let mut score = 0.0;
        for node in nodes {
            let length = node.text().trim().chars().count();
            if length < READABLE_NODE_CHARS {
                continue;
            }
            score += ((length - READABLE_NODE_CHARS) as f64).sqrt();
            if score > READABLE_MIN_SCORE {
                return true;
            }
        }

        false
    }

    fn extract_config(&self) -> ExtractConfig {
        ExtractConfig {
            min_score_threshold: self.config.min_score,
            max_top_candidates: self.config.nb_top_candidates,
            sibling_threshold: self.config.sibling_threshold,
            postprocess: PostProcessConfig {
                strip_images: !self.config.preserve_images,
                keep_classes: self.config.keep_classes,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Extracts an article with the default configuration.
pub fn parse(html: &str) -> Result<Article> {
    Readability::new().parse(html)
}

/// Extracts an article with the default configuration and a base URL.
pub fn parse_with_url(html: &str, url: &str) -> Result<Article> {
    Readability::new().parse_with_url(html, url)
}

/// Quick readability check with the default configuration.
pub fn is_probably_readable(html: &str) -> bool {
    Readability::new().is_probably_readable(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISPATCH: &str = "Engineers at the depot worked through the night replacing couplings on the \
        older carriages, logging each repair by hand, because the new inventory system still refuses \
        to recognise rolling stock that was built before the line was electrified.";

    fn dispatch_page() -> String {
        format!(
            r#"<!DOCTYPE html>
            <html lang="en">
            <head>
                <title>Depot Dispatch</title>
                <meta name="description" content="Notes from the overnight shift">
            </head>
            <body>
                <nav class="menu"><a href="https://depot.example/">Depot</a></nav>
                <article>
                    <h1>Depot Dispatch</h1>
                    <p>{DISPATCH}</p>
                    <p>{DISPATCH}</p>
                    <p>{DISPATCH}</p>
                </article>
                <footer class="footer">All rights reserved</footer>
            </body>
            </html>"#
        )
    }

    #[test]
    fn test_defaults() {
        let config = ReadabilityConfig::default();
        assert_eq!(config, ReadabilityConfig::builder().build());
        assert_eq!(config.min_score, 10.0);
        assert_eq!((config.char_threshold, config.nb_top_candidates), (500, 5));
        assert!(config.remove_unlikely && config.preserve_images && !config.keep_classes);
    }

    #[test]
    fn test_builder_overrides_only_what_is_set() {
        let config = ReadabilityConfig::builder().char_threshold(1200).sibling_threshold(0.35).build();

        assert_eq!(config.char_threshold, 1200);
        assert_eq!(config.sibling_threshold, 0.35);
        assert_eq!(config.min_score, ReadabilityConfig::default().min_score);

        let reader = Readability::with_config(config.clone());
        assert_eq!(reader.config(), &config);
    }

    #[test]
    fn test_extracts_article_and_drops_chrome() {
        let article = Readability::new().parse(&dispatch_page()).unwrap();

        assert_eq!(article.metadata.title.as_deref(), Some("Depot Dispatch"));
        assert_eq!(article.excerpt(), "Notes from the overnight shift");
        assert!(article.text_content.contains("replacing couplings"));
        assert!(!article.text_content.contains("All rights reserved"));
        assert!(article.length >= 500);
    }

    #[test]
    fn test_base_url_sets_source_and_site() {
        let article = Readability::new().parse_with_url(&dispatch_page(), "https://depot.example/night-shift").unwrap();
        assert_eq!(article.source_url.as_deref(), Some("https://depot.example/night-shift"));
        assert_eq!(article.metadata.site_name.as_deref(), Some("depot.example"));
    }

    #[test]
    fn test_rejects_unparseable_url() {
        let result = Readability::new().parse_with_url(&dispatch_page(), "depot dispatch");
        assert!(matches!(result, Err(SiphonError::InvalidInput(_))));
    }

    #[test]
    fn test_link_only_page_has_no_content() {
        let html = r#"<html><body><nav><a href="https://depot.example/a">Rosters</a><a href="https://depot.example/b">Yards</a></nav></body></html>"#;
        assert!(matches!(parse(html), Err(SiphonError::NoContent)));
    }

    #[test]
    fn test_below_threshold_returns_best_effort() {
        let html = format!("<html><body><article><p>{DISPATCH}</p></article></body></html>");
        let article = parse(&html).unwrap();
        assert!(article.length < 500);
        assert!(article.text_content.contains("rolling stock"));
    }

    #[test]
    fn test_images_dropped_when_not_preserved() {
        let html = format!(
            r#"<html><body><article><p>{DISPATCH}<img src="https://depot.example/coupling.jpg"></p></article></body></html>"#
        );
        let keep = parse(&html).unwrap();
        assert!(keep.content.contains("<img"));

        let reader = Readability::with_config(ReadabilityConfig::builder().preserve_images(false).build());
        assert!(!reader.parse(&html).unwrap().content.contains("<img"));
    }

    #[test]
    fn test_readable_heuristic() {
        assert!(is_probably_readable(&dispatch_page()));
        assert!(!is_probably_readable("<html><body><p>Closed for maintenance.</p></body></html>"));
        assert!(!is_probably_readable(""));
    }
}
