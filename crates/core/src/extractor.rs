//! Turns sanitized HTML into the [`ExtractionResult`] returned to callers.

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::sanitize::is_http_url;
use crate::{Document, Metadata, Readability, ReadabilityConfig, Result};

/// Structured article data for one URL.
///
/// Serialized with camelCase keys; `cover` and the optional metadata fields
/// are omitted when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// URL that was requested
    pub url: String,
    pub title: String,
    /// Sanitized article HTML
    pub content: String,
    pub excerpt: String,
    /// Plain text with whitespace runs collapsed to single spaces
    pub text_content: String,
    /// Absolute http(s) image sources from `content`, in document order
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_time: Option<String>,
    /// Characters in `text_content`
    pub length: usize,
}

/// Runs readability over sanitized pages.
#[derive(Debug, Clone, Default)]
pub struct ContentExtractor {
    readability: Readability,
}

impl ContentExtractor {
    pub fn new(config: ReadabilityConfig) -> Self {
        Self { readability: Readability::with_config(config) }
    }

    pub fn readability(&self) -> &Readability {
        &self.readability
    }

    /// Extracts the article from `sanitized_html` and attaches `url` and
    /// `status_code`.
    ///
    /// # Errors
    ///
    /// [`SiphonError::NoContent`](crate::SiphonError::NoContent) or
    /// [`SiphonError::NotReadable`](crate::SiphonError::NotReadable) when no
    /// article body is found.
    pub fn extract(&self, sanitized_html: &str, url: &str, status_code: u16) -> Result<ExtractionResult> {
        let article = self.readability.parse_document(sanitized_html, Url::parse(url).ok())?;

        let text_content = collapse_whitespace(&article.text_content);
        let images = collect_images(&article.content);
        let cover = select_cover(&article.metadata, &images);
        debug!(url, images = images.len(), chars = text_content.len(), "Article extracted");

        Ok(ExtractionResult {
            url: url.to_string(),
            title: article.title().to_string(),
            excerpt: article.excerpt().to_string(),
            length: text_content.chars().count(),
            text_content,
            images,
            cover,
            status_code,
            site_name: article.metadata.site_name,
            byline: article.metadata.byline,
            lang: article.metadata.language,
            published_time: article.metadata.published_time,
            content: article.content,
        })
    }
}

/// Collapses every whitespace run to one space and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `src` of every `<img>` in the fragment that is an absolute http(s) URL
pub fn collect_images(content: &str) -> Vec<String> {
    let fragment = Document::parse_fragment(content);
    let Ok(images) = fragment.select("img") else {
        return Vec::new();
    };

    images
        .iter()
        .filter_map(|img| img.attr("src"))
        .filter(|src| is_http_url(src))
        .map(str::to_string)
        .collect()
}

/// `og:image`, then `twitter:image`, then the first content image.
///
/// Social images only count when they are absolute http(s) URLs.
pub fn select_cover(metadata: &Metadata, images: &[String]) -> Option<String> {
    [&metadata.og_image, &metadata.twitter_image]
        .into_iter()
        .flatten()
        .find(|candidate| is_http_url(candidate))
        .or_else(|| images.first())
        .cloned()
}
