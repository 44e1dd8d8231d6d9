//! Error types for Siphon operations.
//!
//! This module defines [`SiphonError`], the single error type shared by the
//! browser session manager, the sanitizer, the readability engine and the
//! extraction service.
//!
//! # Example
//!
//! ```rust
//! use siphon_core::{Result, SiphonError};
//!
//! fn require_url(url: Option<&str>) -> Result<&str> {
//!     url.ok_or_else(|| SiphonError::InvalidInput("URL is required".to_string()))
//! }
//! ```

use thiserror::Error;

/// Main error type for extraction operations.
///
/// Variants follow the failure taxonomy of the pipeline: input validation,
/// navigation, readability, and everything else.
///
/// # Example
///
/// ```rust
/// use siphon_core::{SiphonError, parse};
///
/// match parse("<html><body><nav><a href=\"/\">Home</a></nav></body></html>") {
///     Ok(article) => println!("Title: {:?}", article.metadata.title),
///     Err(SiphonError::NotReadable { score, threshold }) => {
///         println!("Score {} below threshold {}", score, threshold);
///     }
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum SiphonError {
    /// Missing, blank or otherwise unusable URL.
    ///
    /// Raised before any browser is launched and never retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The page did not settle within the navigation timeout.
    #[error("Navigation timed out after {timeout_secs} seconds")]
    NavigationTimeout { timeout_secs: u64 },

    /// DNS, connection, TLS or protocol failure while navigating.
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// No content candidates were found in the document.
    ///
    /// Returned when the document is empty or contains nothing that looks
    /// like an article body.
    #[error("No readable content could be extracted from the document")]
    NoContent,

    /// Content is not readable (score below threshold).
    ///
    /// The best candidate exists but scores too low to be an article body,
    /// which typically happens on navigation pages and search results.
    #[error("Content is not readable (score {score} below threshold {threshold})")]
    NotReadable { score: f64, threshold: f64 },

    /// HTML parsing errors, usually an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// The code-language grammar set could not be prepared.
    #[error("Language detection failed: {0}")]
    LanguageDetection(String),

    /// The concurrency gate was closed while a request was waiting.
    #[error("Concurrency gate is closed")]
    GateClosed,

    /// Any other failure inside the extraction pipeline.
    #[error("Extraction failed: {0}")]
    Unknown(String),
}

impl SiphonError {
    /// Whether the retry wrapper should try the whole pipeline again.
    ///
    /// Input errors are deterministic and a closed gate will stay closed;
    /// everything else may succeed on a fresh browser with a fresh identity.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SiphonError::InvalidInput(_) | SiphonError::GateClosed)
    }

    /// Whether the error means the page had no usable article body.
    pub fn is_unreadable(&self) -> bool {
        matches!(self, SiphonError::NoContent | SiphonError::NotReadable { .. })
    }
}

/// Result type alias for SiphonError.
pub type Result<T> = std::result::Result<T, SiphonError>;
