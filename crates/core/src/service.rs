//! The extraction pipeline: admission, retries, fetch, sanitize, extract.
//!
//! One request moves through `QUEUED → ADMITTED → FETCHING → SANITIZING →
//! EXTRACTING` and ends in `SUCCEEDED` or `FAILED`; a failed attempt goes
//! back to `FETCHING` through `RETRYING` until the retry policy gives up.

use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

use crate::browser::{BrowserSettings, PageFetcher};
use crate::extractor::{ContentExtractor, ExtractionResult};
use crate::gate::{ConcurrencyGate, MAX_CONCURRENT};
use crate::retry::RetryPolicy;
use crate::sanitize::Sanitizer;
use crate::{ReadabilityConfig, Result, SiphonError, user_agent};

/// Settings for an [`ExtractionService`]
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Browser sessions allowed at once
    pub max_concurrent: usize,
    pub retry: RetryPolicy,
    pub browser: BrowserSettings,
    pub readability: ReadabilityConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_concurrent: MAX_CONCURRENT,
            retry: RetryPolicy::default(),
            browser: BrowserSettings::default(),
            readability: ReadabilityConfig::default(),
        }
    }
}

/// Checks that `raw` is a non-blank absolute http(s) URL.
///
/// # Errors
///
/// [`SiphonError::InvalidInput`] describing what is wrong.
pub fn validate_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SiphonError::InvalidInput("URL is required".to_string()));
    }

    let url = Url::parse(trimmed).map_err(|e| SiphonError::InvalidInput(format!("{trimmed}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(SiphonError::InvalidInput(format!("unsupported URL scheme: {scheme}"))),
    }
}

/// Bounded, retrying URL-to-article pipeline shared by all requests.
pub struct ExtractionService<F> {
    fetcher: F,
    gate: ConcurrencyGate,
    retry: RetryPolicy,
    sanitizer: Sanitizer,
    extractor: ContentExtractor,
}

impl<F> std::fmt::Debug for ExtractionService<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionService")
            .field("gate", &self.gate)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "browser")]
impl ExtractionService<crate::browser::BrowserFetcher> {
    /// Service rendering pages with headless Chrome.
    pub fn with_browser(config: ServiceConfig) -> Self {
        let fetcher = crate::browser::BrowserFetcher::new(config.browser.clone());
        Self::new(fetcher, config)
    }
}

impl<F: PageFetcher> ExtractionService<F> {
    pub fn new(fetcher: F, config: ServiceConfig) -> Self {
        Self {
            fetcher,
            gate: ConcurrencyGate::new(config.max_concurrent),
            retry: config.retry,
            sanitizer: Sanitizer::new(),
            extractor: ContentExtractor::new(config.readability),
        }
    }

    /// The admission gate, for instrumentation.
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Extracts the article at `url`.
    ///
    /// Waits for a gate slot, then tries fetch, sanitize and extract up to
    /// `max_retries + 1` times with a fresh user agent each time. The slot
    /// is released once, whatever the outcome.
    ///
    /// # Errors
    ///
    /// [`SiphonError::InvalidInput`] without touching the gate or the
    /// browser; otherwise the error of the last attempt.
    pub async fn extract(&self, url: &str) -> Result<ExtractionResult> {
        let target = validate_url(url)?;
        let requested = url.trim();

        async {
            debug!(waiting = self.gate.waiting(), "QUEUED");
            let permit = self.gate.acquire().await?;
            debug!(active = self.gate.active(), "ADMITTED");

            let result = self
                .retry
                .run(|attempt| {
                    self.attempt(target.as_str(), requested)
                        .instrument(info_span!("attempt", attempt))
                })
                .await;
            permit.release();

            match &result {
                Ok(article) => info!(status = article.status_code, chars = article.length, "SUCCEEDED"),
                Err(e) => warn!(error = %e, "FAILED"),
            }
            result
        }
        .instrument(info_span!("extract", url = requested))
        .await
    }

    async fn attempt(&self, target: &str, requested: &str) -> Result<ExtractionResult> {
        let user_agent = user_agent::generate();
        debug!(user_agent = %user_agent, "FETCHING");
        let page = self.fetcher.fetch(target, &user_agent).await?;
        self.extract_html(&page.html, requested, page.status_code)
    }

    /// Sanitizes and extracts already-rendered HTML, outside the gate.
    ///
    /// # Errors
    ///
    /// [`SiphonError::NoContent`] or [`SiphonError::NotReadable`] when no
    /// article body is found.
    pub fn extract_html(&self, html: &str, url: &str, status_code: u16) -> Result<ExtractionResult> {
        debug!(bytes = html.len(), "SANITIZING");
        let sanitized = self.sanitizer.sanitize(html);
        debug!(bytes = sanitized.len(), "EXTRACTING");
        self.extractor.extract(&sanitized, url, status_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::RenderedPage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const ARTICLE: &str = r#"<html><head><title>Tide Tables</title>
        <meta property="og:image" content="https://cdn.example.com/cover.jpg"></head>
        <body><nav><a href="/home">Home</a></nav><article>
        <p>Tide tables are published every year, and sailors, fishermen, and swimmers all rely on them to plan
        their days along the coast, from the first light of morning to the last light of evening.</p>
        <p>Predictions come from long records of observations, combined with astronomy, geography, and a great
        deal of patient arithmetic, which together describe how the water rises and falls.</p>
        <p><img data-src="https://cdn.example.com/chart.png"> See <a href="javascript:void(0)">the chart</a>.</p>
        </article></body></html>"#;

    #[derive(Default)]
    struct StubFetcher {
        html: String,
        fail: bool,
        delay: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        agents: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn serving(html: &str) -> Self {
            Self { html: html.to_string(), ..Default::default() }
        }

        fn failing() -> Self {
            Self { fail: true, ..Default::default() }
        }
    }

    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str, user_agent: &str) -> Result<RenderedPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.agents.lock().unwrap().push(user_agent.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail {
                return Err(SiphonError::Navigation("connection refused".to_string()));
            }
            Ok(RenderedPage { html: self.html.clone(), status_code: 203, final_url: url.to_string() })
        }
    }

    fn service(fetcher: StubFetcher) -> ExtractionService<StubFetcher> {
        ExtractionService::new(fetcher, ServiceConfig::default())
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com/a").is_ok());
        assert!(validate_url("  http://example.com  ").is_ok());
        assert!(matches!(validate_url(""), Err(SiphonError::InvalidInput(_))));
        assert!(matches!(validate_url("   "), Err(SiphonError::InvalidInput(_))));
        assert!(matches!(validate_url("not a url"), Err(SiphonError::InvalidInput(_))));
        assert!(matches!(validate_url("ftp://example.com"), Err(SiphonError::InvalidInput(_))));
        assert!(matches!(validate_url("file:///etc/passwd"), Err(SiphonError::InvalidInput(_))));
    }

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.max_concurrent, 10);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.browser.navigation_timeout, Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_extract_success() {
        let svc = service(StubFetcher::serving(ARTICLE));
        let result = svc.extract("https://example.com/tides").await.unwrap();

        assert_eq!(result.url, "https://example.com/tides");
        assert_eq!(result.title, "Tide Tables");
        assert_eq!(result.status_code, 203);
        assert_eq!(result.images, vec!["https://cdn.example.com/chart.png"]);
        assert_eq!(result.cover.as_deref(), Some("https://cdn.example.com/cover.jpg"));
        assert!(!result.content.contains("javascript:"));
        assert!(result.content.contains("the chart"));
        assert_eq!(svc.fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(svc.gate().active(), 0);
    }

    #[tokio::test]
    async fn test_always_failing_target_tried_four_times() {
        let svc = service(StubFetcher::failing());
        let result = svc.extract("https://example.com/down").await;

        assert!(matches!(result, Err(SiphonError::Navigation(_))));
        assert_eq!(svc.fetcher.calls.load(Ordering::SeqCst), 4);
        assert_eq!(svc.fetcher.agents.lock().unwrap().len(), 4);
        assert_eq!(svc.gate().active(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_page_retried_then_reported() {
        let svc = service(StubFetcher::serving("<html><body></body></html>"));
        let result = svc.extract("https://example.com/empty").await;

        assert!(matches!(result, Err(SiphonError::NoContent)));
        assert_eq!(svc.fetcher.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_invalid_input_never_fetches() {
        let svc = service(StubFetcher::serving(ARTICLE));
        for url in ["", "   ", "example.com", "mailto:someone@example.com"] {
            assert!(matches!(svc.extract(url).await, Err(SiphonError::InvalidInput(_))));
        }
        assert_eq!(svc.fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(svc.gate().peak(), 0);
    }

    #[tokio::test]
    async fn test_burst_bounded_by_gate() {
        let fetcher = StubFetcher { delay: Duration::from_millis(10), ..StubFetcher::serving(ARTICLE) };
        let svc = Arc::new(service(fetcher));

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let svc = Arc::clone(&svc);
                tokio::spawn(async move { svc.extract(&format!("https://example.com/{i}")).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(svc.fetcher.calls.load(Ordering::SeqCst), 50);
        assert!(svc.fetcher.peak.load(Ordering::SeqCst) <= MAX_CONCURRENT);
        assert!(svc.gate().peak() <= MAX_CONCURRENT);
        assert_eq!(svc.gate().active(), 0);
    }

    #[test]
    fn test_extract_html_offline() {
        let svc = service(StubFetcher::default());
        let result = svc.extract_html(ARTICLE, "file:///tmp/tides.html", 200).unwrap();
        assert_eq!(result.title, "Tide Tables");
        assert_eq!(svc.fetcher.calls.load(Ordering::SeqCst), 0);
    }
}
