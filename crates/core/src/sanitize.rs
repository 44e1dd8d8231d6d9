//! HTML sanitizer run on rendered pages before extraction.
//!
//! Passes, in order:
//! 1. anchors without an absolute `http(s)` `href` become attribute-less `<span>`s
//! 2. lazy-load attributes are copied into `src`, then images without an
//!    `http` source are removed
//! 3. `<pre><code>` blocks are stamped with a detected `language`
//! 4. every attribute except `src` and `href` is removed (`code` keeps
//!    `language`, `meta` keeps `name`, `property` and `content`, `html`
//!    keeps `lang`, `script` keeps `type` so JSON-LD stays recognizable)
//!
//! Later passes depend on attributes the last pass removes, so the order is
//! fixed. Problems with a single element are logged and skipped.

use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::language::{GrammarDetector, LanguageDetector};
use crate::preprocess::rewrite;
use crate::{Document, Result};

/// Lazy-load attributes, checked in this order
pub const LAZY_IMAGE_ATTRS: &[&str] = &["data-src", "data-lazy", "data-original", "data-srcset"];

const ALLOWED_ATTRS: &[&str] = &["src", "href"];
const ALLOWED_CODE_ATTRS: &[&str] = &["src", "href", "language"];
const ALLOWED_META_ATTRS: &[&str] = &["src", "href", "name", "property", "content"];
const ALLOWED_HTML_ATTRS: &[&str] = &["src", "href", "lang"];
const ALLOWED_SCRIPT_ATTRS: &[&str] = &["src", "href", "type"];

const CODE_BLOCK_SELECTOR: &str = "pre > code";

/// Cleans rendered HTML for the content extractor.
pub struct Sanitizer {
    detector: Box<dyn LanguageDetector>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Sanitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sanitizer").finish_non_exhaustive()
    }
}

impl Sanitizer {
    /// Sanitizer with the built-in grammar detector.
    pub fn new() -> Self {
        Self::with_detector(GrammarDetector::new())
    }

    /// Sanitizer with a custom code-language detector.
    pub fn with_detector(detector: impl LanguageDetector + 'static) -> Self {
        Self { detector: Box::new(detector) }
    }

    /// Runs all passes over an HTML string.
    pub fn sanitize(&self, html: &str) -> String {
        let html = neutralize_links(html);
        let html = resolve_lazy_images(&html);
        let html = self.tag_code_blocks(&html);
        strip_attributes(&html)
    }

    /// Sanitizes a parsed document, keeping its base URL.
    ///
    /// # Errors
    ///
    /// Only if the sanitized markup cannot be parsed again.
    pub fn sanitize_document(&self, doc: Document) -> Result<Document> {
        let sanitized = Document::parse(&self.sanitize(&doc.as_string()))?;
        Ok(match doc.base_url() {
            Some(url) => sanitized.with_base_url(url.clone()),
            None => sanitized,
        })
    }

    /// Stamps `language` on `<pre><code>` blocks.
    ///
    /// Code text is read with `scraper` (entities decoded), then stamped by
    /// position in a streaming pass. If the two passes disagree on the number
    /// of blocks the input is returned untouched.
    fn tag_code_blocks(&self, html: &str) -> String {
        let Ok(selector) = Selector::parse(CODE_BLOCK_SELECTOR) else {
            return html.to_string();
        };

        let languages: Vec<Option<&'static str>> = {
            let parsed = Html::parse_document(html);
            parsed
                .select(&selector)
                .map(|code| {
                    let text: String = code.text().collect();
                    self.detector.detect(&text).unwrap_or_else(|e| {
                        warn!(error = %e, "Code language detection failed");
                        None
                    })
                })
                .collect()
        };

        if languages.iter().all(Option::is_none) {
            return html.to_string();
        }

        let mut seen = 0usize;
        let output = rewrite(
            html,
            vec![lol_html::element!(CODE_BLOCK_SELECTOR, |el| {
                if let Some(Some(language)) = languages.get(seen)
                    && let Err(e) = el.set_attribute("language", language)
                {
                    warn!(error = %e, "Could not tag code block");
                }
                seen += 1;
                Ok(())
            })],
        );

        if seen != languages.len() {
            warn!(parsed = languages.len(), streamed = seen, "Code block count mismatch, skipping language tags");
            return html.to_string();
        }

        debug!(blocks = seen, "Tagged code blocks");
        output
    }
}

/// Whether `href` starts with `http://` or `https://`, ignoring case
pub fn is_http_url(href: &str) -> bool {
    let starts_with = |prefix: &str| href.get(..prefix.len()).is_some_and(|p| p.eq_ignore_ascii_case(prefix));
    starts_with("http://") || starts_with("https://")
}

/// Turns anchors without an absolute http(s) target into plain `<span>`s
fn neutralize_links(html: &str) -> String {
    rewrite(
        html,
        vec![lol_html::element!("a", |el| {
            if el.get_attribute("href").is_some_and(|href| is_http_url(&href)) {
                return Ok(());
            }

            if let Err(e) = el.set_tag_name("span") {
                warn!(error = %e, "Could not neutralize link");
                return Ok(());
            }
            remove_attributes_except(el, &[]);
            Ok(())
        })],
    )
}

/// Copies the first lazy-load attribute present into `src`, even when empty,
/// and drops images that still have no absolute source
fn resolve_lazy_images(html: &str) -> String {
    rewrite(
        html,
        vec![lol_html::element!("img", |el| {
            let lazy = LAZY_IMAGE_ATTRS.iter().find_map(|attr| el.get_attribute(attr));

            if let Some(value) = lazy
                && let Err(e) = el.set_attribute("src", &value)
            {
                warn!(error = %e, "Could not copy lazy image source");
            }

            let src = el.get_attribute("src").unwrap_or_default();
            if src.is_empty() || !src.starts_with("http") {
                el.remove();
            }
            Ok(())
        })],
    )
}

/// Removes every attribute outside the allow-list
fn strip_attributes(html: &str) -> String {
    rewrite(
        html,
        vec![lol_html::element!("*", |el| {
            let allowed = match el.tag_name().as_str() {
                "code" => ALLOWED_CODE_ATTRS,
                "meta" => ALLOWED_META_ATTRS,
                "html" => ALLOWED_HTML_ATTRS,
                "script" => ALLOWED_SCRIPT_ATTRS,
                _ => ALLOWED_ATTRS,
            };
            remove_attributes_except(el, allowed);
            Ok(())
        })],
    )
}

fn remove_attributes_except(el: &mut lol_html::html_content::Element<'_, '_>, allowed: &[&str]) {
    let doomed: Vec<String> = el
        .attributes()
        .iter()
        .map(|attr| attr.name())
        .filter(|name| !allowed.contains(&name.as_str()))
        .collect();

    for name in doomed {
        el.remove_attribute(&name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SiphonError;

    struct FailingDetector;

    impl LanguageDetector for FailingDetector {
        fn detect(&self, _code: &str) -> Result<Option<&'static str>> {
            Err(SiphonError::LanguageDetection("grammar set unavailable".to_string()))
        }
    }

    fn attrs_of(html: &str, selector: &str) -> Vec<Vec<(String, String)>> {
        let doc = Document::parse(html).unwrap();
        doc.select(selector)
            .unwrap()
            .iter()
            .map(|el| {
                el.element_ref()
                    .value()
                    .attrs()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("http://example.com"));
        assert!(is_http_url("HTTPS://EXAMPLE.COM/a"));
        assert!(!is_http_url("/relative/path"));
        assert!(!is_http_url("mailto:someone@example.com"));
        assert!(!is_http_url("javascript:void(0)"));
        assert!(!is_http_url("httpx://nope"));
        assert!(!is_http_url(""));
    }

    #[test]
    fn test_links_neutralized() {
        let html = r##"<p><a href="/about" class="nav">About <b>us</b></a> <a>Bare</a> <a href="#top">Top</a> <a href="HTTPS://example.com/x" rel="nofollow">Ext</a></p>"##;
        let result = Sanitizer::new().sanitize(html);

        assert!(result.contains("<span>About <b>us</b></span>"));
        assert!(result.contains("<span>Bare</span>"));
        assert!(result.contains("<span>Top</span>"));
        assert_eq!(attrs_of(&result, "a"), vec![vec![("href".to_string(), "HTTPS://example.com/x".to_string())]]);
    }

    #[test]
    fn test_lazy_image_resolved() {
        let html = r#"<p><img src="placeholder.gif" data-src="https://cdn.example.com/real.jpg" alt="x"></p>"#;
        let result = Sanitizer::new().sanitize(html);
        assert_eq!(attrs_of(&result, "img"), vec![vec![("src".to_string(), "https://cdn.example.com/real.jpg".to_string())]]);
    }

    #[test]
    fn test_lazy_attribute_order() {
        let html = r#"<img data-original="https://a.example.com/3.jpg" data-lazy="https://a.example.com/2.jpg">"#;
        let result = Sanitizer::new().sanitize(html);
        assert_eq!(attrs_of(&result, "img"), vec![vec![("src".to_string(), "https://a.example.com/2.jpg".to_string())]]);
    }

    #[test]
    fn test_empty_lazy_attribute_still_wins() {
        let html = r#"<p>x</p><img src="https://a.example.com/1.jpg" data-src="" data-lazy="https://a.example.com/2.jpg">"#;
        let result = Sanitizer::new().sanitize(html);
        assert!(attrs_of(&result, "img").is_empty());
        assert_eq!(result, "<p>x</p>");
    }

    #[test]
    fn test_input_emptied_by_image_removal() {
        let sanitizer = Sanitizer::new();
        assert_eq!(sanitizer.sanitize(r#"<img src="/relative.png">"#), "");
        assert_eq!(sanitizer.sanitize(r#"<img src="/relative.png"><img src="x.png">"#), "");
    }

    #[test]
    fn test_images_without_http_source_removed() {
        let html = r#"<div><img src="/local.png"><img><img src=""><img src="data:image/png;base64,AAAA"><img src="https://example.com/keep.png"></div>"#;
        let result = Sanitizer::new().sanitize(html);
        let srcs: Vec<_> = attrs_of(&result, "img").into_iter().flatten().map(|(_, v)| v).collect();
        assert_eq!(srcs, vec!["https://example.com/keep.png"]);
    }

    #[test]
    fn test_code_block_tagged() {
        let html = r#"<pre class="hl"><code class="lang-js">const answer = 42;</code></pre><pre><code>plain words only</code></pre>"#;
        let result = Sanitizer::new().sanitize(html);
        let code_attrs = attrs_of(&result, "code");

        assert_eq!(code_attrs[0], vec![("language".to_string(), "javascript".to_string())]);
        assert!(code_attrs[1].is_empty());
        assert!(attrs_of(&result, "pre").iter().all(Vec::is_empty));
    }

    #[test]
    fn test_inline_code_not_tagged() {
        let result = Sanitizer::new().sanitize("<p><code>const x = 1;</code></p>");
        assert!(attrs_of(&result, "code")[0].is_empty());
    }

    #[test]
    fn test_detection_failure_is_not_fatal() {
        let html = r#"<pre><code class="x">const answer = 42;</code></pre><img src="https://example.com/a.png" width="10">"#;
        let result = Sanitizer::with_detector(FailingDetector).sanitize(html);

        assert!(attrs_of(&result, "code")[0].is_empty());
        assert_eq!(attrs_of(&result, "img")[0], vec![("src".to_string(), "https://example.com/a.png".to_string())]);
    }

    #[test]
    fn test_attributes_stripped() {
        let html = r#"<div id="main" class="wrap" style="color:red" data-x="1" onclick="go()"><p lang="en">Text</p></div>"#;
        let result = Sanitizer::new().sanitize(html);
        assert!(result.contains("<div><p>Text</p></div>"));
    }

    #[test]
    fn test_social_meta_kept() {
        let html = r#"<head><meta property="og:image" content="https://example.com/og.png" data-x="y"></head>"#;
        let result = Sanitizer::new().sanitize(html);
        let meta = &attrs_of(&result, "meta")[0];
        assert!(meta.contains(&("property".to_string(), "og:image".to_string())));
        assert!(meta.contains(&("content".to_string(), "https://example.com/og.png".to_string())));
        assert_eq!(meta.len(), 2);
    }

    #[test]
    fn test_document_language_and_json_ld_kept() {
        let html = r#"<html lang="en" class="js"><head><script type="application/ld+json" id="ld">{}</script></head><body></body></html>"#;
        let result = Sanitizer::new().sanitize(html);
        assert_eq!(attrs_of(&result, "html")[0], vec![("lang".to_string(), "en".to_string())]);
        assert_eq!(attrs_of(&result, "script")[0], vec![("type".to_string(), "application/ld+json".to_string())]);
    }

    #[test]
    fn test_sanitize_idempotent() {
        let html = r#"<html><head><title>T</title></head><body><a href="/x" class="c">x</a><a href="https://e.com" id="i">e</a><img data-src="https://e.com/a.jpg"><img src="rel.png"><pre><code class="c">let x = 1;</code></pre></body></html>"#;
        let sanitizer = Sanitizer::new();
        let once = sanitizer.sanitize(html);
        let twice = sanitizer.sanitize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sanitize_document_keeps_base_url() {
        let url = url::Url::parse("https://example.com/post").unwrap();
        let doc = Document::parse(r#"<p class="x"><a href="/y">y</a></p>"#).unwrap().with_base_url(url.clone());
        let sanitized = Sanitizer::new().sanitize_document(doc).unwrap();

        assert_eq!(sanitized.base_url(), Some(&url));
        assert!(sanitized.select("a").unwrap().is_empty());
        assert!(sanitized.select("p[class]").unwrap().is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(Sanitizer::new().sanitize(""), "");
    }
}
