//! HTML parsing and DOM navigation.
//!
//! This module provides the [`Document`] and [`Element`] types used by the
//! sanitizer, the readability engine and the content extractor.
//!
//! ```rust
//! use siphon_core::parse::Document;
//!
//! let doc = Document::parse("<ul><li>Oslo</li><li>Bergen</li></ul>").unwrap();
//! let stops: Vec<String> = doc.select("li").unwrap().iter().map(|li| li.text()).collect();
//! assert_eq!(stops, ["Oslo", "Bergen"]);
//! ```

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::{PreprocessConfig, Result, SiphonError, preprocess};

/// A parsed HTML document.
///
/// Wraps a `scraper::Html` tree together with the URL it was loaded from,
/// when known.
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses a full HTML document without any cleaning.
    pub fn parse(html: &str) -> Result<Self> {
        let html = Html::parse_document(html);
        Ok(Self { html, base_url: None })
    }

    /// Parses an HTML fragment in isolation (no implied `<head>`).
    ///
    /// Used to inspect extracted article content on its own.
    pub fn parse_fragment(html: &str) -> Self {
        Self { html: Html::parse_fragment(html), base_url: None }
    }

    /// Parses HTML after running the readability preprocessing pass.
    ///
    /// Script, style and other non-content nodes are dropped first, which
    /// keeps them out of candidate scoring.
    pub fn parse_with_preprocessing(html: &str, config: &PreprocessConfig, base_url: Option<Url>) -> Result<Self> {
        let cleaned = preprocess::preprocess_html(html, config);
        let html = Html::parse_document(&cleaned);

        Ok(Self { html, base_url })
    }

    /// Attaches the URL the document was loaded from.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Gets the base URL, if one was provided.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Gets the underlying `scraper::Html` tree.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Serializes the whole document back to HTML.
    pub fn as_string(&self) -> String {
        self.html.html()
    }

    /// Selects elements using a CSS selector, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`SiphonError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).map(Element::new).collect())
    }

    /// Gets the content of the `<title>` element, trimmed.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Every text node in the tree, concatenated.
    pub fn text_content(&self) -> String {
        self.html.root_element().text().collect()
    }
}

/// A single element of a [`Document`].
///
/// Thin wrapper around `scraper::ElementRef` with the accessors the scoring
/// code needs, including parent traversal.
#[derive(Clone, Copy, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    pub(crate) fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    /// Gets the wrapped `scraper` element.
    pub fn element_ref(&self) -> ElementRef<'a> {
        self.element
    }

    /// Serialized children.
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Serialized element including its own tag.
    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Gets the concatenated text of all descendant text nodes.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Gets the lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Gets the parent element, skipping the document root.
    pub fn parent(&self) -> Option<Element<'a>> {
        self.element.parent().and_then(ElementRef::wrap).map(Element::new)
    }

    /// Iterates over element ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = Element<'a>> + use<'a> {
        self.element.ancestors().filter_map(ElementRef::wrap).map(Element::new)
    }

    /// Iterates over direct element children.
    pub fn children(&self) -> impl Iterator<Item = Element<'a>> + use<'a> {
        self.element.children().filter_map(ElementRef::wrap).map(Element::new)
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`SiphonError::HtmlParseError`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = parse_selector(selector)?;
        Ok(self.element.select(&sel).map(Element::new).collect())
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| SiphonError::HtmlParseError(format!("Invalid selector: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMETABLE: &str = r#"<!DOCTYPE html>
        <html lang="nb">
        <head><title>  Bergen Line timetable  </title></head>
        <body>
            <main id="timetable">
                <ol>
                    <li>Oslo S</li>
                    <li>Finse</li>
                </ol>
            </main>
            <a href="https://rail.example.no/tickets">Tickets</a>
        </body>
        </html>"#;

    fn timetable() -> Document {
        Document::parse(TIMETABLE).unwrap()
    }

    #[test]
    fn test_title_is_trimmed() {
        assert_eq!(timetable().title().as_deref(), Some("Bergen Line timetable"));
        assert_eq!(Document::parse("<title>   </title>").unwrap().title(), None);
    }

    #[test]
    fn test_select_in_document_order() {
        let stops: Vec<String> = timetable().select("li").unwrap().iter().map(|li| li.text()).collect();
        assert_eq!(stops, ["Oslo S", "Finse"]);
    }

    #[test]
    fn test_tree_navigation() {
        let doc = timetable();
        let stop = doc.select("li").unwrap()[1];

        assert_eq!(stop.parent().map(|e| e.tag_name()).as_deref(), Some("ol"));
        let chain: Vec<String> = stop.ancestors().map(|e| e.tag_name()).collect();
        assert_eq!(chain, ["ol", "main", "body", "html"]);

        let list = doc.select("ol").unwrap()[0];
        assert_eq!(list.children().count(), 2);
        assert_eq!(list.select("li").unwrap().len(), 2);
    }

    #[test]
    fn test_attributes_and_serialization() {
        let doc = timetable();
        let link = doc.select("a").unwrap()[0];

        assert_eq!(link.attr("href"), Some("https://rail.example.no/tickets"));
        assert_eq!(link.attr("rel"), None);
        assert_eq!(link.inner_html(), "Tickets");
        assert!(link.outer_html().starts_with("<a "));
    }

    #[test]
    fn test_bad_selector_is_an_error() {
        assert!(matches!(timetable().select("li[["), Err(SiphonError::HtmlParseError(_))));
    }

    #[test]
    fn test_preprocessing_runs_before_parse() {
        let html = "<html><body><style>li{color:red}</style><script>track()</script><p>Departures</p></body></html>";
        let doc = Document::parse_with_preprocessing(html, &PreprocessConfig::default(), None).unwrap();

        assert!(doc.select("script, style").unwrap().is_empty());
        assert!(doc.text_content().contains("Departures"));
        assert!(doc.base_url().is_none());
    }

    #[test]
    fn test_fragment_has_no_implied_head() {
        let doc = Document::parse_fragment(r#"<p><img src="one.png"><img src="two.png"></p>"#);
        let srcs: Vec<&str> = doc.select("img").unwrap().iter().filter_map(|i| i.attr("src")).collect();

        assert_eq!(srcs, ["one.png", "two.png"]);
        assert!(doc.select("head").unwrap().is_empty());
    }
}
