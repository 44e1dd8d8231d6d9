use crate::Document;
use serde::Serialize;

/// Metadata read from the document head and page markup
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub excerpt: Option<String>,
    pub site_name: Option<String>,
    pub published_time: Option<String>,
    pub language: Option<String>,
    /// `og:image` content, unvalidated
    pub og_image: Option<String>,
    /// `twitter:image` content, unvalidated
    pub twitter_image: Option<String>,
}

impl Document {
    /// Page title, first hit wins: JSON-LD `headline`, `og:title`,
    /// `twitter:title`, meta `title`/`DC.title`, `<title>`, then the first `<h1>`.
    pub fn extract_title(&self) -> Option<String> {
        if let Some(json_ld) = self.extract_json_ld()
            && let Some(headline) = json_ld.get("headline").and_then(|v| v.as_str())
        {
            return Some(headline.trim().to_string());
        }

        ["og:title", "twitter:title", "title", "DC.title"]
            .into_iter()
            .find_map(|name| self.get_meta_content(name))
            .or_else(|| self.title())
            .or_else(|| self.first_text("h1"))
    }

    /// Extract byline with priority fallback:
    /// 1. JSON-LD `author` (string, object or first array entry)
    /// 2. Meta `author` / `article:author` / `DC.creator`
    /// 3. `[rel="author"]` or `[itemprop="author"]` text
    pub fn extract_byline(&self) -> Option<String> {
        if let Some(json_ld) = self.extract_json_ld()
            && let Some(author) = json_ld.get("author")
            && let Some(name) = author_from_json_ld(author)
        {
            return Some(name);
        }

        ["author", "article:author", "DC.creator"]
            .into_iter()
            .find_map(|name| self.get_meta_content(name))
            .or_else(|| self.first_text("[rel=\"author\"]"))
            .or_else(|| self.first_text("[itemprop=\"author\"]"))
    }

    /// Summary text from JSON-LD `description`, `og:description`, meta
    /// `description` or `twitter:description`, in that order.
    ///
    /// Falling back to the article's first paragraph is the caller's job,
    /// since only the caller knows the extracted content.
    pub fn extract_excerpt(&self) -> Option<String> {
        if let Some(json_ld) = self.extract_json_ld()
            && let Some(value) = json_ld.get("description").and_then(|v| v.as_str())
        {
            return Some(value.trim().to_string());
        }

        ["og:description", "description", "twitter:description"]
            .into_iter()
            .find_map(|name| self.get_meta_content(name))
    }

    /// Publisher name from JSON-LD or `og:site_name`, else the base URL's domain.
    pub fn extract_site_name(&self) -> Option<String> {
        if let Some(json_ld) = self.extract_json_ld()
            && let Some(name) = json_ld.pointer("/publisher/name").and_then(|v| v.as_str())
        {
            return Some(name.to_string());
        }

        if let Some(site) = self.get_meta_content("og:site_name") {
            return Some(site);
        }

        self.base_url().and_then(|url| url.domain()).map(|d| d.to_string())
    }

    /// Extract publication time from JSON-LD, `article:published_time`, or `<time datetime>`
    pub fn extract_published_time(&self) -> Option<String> {
        if let Some(json_ld) = self.extract_json_ld()
            && let Some(value) = json_ld.get("datePublished").and_then(|v| v.as_str())
        {
            return Some(value.to_string());
        }

        if let Some(date) = self.get_meta_content("article:published_time") {
            return Some(date);
        }

        self.select("time[datetime]")
            .ok()?
            .first()
            .and_then(|el| el.attr("datetime"))
            .map(|d| d.to_string())
    }

    /// Extract the `lang` attribute of the root element
    pub fn extract_language(&self) -> Option<String> {
        self.html()
            .root_element()
            .value()
            .attr("lang")
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
    }

    /// Everything above in one pass over the head.
    pub fn extract_metadata(&self) -> Metadata {
        Metadata {
            title: self.extract_title(),
            byline: self.extract_byline(),
            excerpt: self.extract_excerpt(),
            site_name: self.extract_site_name(),
            published_time: self.extract_published_time(),
            language: self.extract_language(),
            og_image: self.get_meta_content("og:image"),
            twitter_image: self.get_meta_content("twitter:image"),
        }
    }

    /// Non-blank `content` of `<meta name=..>` or `<meta property=..>`.
    pub fn get_meta_content(&self, attr: &str) -> Option<String> {
        ["name", "property"].into_iter().find_map(|key| {
            let selector = format!("meta[{}=\"{}\"]", key, attr);
            self.select(&selector)
                .ok()?
                .first()
                .and_then(|el| el.attr("content"))
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
        })
    }

    /// Trimmed text of the first element matching `selector`, if non-empty
    fn first_text(&self, selector: &str) -> Option<String> {
        let elements = self.select(selector).ok()?;
        let text = elements.first()?.text();
        let text = text.trim();
        if text.is_empty() { None } else { Some(text.to_string()) }
    }

    /// Extract and parse the first valid JSON-LD block
    fn extract_json_ld(&self) -> Option<serde_json::Value> {
        let elements = self.select("script[type=\"application/ld+json\"]").ok()?;
        elements
            .iter()
            .find_map(|el| serde_json::from_str::<serde_json::Value>(el.text().trim()).ok())
    }
}

/// Author name from a JSON-LD author field (string, object or array)
fn author_from_json_ld(author: &serde_json::Value) -> Option<String> {
    if let Some(name) = author.as_str() {
        return Some(name.to_string());
    }

    if let Some(name) = author.get("name").and_then(|n| n.as_str()) {
        return Some(name.to_string());
    }

    author.as_array()?.first().and_then(author_from_json_ld)
}
