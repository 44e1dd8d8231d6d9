use regex::{Captures, Regex};
use std::sync::LazyLock;

static CONDITIONAL_COMMENT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--\[if[^\]]*\]>.*?<!\[endif\]-->|<!--<!\[if[^\]]*\]>.*?<!\[endif\]-->").ok()
});

static IMG_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<img[^>]*>").ok());

static CLASS_ATTR: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r#"\s+class=["'][^"']*["']"#).ok());

static TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]+>").ok());

static LINK: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)<a(?:\s[^>]*)?>(.*?)</a\s*>").ok());

const EMPTY_CANDIDATE_TAGS: &[&str] = &["div", "p", "span", "section", "article", "aside", "header", "footer"];

/// Empty-element patterns, one per tag (the regex crate has no backreferences)
static EMPTY_NODES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    EMPTY_CANDIDATE_TAGS
        .iter()
        .filter_map(|tag| Regex::new(&format!(r"<{tag}(?:\s[^>]*)?>\s*(?:<br\s*/?>\s*)*</{tag}\s*>")).ok())
        .collect()
});

/// Paragraphs cannot nest, so a lazy match always closes on its own end tag
static PARAGRAPH: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)<p(?:\s[^>]*)?>(.*?)</p\s*>").ok());

/// Configuration for HTML post-processing cleanup
#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    /// Whether to remove empty nodes
    pub remove_empty_nodes: bool,
    /// Maximum passes for removing empty nodes
    pub max_empty_node_passes: usize,
    /// Whether to remove paragraphs that are mostly links
    pub remove_high_link_density: bool,
    /// Maximum link density threshold (0.0 to 1.0)
    pub max_link_density: f64,
    /// Whether to remove conditional comments
    pub remove_conditional_comments: bool,
    /// Whether to strip all images
    pub strip_images: bool,
    /// Whether to keep class attributes
    pub keep_classes: bool,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            remove_empty_nodes: true,
            max_empty_node_passes: 10,
            remove_high_link_density: true,
            max_link_density: 0.5,
            remove_conditional_comments: true,
            strip_images: false,
            keep_classes: false,
        }
    }
}

/// Post-process extracted HTML by cleaning up remaining unwanted content
pub fn postprocess_html(html: &str, config: &PostProcessConfig) -> String {
    let mut processed = html.to_string();

    if config.remove_conditional_comments {
        processed = replace_all(&CONDITIONAL_COMMENT, &processed);
    }

    if config.strip_images {
        processed = replace_all(&IMG_TAG, &processed);
    }

    if !config.keep_classes {
        processed = replace_all(&CLASS_ATTR, &processed);
    }

    if config.remove_high_link_density {
        processed = remove_high_link_density_nodes(&processed, config.max_link_density);
    }

    if config.remove_empty_nodes {
        processed = remove_empty_nodes(&processed, config.max_empty_node_passes);
    }

    processed
}

fn replace_all(pattern: &LazyLock<Option<Regex>>, html: &str) -> String {
    match pattern.as_ref() {
        Some(re) => re.replace_all(html, "").into_owned(),
        None => html.to_string(),
    }
}

/// Remove empty nodes, repeating until nothing changes or `max_passes` is hit
///
/// Elements holding only whitespace or `<br>` count as empty. Removing one
/// can empty its parent, hence the passes.
fn remove_empty_nodes(html: &str, max_passes: usize) -> String {
    let mut result = html.to_string();

    for _ in 0..max_passes {
        let before = result.len();
        for re in EMPTY_NODES.iter() {
            result = re.replace_all(&result, "").into_owned();
        }
        if result.len() == before {
            break;
        }
    }

    result
}

/// Remove paragraphs whose text is mostly link text
fn remove_high_link_density_nodes(html: &str, max_density: f64) -> String {
    let Some(re) = PARAGRAPH.as_ref() else {
        return html.to_string();
    };

    re.replace_all(html, |caps: &Captures| {
        let whole = caps.get(0).map_or("", |m| m.as_str());
        let inner = caps.get(1).map_or("", |m| m.as_str());

        let text_length = strip_tags(inner).trim().chars().count();
        if text_length == 0 {
            return whole.to_string();
        }

        let density = link_text_length(inner) as f64 / text_length as f64;
        if density > max_density { String::new() } else { whole.to_string() }
    })
    .into_owned()
}

fn strip_tags(html: &str) -> String {
    match TAG.as_ref() {
        Some(re) => re.replace_all(html, "").into_owned(),
        None => html.to_string(),
    }
}

fn link_text_length(html: &str) -> usize {
    let Some(re) = LINK.as_ref() else {
        return 0;
    };

    re.captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| strip_tags(m.as_str()).trim().chars().count())
        .sum()
}
