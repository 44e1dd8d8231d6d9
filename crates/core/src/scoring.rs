use crate::parse::Element;
use regex::Regex;
use std::sync::LazyLock;

/// Positive patterns that suggest an element contains main content
static POSITIVE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story|tweet)").ok()
});

/// Negative patterns that suggest an element does NOT contain main content
static NEGATIVE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup)").ok()
});

/// Weights used when scoring candidate containers
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Weight for positive class/ID patterns
    pub positive_weight: f64,
    /// Weight for negative class/ID patterns
    pub negative_weight: f64,
    /// Maximum paragraph bonus earned from text length
    pub max_length_bonus: f64,
    /// Characters per point of length bonus
    pub chars_per_point: usize,
    /// Paragraphs shorter than this do not contribute to any ancestor
    pub min_paragraph_chars: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            positive_weight: 25.0,
            negative_weight: -25.0,
            max_length_bonus: 3.0,
            chars_per_point: 100,
            min_paragraph_chars: 25,
        }
    }
}

/// Initial score for a container based on its tag name
///
/// - ARTICLE: +10, SECTION: +8, DIV: +5
/// - PRE, TD, BLOCKQUOTE: +3
/// - ADDRESS, OL, UL, DL, DD, DT, LI, FORM: -3
/// - H1-H6, TH, HEADER, FOOTER, NAV: -5
pub fn base_tag_score(element: &Element<'_>) -> f64 {
    match element.tag_name().as_str() {
        "article" => 10.0,
        "section" => 8.0,
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" | "footer" | "nav" => -5.0,
        _ => 0.0,
    }
}

/// Class/ID weight adjustment for an element
///
/// Sanitized documents carry no class or id attributes, so this only moves
/// scores for raw input.
pub fn class_id_weight(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let (Some(positive), Some(negative)) = (POSITIVE_PATTERN.as_ref(), NEGATIVE_PATTERN.as_ref()) else {
        return 0.0;
    };

    let mut weight = 0.0;
    for value in [element.attr("class"), element.attr("id")].into_iter().flatten() {
        if negative.is_match(value) {
            weight += config.negative_weight;
        }
        if positive.is_match(value) {
            weight += config.positive_weight;
        }
    }

    weight
}

/// Score contributed by one paragraph-like element to its ancestors
///
/// One point for existing, one per comma, and one per `chars_per_point`
/// characters up to `max_length_bonus`. Returns `None` for paragraphs too
/// short to count.
pub fn paragraph_score(element: &Element<'_>, config: &ScoreConfig) -> Option<f64> {
    let text = element.text();
    let text = text.trim();
    let length = text.chars().count();
    if length < config.min_paragraph_chars {
        return None;
    }

    let commas = text.matches(',').count() as f64;
    let length_bonus = ((length / config.chars_per_point) as f64).min(config.max_length_bonus);

    Some(1.0 + commas + length_bonus)
}

/// Divider applied to a paragraph score for the ancestor `level` steps up
///
/// The parent takes the full score, the grandparent half, and anything
/// further `level * 3`.
pub fn ancestor_divider(level: usize) -> f64 {
    match level {
        0 => 1.0,
        1 => 2.0,
        n => n as f64 * 3.0,
    }
}

/// Calculate the link density of an element
///
/// Link density is the ratio of link text characters to total text characters.
/// Returns a value from 0.0 (no links) to 1.0 (all text is in links).
pub fn link_density(element: &Element<'_>) -> f64 {
    let text_length = element.text().chars().count();

    if text_length == 0 {
        return 0.0;
    }

    let link_text_length = element
        .select("a")
        .unwrap_or_default()
        .iter()
        .map(|link| link.text().chars().count())
        .sum::<usize>();

    link_text_length as f64 / text_length as f64
}
