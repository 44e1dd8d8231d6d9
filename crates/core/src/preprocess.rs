use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static UNLIKELY_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup)",
    )
    .ok()
});

static POSITIVE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story|tweet)").ok()
});

static COMMENT_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").ok());

/// Configuration for the readability preprocessing pass
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Whether to remove script tags
    pub remove_scripts: bool,
    /// Whether to remove style tags
    pub remove_styles: bool,
    /// Whether to remove noscript, iframe, svg and canvas tags
    pub remove_embeds: bool,
    /// Whether to remove HTML comments
    pub remove_comments: bool,
    /// Whether to unwrap unlikely candidates (by class/id)
    pub remove_unlikely: bool,
    /// Whether to keep positive candidates even if they match unlikely patterns
    pub keep_positive: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            remove_scripts: true,
            remove_styles: true,
            remove_embeds: true,
            remove_comments: true,
            remove_unlikely: true,
            keep_positive: true,
        }
    }
}

/// Preprocess HTML by removing nodes that never carry article text
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let mut processed = remove_unwanted_tags(html, config);

    if config.remove_comments {
        processed = remove_comments(&processed);
    }

    if config.remove_unlikely {
        processed = remove_unlikely_candidates(&processed, config.keep_positive);
    }

    processed
}

/// Run a single `lol_html` pass, falling back to the input on rewriter errors.
/// An empty output is a valid result.
pub(crate) fn rewrite(
    html: &str, handlers: Vec<(std::borrow::Cow<'_, lol_html::Selector>, lol_html::ElementContentHandlers<'_>)>,
) -> String {
    let mut output = String::with_capacity(html.len());
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings { element_content_handlers: handlers, ..Default::default() },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if let Err(e) = rewriter.write(html.as_bytes()) {
        warn!(error = %e, "HTML rewrite failed, keeping input");
        return html.to_string();
    }

    if let Err(e) = rewriter.end() {
        warn!(error = %e, "HTML rewrite failed, keeping input");
        return html.to_string();
    }

    output
}

/// Remove script, style and embedded-media tags together with their content
fn remove_unwanted_tags(html: &str, config: &PreprocessConfig) -> String {
    let mut tags: Vec<&str> = Vec::new();
    if config.remove_scripts {
        tags.push("script");
    }
    if config.remove_styles {
        tags.push("style");
    }
    if config.remove_embeds {
        tags.extend(["noscript", "iframe", "svg", "canvas"]);
    }
    if tags.is_empty() {
        return html.to_string();
    }

    let handlers = tags
        .into_iter()
        .map(|tag| {
            lol_html::element!(tag, |el| {
                el.remove();
                Ok(())
            })
        })
        .collect();

    rewrite(html, handlers)
}

/// Remove HTML comments from the document
fn remove_comments(html: &str) -> String {
    match COMMENT_PATTERN.as_ref() {
        Some(re) => re.replace_all(html, "").to_string(),
        None => html.to_string(),
    }
}

/// Unwrap elements whose class or id marks them as page chrome
fn remove_unlikely_candidates(html: &str, keep_positive: bool) -> String {
    let (Some(unlikely), Some(positive)) = (UNLIKELY_PATTERN.as_ref(), POSITIVE_PATTERN.as_ref()) else {
        return html.to_string();
    };

    let is_unlikely = |value: &str| unlikely.is_match(value) && (!keep_positive || !positive.is_match(value));

    rewrite(
        html,
        vec![lol_html::element!("*", |el| {
            if matches!(el.tag_name().as_str(), "html" | "body" | "article" | "main") {
                return Ok(());
            }

            if let Some(id) = el.get_attribute("id")
                && is_unlikely(&id)
            {
                el.remove_and_keep_content();
                return Ok(());
            }

            if let Some(class) = el.get_attribute("class")
                && class.split_whitespace().any(|c| is_unlikely(c))
            {
                el.remove_and_keep_content();
            }

            Ok(())
        })],
    )
}
