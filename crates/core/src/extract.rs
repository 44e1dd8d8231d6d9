use std::collections::HashMap;

use crate::parse::{Document, Element};
use crate::postprocess::{PostProcessConfig, postprocess_html};
use crate::scoring::{ScoreConfig, ancestor_divider, base_tag_score, class_id_weight, link_density, paragraph_score};
use crate::{Result, SiphonError};

/// Configuration for content extraction
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Minimum score the top candidate must reach
    pub min_score_threshold: f64,
    /// Number of top candidates consulted when looking for a shared ancestor
    pub max_top_candidates: usize,
    /// How many ancestors above a paragraph receive part of its score
    pub max_ancestor_levels: usize,
    /// Sibling score threshold (multiplier of top score)
    pub sibling_threshold: f64,
    /// Floor for the sibling score threshold
    pub min_sibling_score: f64,
    /// Scoring weights
    pub score: ScoreConfig,
    /// Post-processing configuration
    pub postprocess: PostProcessConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_score_threshold: 10.0,
            max_top_candidates: 5,
            max_ancestor_levels: 5,
            sibling_threshold: 0.2,
            min_sibling_score: 10.0,
            score: ScoreConfig::default(),
            postprocess: PostProcessConfig::default(),
        }
    }
}

/// A container element with its accumulated score
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub element: Element<'a>,
    pub score: f64,
}

/// The result of content extraction
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// Cleaned article HTML
    pub content: String,
    /// Score of the winning candidate
    pub top_score: f64,
    /// Number of top-level elements joined into `content`
    pub element_count: usize,
}

/// Elements whose own text is scored
const PARAGRAPH_SELECTOR: &str = "p, pre, td, blockquote, div";

/// Children that stop a `div` from counting as a paragraph
const BLOCK_TAGS: &[&str] = &["blockquote", "dl", "div", "img", "ol", "p", "pre", "table", "ul"];

/// Minimum number of strong alternatives that must share an ancestor before it replaces the top candidate
const MIN_SHARED_CANDIDATES: usize = 3;

/// Ratio of the top score an alternative needs to count
const ALTERNATIVE_RATIO: f64 = 0.75;

/// A `div` is scored like a paragraph only when it has no block-level children
fn is_paragraph_like(element: &Element<'_>) -> bool {
    element.tag_name() != "div" || !element.children().any(|c| BLOCK_TAGS.contains(&c.tag_name().as_str()))
}

/// Score every ancestor of every paragraph-like element
///
/// Candidates come back in first-seen order with their final score, which
/// already includes the link-density penalty.
pub fn score_candidates<'a>(doc: &'a Document, config: &ExtractConfig) -> Result<Vec<Candidate<'a>>> {
    let mut candidates: Vec<Candidate<'a>> = Vec::new();
    let mut positions = HashMap::new();

    for paragraph in doc.select(PARAGRAPH_SELECTOR)? {
        if !is_paragraph_like(&paragraph) {
            continue;
        }
        let Some(score) = paragraph_score(&paragraph, &config.score) else {
            continue;
        };

        let ancestors = paragraph
            .ancestors()
            .take_while(|a| a.tag_name() != "html")
            .take(config.max_ancestor_levels);

        for (level, ancestor) in ancestors.enumerate() {
            let index = *positions.entry(ancestor.element_ref().id()).or_insert_with(|| {
                let initial = base_tag_score(&ancestor) + class_id_weight(&ancestor, &config.score);
                candidates.push(Candidate { element: ancestor, score: initial });
                candidates.len() - 1
            });
            candidates[index].score += score / ancestor_divider(level);
        }
    }

    for candidate in &mut candidates {
        candidate.score *= 1.0 - link_density(&candidate.element);
    }

    Ok(candidates)
}

/// Highest scoring candidate; ties go to the one seen first
fn best_candidate<'c, 'a>(candidates: &'c [Candidate<'a>]) -> Option<&'c Candidate<'a>> {
    candidates.iter().fold(None, |best, candidate| match best {
        Some(b) if b.score >= candidate.score => Some(b),
        _ => Some(candidate),
    })
}

/// Promote the top candidate to an ancestor shared by several strong alternatives
///
/// Articles split over sibling containers otherwise lose everything but the
/// single best block.
fn promote_shared_ancestor<'a>(top: Candidate<'a>, candidates: &[Candidate<'a>], config: &ExtractConfig) -> Candidate<'a> {
    let mut ranked: Vec<&Candidate<'a>> = candidates.iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    let top_id = top.element.element_ref().id();
    let alternatives: Vec<Vec<_>> = ranked
        .iter()
        .take(config.max_top_candidates)
        .filter(|c| c.element.element_ref().id() != top_id)
        .filter(|c| top.score > 0.0 && c.score / top.score >= ALTERNATIVE_RATIO)
        .map(|c| c.element.ancestors().map(|a| a.element_ref().id()).collect())
        .collect();

    if alternatives.len() < MIN_SHARED_CANDIDATES {
        return top;
    }

    for ancestor in top.element.ancestors().take_while(|a| !matches!(a.tag_name().as_str(), "body" | "html")) {
        let id = ancestor.element_ref().id();
        let sharing = alternatives.iter().filter(|chain| chain.contains(&id)).count();
        if sharing >= MIN_SHARED_CANDIDATES {
            let score = candidates
                .iter()
                .find(|c| c.element.element_ref().id() == id)
                .map_or(top.score, |c| c.score.max(top.score));
            return Candidate { element: ancestor, score };
        }
    }

    top
}

/// Select the top candidate from the list
///
/// Fails with `NoContent` when nothing was scored and with `NotReadable`
/// when the winner is below the minimum score.
fn select_top_candidate<'a>(candidates: &[Candidate<'a>], config: &ExtractConfig) -> Result<Candidate<'a>> {
    let top = *best_candidate(candidates).ok_or(SiphonError::NoContent)?;

    if top.score < config.min_score_threshold {
        return Err(SiphonError::NotReadable { score: top.score, threshold: config.min_score_threshold });
    }

    Ok(promote_shared_ancestor(top, candidates, config))
}

/// Collect the top candidate and its qualifying siblings in document order
///
/// A sibling qualifies when:
/// - its score (plus a bonus when it shares the top candidate's class) reaches
///   `max(min_sibling_score, top_score * sibling_threshold)`
/// - it is a `<p>` longer than 80 characters with link density below 0.25
/// - it is a short `<p>` without links that reads like a sentence
fn select_siblings<'a>(top: &Candidate<'a>, candidates: &[Candidate<'a>], config: &ExtractConfig) -> Vec<Element<'a>> {
    let Some(parent) = top.element.parent() else {
        return vec![top.element];
    };

    let threshold = (top.score * config.sibling_threshold).max(config.min_sibling_score);
    let top_id = top.element.element_ref().id();
    let top_class = top.element.attr("class").filter(|c| !c.trim().is_empty());

    parent
        .children()
        .filter(|sibling| {
            let id = sibling.element_ref().id();
            if id == top_id {
                return true;
            }

            let bonus = match (top_class, sibling.attr("class")) {
                (Some(a), Some(b)) if a == b => top.score * config.sibling_threshold,
                _ => 0.0,
            };
            let score = candidates.iter().find(|c| c.element.element_ref().id() == id).map_or(0.0, |c| c.score);
            if score + bonus >= threshold {
                return true;
            }

            if sibling.tag_name() != "p" {
                return false;
            }

            let text = sibling.text();
            let text = text.trim();
            let length = text.chars().count();
            let density = link_density(sibling);

            if length > 80 {
                density < 0.25
            } else {
                length > 0 && density == 0.0 && (text.ends_with('.') || text.contains(". "))
            }
        })
        .collect()
}

/// Extract the main content from a document
///
/// 1. Scores paragraph-like elements into their ancestors
/// 2. Selects the top candidate
/// 3. Includes qualifying siblings
/// 4. Post-processes the joined HTML
pub fn extract_content(doc: &Document, config: &ExtractConfig) -> Result<ExtractedContent> {
    let candidates = score_candidates(doc, config)?;
    let top = select_top_candidate(&candidates, config)?;
    let elements = select_siblings(&top, &candidates, config);

    let content = elements.iter().map(|e| e.outer_html()).collect::<Vec<_>>().join("\n");
    let content = postprocess_html(&content, &config.postprocess);

    Ok(ExtractedContent { content, top_score: top.score, element_count: elements.len() })
}
