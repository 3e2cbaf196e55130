// ABOUTME: Readability-style scoring to locate the main content element of a page.
// ABOUTME: Scores paragraphs, propagates to ancestors, boosts known content containers and picks the top candidate.

use std::collections::HashMap;

use ego_tree::NodeId;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

static PARAGRAPH_SCORE_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(p|li|span|pre)$").unwrap());
static CHILD_CONTENT_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(td|blockquote|ol|ul|dl)$").unwrap());
static BAD_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(address|form)$").unwrap());
static NON_TOP_CANDIDATE_TAGS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(br|b|i|label|hr|area|base|basefont|input|img|link|meta|html|head|body)$")
        .unwrap()
});
// English readability hints plus the Portuguese class names used on government portals.
static POSITIVE_SCORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)article|body|content|entry|hentry|main|page|post|story|text|conteudo|materia|noticia|texto|corpo").unwrap()
});
static NEGATIVE_SCORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)advert|banner|breadcrumb|byline|comment|contact|footer|foot|header|menu|meta|modal|nav|promo|related|share|sidebar|social|sponsor|tags|widget|rodape|cabecalho|compartilh|relacionad|barra|portal-?siteactions").unwrap()
});

/// Container selectors that mark article bodies on common CMS templates.
const CONTENT_BOOST_SELECTORS: &[&str] = &[
    "#parent-fieldname-text",
    "#content-core",
    ".entry-content",
    ".post-body",
    "article",
    "[itemprop=articleBody]",
];

static P_PRE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p, pre").unwrap());
static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static ALL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("*").unwrap());
static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

/// Score storage keyed by tree node.
pub type NodeScores = HashMap<NodeId, i32>;

fn score_of(node_id: NodeId, scores: &NodeScores) -> i32 {
    scores.get(&node_id).copied().unwrap_or(0)
}

/// Commas plus a bonus per 50 characters, penalizing very short paragraphs.
fn score_paragraph(text: &str) -> i32 {
    let text = text.trim();
    if text.is_empty() {
        return 0;
    }

    let len = text.chars().count();
    let mut score = text.matches(',').count() as i32;
    score += (len / 50) as i32;
    if len < 20 {
        score -= 10;
    }
    if (50..=200).contains(&len) {
        score += 5;
    }
    score
}

fn score_node(element: &ElementRef) -> i32 {
    let tag_name = element.value().name().to_lowercase();

    if PARAGRAPH_SCORE_TAGS.is_match(&tag_name) {
        return score_paragraph(&element.text().collect::<String>());
    }
    if tag_name == "div" {
        return 5;
    }
    if CHILD_CONTENT_TAGS.is_match(&tag_name) {
        return 3;
    }
    if BAD_TAGS.is_match(&tag_name) {
        return -3;
    }
    if tag_name == "th" {
        return -5;
    }
    0
}

/// Weight from class and id hints.
pub fn get_weight(element: &ElementRef) -> i32 {
    let mut score = 0;
    for hint in [
        element.value().attr("id").unwrap_or(""),
        element.value().attr("class").unwrap_or(""),
    ] {
        if hint.is_empty() {
            continue;
        }
        if POSITIVE_SCORE_RE.is_match(hint) {
            score += 25;
        }
        if NEGATIVE_SCORE_RE.is_match(hint) {
            score -= 25;
        }
    }
    score
}

/// Ratio of link text to total text.
pub fn link_density(element: &ElementRef) -> f64 {
    let total_len = element.text().map(str::len).sum::<usize>();
    if total_len == 0 {
        return 0.0;
    }
    let link_len: usize = element
        .select(&ANCHOR_SELECTOR)
        .map(|a| a.text().map(str::len).sum::<usize>())
        .sum();
    link_len as f64 / total_len as f64
}

/// Scores the elements below `root`.
///
/// Known content containers get a flat boost; every `p`/`pre` contributes
/// its paragraph score to its parent and half of it to its grandparent.
pub fn score_content(root: ElementRef<'_>) -> NodeScores {
    fn init_score(element: &ElementRef, scores: &mut NodeScores) -> i32 {
        let node_id = element.id();
        if let Some(existing) = scores.get(&node_id) {
            return *existing;
        }
        let score = score_node(element) + get_weight(element);
        scores.insert(node_id, score);
        score
    }

    fn add_score_to(element: &ElementRef, amount: i32, scores: &mut NodeScores) {
        let base = init_score(element, scores);
        scores.insert(element.id(), base + amount);
    }

    let mut scores = NodeScores::new();

    for css in CONTENT_BOOST_SELECTORS {
        if let Ok(selector) = Selector::parse(css) {
            for element in root.select(&selector) {
                add_score_to(&element, 80, &mut scores);
            }
        }
    }

    for element in root.select(&P_PRE_SELECTOR) {
        let raw_score = score_node(&element);
        init_score(&element, &mut scores);

        if let Some(parent) = element.parent().and_then(ElementRef::wrap) {
            add_score_to(&parent, raw_score, &mut scores);
            if let Some(grandparent) = parent.parent().and_then(ElementRef::wrap) {
                add_score_to(&grandparent, raw_score / 2, &mut scores);
            }
        }
    }

    scores
}

/// The highest scoring candidate below `root`, falling back to `<body>` (or `root`).
///
/// A paragraph-level winner is promoted to its enclosing block, which may be
/// `<body>` itself when the paragraphs sit directly under it.
pub fn find_top_candidate<'a>(root: ElementRef<'a>, scores: &NodeScores) -> ElementRef<'a> {
    let mut best: Option<ElementRef<'a>> = None;
    let mut top_score = 0;

    for element in root.select(&ALL_SELECTOR) {
        let Some(&score) = scores.get(&element.id()) else {
            continue;
        };
        if NON_TOP_CANDIDATE_TAGS_RE.is_match(element.value().name()) {
            continue;
        }

        let density = link_density(&element);
        let adjusted = if density > 0.5 {
            (score as f64 * (1.0 - density)).round() as i32
        } else {
            score
        };

        if adjusted > top_score {
            top_score = adjusted;
            best = Some(element);
        }
    }

    match best {
        Some(candidate) => promote_paragraph(candidate),
        None => root.select(&BODY_SELECTOR).next().unwrap_or(root),
    }
}

fn promote_paragraph(mut candidate: ElementRef<'_>) -> ElementRef<'_> {
    while PARAGRAPH_SCORE_TAGS.is_match(candidate.value().name()) {
        match candidate.parent().and_then(ElementRef::wrap) {
            Some(parent) if parent.value().name() != "html" => candidate = parent,
            _ => break,
        }
    }
    candidate
}

fn has_sentence_end(text: &str) -> bool {
    matches!(
        text.trim_end().chars().last(),
        Some('.' | '!' | '?' | ':' | ';')
    )
}

/// The candidate plus the siblings that look like part of the same text,
/// in document order.
///
/// A sibling joins when its score (with a bonus for low link density and a
/// shared class) reaches `max(10, top_score / 4)`, or when it is a paragraph
/// that reads like prose.
pub fn merge_siblings<'a>(
    candidate: ElementRef<'a>,
    top_score: i32,
    scores: &NodeScores,
) -> Vec<ElementRef<'a>> {
    let Some(parent) = candidate.parent() else {
        return vec![candidate];
    };

    let threshold = 10i32.max((top_score as f64 * 0.25) as i32);
    let candidate_class = candidate.value().attr("class").unwrap_or("");
    let mut included = Vec::new();

    for sibling in parent.children().filter_map(ElementRef::wrap) {
        if sibling.id() == candidate.id() {
            included.push(sibling);
            continue;
        }
        let tag_name = sibling.value().name();
        if NON_TOP_CANDIDATE_TAGS_RE.is_match(tag_name) {
            continue;
        }
        let score = score_of(sibling.id(), scores);
        if score <= 0 {
            continue;
        }

        let density = link_density(&sibling);
        if density >= 0.5 {
            continue;
        }
        let mut bonus = 0;
        if density < 0.05 {
            bonus += 20;
        }
        let class = sibling.value().attr("class").unwrap_or("");
        if !class.is_empty() && class == candidate_class {
            bonus += (top_score as f64 * 0.2) as i32;
        }

        if score + bonus >= threshold {
            included.push(sibling);
            continue;
        }

        if tag_name == "p" {
            let text = sibling.text().collect::<String>();
            let len = text.split_whitespace().collect::<Vec<_>>().join(" ").chars().count();
            if (len > 80 && density < 0.25) || (density == 0.0 && has_sentence_end(&text)) {
                included.push(sibling);
            }
        }
    }

    included
}

/// Detects the main content below `root`: the top candidate and the sibling
/// blocks merged with it, in document order. Never empty.
pub fn main_content(root: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let scores = score_content(root);
    let candidate = find_top_candidate(root, &scores);
    let top_score = score_of(candidate.id(), &scores);
    let blocks = merge_siblings(candidate, top_score, &scores);
    tracing::trace!(
        tag = candidate.value().name(),
        score = top_score,
        blocks = blocks.len(),
        "main content candidate"
    );
    blocks
}
