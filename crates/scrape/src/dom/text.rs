// ABOUTME: Block-aware plain text rendering of an element subtree.
// ABOUTME: Emits newlines at block boundaries and skips non-visible elements like script and style.

use ego_tree::iter::Edge;
use scraper::{ElementRef, Node};

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "iframe", "svg"];

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li",
    "main", "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

fn is_block(name: &str) -> bool {
    BLOCK_TAGS.contains(&name)
}

/// Visible text of `root` with a newline wherever a block element opens or closes.
///
/// Lines are not trimmed; callers split on `'\n'` and clean up.
pub fn block_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    let mut skip_depth = 0usize;

    for edge in root.traverse() {
        match edge {
            Edge::Open(node) => match node.value() {
                Node::Element(el) => {
                    if skip_depth > 0 || SKIPPED_TAGS.contains(&el.name()) {
                        skip_depth += 1;
                    } else if is_block(el.name()) {
                        out.push('\n');
                    }
                }
                Node::Text(text) if skip_depth == 0 => out.push_str(text),
                _ => {}
            },
            Edge::Close(node) => {
                if let Node::Element(el) = node.value() {
                    if skip_depth > 0 {
                        skip_depth -= 1;
                    } else if is_block(el.name()) {
                        out.push('\n');
                    }
                }
            }
        }
    }

    out
}

/// Non-empty trimmed lines of [`block_text`].
pub fn text_lines(root: ElementRef<'_>) -> Vec<String> {
    block_text(root)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scraper::Html;

    #[test]
    fn test_text_lines_split_blocks_and_skip_scripts() {
        let doc = Html::parse_document(
            r#"<body><h1>Título</h1><script>var x = 1;</script>
               <p>Primeiro <b>parágrafo</b></p><p>Segundo</p><style>p{}</style></body>"#,
        );
        assert_eq!(
            text_lines(doc.root_element()),
            vec!["Título", "Primeiro parágrafo", "Segundo"]
        );
    }

    #[test]
    fn test_inline_elements_do_not_break_lines() {
        let doc = Html::parse_document("<p>a <span>b</span> <em>c</em></p>");
        assert_eq!(text_lines(doc.root_element()), vec!["a b c"]);
    }
}
