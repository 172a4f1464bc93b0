//! HTML-to-plain-text extraction.
//!
//! The contract: given markup, return the concatenation of all text nodes,
//! with tag structure and `<script>`/`<style>` content stripped and
//! whitespace collapsed. No attempt is made to preserve layout.

use scraper::{Html, Node};

/// Strip markup down to its visible text.
pub fn extract_text(html: &str) -> String {
    let doc = Html::parse_fragment(html);

    let mut raw = String::new();
    for child in doc.tree.root().children() {
        collect_text(child, &mut raw);
    }

    // Collapse whitespace runs: storage-format markup is indentation-heavy.
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Walk a node subtree, appending text-node content.
fn collect_text(node: ego_tree::NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(&text),
        Node::Element(el) => {
            if matches!(el.name(), "script" | "style") {
                return;
            }
            for child in node.children() {
                collect_text(child, out);
            }
        }
        _ => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_simple_tags() {
        assert_eq!(extract_text("<p>disk full</p>"), "disk full");
    }

    #[test]
    fn concatenates_nested_elements() {
        let html = "<div><h1>INC-001</h1><p>El servicio se <strong>cayó</strong> a las 03:00.</p></div>";
        assert_eq!(
            extract_text(html),
            "INC-001El servicio se cayó a las 03:00."
        );
    }

    #[test]
    fn drops_script_and_style_content() {
        let html = r#"<div><script>alert("x");</script><style>p { color: red }</style><p>visible</p></div>"#;
        assert_eq!(extract_text(html), "visible");
    }

    #[test]
    fn collapses_whitespace() {
        let html = "<p>\n    disk\n    full\n</p>";
        assert_eq!(extract_text(html), "disk full");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(extract_text("no markup here"), "no markup here");
    }

    #[test]
    fn empty_input() {
        assert_eq!(extract_text(""), "");
    }
}
