//! Shared WordprocessingML helpers.
//!
//! Stored fragments are rootless node sequences, so they never parse as
//! standalone XML documents. This module implements the two-tier strategy
//! used throughout the crate: wrap the sequence in a synthetic root that
//! declares the common WordprocessingML namespaces and parse it properly
//! (tier one), or fall back to the tolerant [`salvage`] scanner and flag
//! the result as low-confidence (tier two).

use std::fmt::Write as _;

use roxmltree::Node;

/// The main WordprocessingML namespace.
pub const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Namespace prefixes a stored fragment may legitimately use.
///
/// The synthetic root declares all of them so tier-one parsing survives
/// fragments that carry drawings, math, or 2010+ extension attributes.
pub(crate) const NAMESPACES: &[(&str, &str)] = &[
    ("w", WORDML_NS),
    (
        "r",
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships",
    ),
    (
        "wp",
        "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing",
    ),
    ("a", "http://schemas.openxmlformats.org/drawingml/2006/main"),
    (
        "pic",
        "http://schemas.openxmlformats.org/drawingml/2006/picture",
    ),
    ("m", "http://schemas.openxmlformats.org/officeDocument/2006/math"),
    ("mc", "http://schemas.openxmlformats.org/markup-compatibility/2006"),
    ("v", "urn:schemas-microsoft-com:vml"),
    ("o", "urn:schemas-microsoft-com:office:office"),
    ("w10", "urn:schemas-microsoft-com:office:word"),
    ("w14", "http://schemas.microsoft.com/office/word/2010/wordml"),
    ("w15", "http://schemas.microsoft.com/office/word/2012/wordml"),
    (
        "wps",
        "http://schemas.microsoft.com/office/word/2010/wordprocessingShape",
    ),
    (
        "wpg",
        "http://schemas.microsoft.com/office/word/2010/wordprocessingGroup",
    ),
];

/// How a fragment's content was extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// Tier one: the wrapped fragment parsed as well-formed XML.
    Parsed,
    /// Tier two: the pattern-based salvage scanner was used.
    Salvaged,
}

impl Confidence {
    /// Whether this extraction should be treated as low-confidence.
    pub fn is_low(self) -> bool {
        matches!(self, Confidence::Salvaged)
    }
}

/// Wrap a rootless node sequence in a synthetic namespaced root.
pub fn wrap(content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 1024);
    out.push_str("<root");
    for (prefix, uri) in NAMESPACES {
        let _ = write!(out, " xmlns:{prefix}=\"{uri}\"");
    }
    out.push('>');
    out.push_str(content);
    out.push_str("</root>");
    out
}

/// Byte length of the synthetic root's opening tag.
///
/// Offsets into a wrapped document minus this length are offsets into the
/// original fragment text.
pub fn wrapper_prefix_len() -> usize {
    wrap("").len() - "</root>".len()
}

/// True if `node` is an element with the given local name, any prefix.
pub fn is_elem(node: Node, local: &str) -> bool {
    node.is_element() && node.tag_name().name() == local
}

/// Look up an attribute by local name, ignoring its namespace prefix.
pub fn attr<'a>(node: Node<'a, '_>, local: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name() == local)
        .map(|a| a.value())
}

/// First descendant element with the given local name, document order.
pub fn find_descendant<'a, 'input>(
    node: Node<'a, 'input>,
    local: &str,
) -> Option<Node<'a, 'input>> {
    node.descendants().find(|n| is_elem(*n, local))
}

/// Concatenated text of all `w:t` descendants.
pub fn visible_text(node: Node) -> String {
    let mut out = String::new();
    for t in node.descendants().filter(|n| is_elem(*n, "t")) {
        if let Some(text) = t.text() {
            out.push_str(text);
        }
    }
    out
}

/// Element names that anchor real content even without any text.
const OBJECT_NAMES: &[&str] = &["drawing", "object", "pict", "oMath", "oMathPara"];

/// True if the node embeds a drawing, OLE object, picture, or equation.
pub fn has_embedded_object(node: Node) -> bool {
    node.descendants()
        .any(|n| n.is_element() && OBJECT_NAMES.contains(&n.tag_name().name()))
}

/// True if a paragraph node has no visible text and embeds no object.
///
/// Formatting-only paragraphs (runs with properties but no text, manual
/// breaks, bookmarks) count as empty: they are exactly the residue a naive
/// concatenation leaves behind.
pub fn paragraph_is_empty(node: Node) -> bool {
    visible_text(node).trim().is_empty() && !has_embedded_object(node)
}

/// Escape a string for use as XML text content.
pub fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape a string for use inside a double-quoted XML attribute.
pub fn escape_attr(value: &str) -> String {
    escape_text(value)
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub mod salvage {
    //! Tier-two pattern-based extraction for content that does not parse.
    //!
    //! Everything produced here is positional guesswork over malformed
    //! text; callers must flag results with [`Confidence::Salvaged`].

    use regex::Regex;

    /// Extract the first `w:val` of a style marker element (`pStyle`,
    /// `tblStyle`, `rStyle`, `tcStyle`) without parsing.
    pub fn style_id(content: &str, marker: &str) -> Option<String> {
        let patterns = [
            format!(r#"(?is)<w:{marker}[^>]*w:val=["']([^"']*)["']"#),
            format!(r#"(?is){marker}[^>]*val=["']([^"']*)["']"#),
        ];
        for pattern in &patterns {
            let re = Regex::new(pattern).unwrap();
            if let Some(caps) = re.captures(content) {
                let id = caps[1].to_string();
                if !id.is_empty() {
                    return Some(id);
                }
            }
        }
        None
    }

    /// A salvaged top-level chunk of fragment content.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Chunk {
        /// A `<w:p>` element, raw text.
        Paragraph(String),
        /// A `<w:tbl>` element, raw text. Nested tables are truncated at
        /// the first close tag; that is the accepted salvage limitation.
        Table(String),
    }

    /// Extract paragraph and table chunks positionally.
    pub fn body_chunks(content: &str) -> Vec<Chunk> {
        let re = Regex::new(
            r"(?s)<w:tbl[ >].*?</w:tbl>|<w:p/>|<w:p [^>]*/>|<w:p[ >].*?</w:p>",
        )
        .unwrap();
        re.find_iter(content)
            .map(|m| {
                let text = m.as_str().to_string();
                if text.starts_with("<w:tbl") {
                    Chunk::Table(text)
                } else {
                    Chunk::Paragraph(text)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    #[test]
    fn test_wrap_parses_rootless_sequence() {
        let content = "<w:p><w:r><w:t>a</w:t></w:r></w:p><w:tbl><w:tr/></w:tbl>";
        let wrapped = wrap(content);
        let doc = Document::parse(&wrapped).unwrap();
        let children: Vec<_> = doc
            .root_element()
            .children()
            .filter(|n| n.is_element())
            .collect();
        assert_eq!(children.len(), 2);
        assert!(is_elem(children[0], "p"));
        assert!(is_elem(children[1], "tbl"));
    }

    #[test]
    fn test_wrapper_prefix_len_maps_offsets() {
        let content = "<w:p/>";
        let wrapped = wrap(content);
        let prefix = wrapper_prefix_len();
        assert_eq!(&wrapped[prefix..prefix + content.len()], content);
    }

    #[test]
    fn test_attr_ignores_prefix() {
        let wrapped = wrap(r#"<w:pStyle w:val="Heading1"/>"#);
        let doc = Document::parse(&wrapped).unwrap();
        let node = find_descendant(doc.root_element(), "pStyle").unwrap();
        assert_eq!(attr(node, "val"), Some("Heading1"));
    }

    #[test]
    fn test_visible_text_concatenates_runs() {
        let wrapped = wrap("<w:p><w:r><w:t>Hello </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p>");
        let doc = Document::parse(&wrapped).unwrap();
        let p = find_descendant(doc.root_element(), "p").unwrap();
        assert_eq!(visible_text(p), "Hello world");
    }

    #[test]
    fn test_paragraph_is_empty() {
        let empty = wrap("<w:p><w:pPr><w:jc w:val=\"center\"/></w:pPr></w:p>");
        let doc = Document::parse(&empty).unwrap();
        assert!(paragraph_is_empty(
            find_descendant(doc.root_element(), "p").unwrap()
        ));

        let with_drawing = wrap("<w:p><w:r><w:drawing/></w:r></w:p>");
        let doc = Document::parse(&with_drawing).unwrap();
        assert!(!paragraph_is_empty(
            find_descendant(doc.root_element(), "p").unwrap()
        ));

        let with_text = wrap("<w:p><w:r><w:t>x</w:t></w:r></w:p>");
        let doc = Document::parse(&with_text).unwrap();
        assert!(!paragraph_is_empty(
            find_descendant(doc.root_element(), "p").unwrap()
        ));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape_text("a<b&c>d"), "a&lt;b&amp;c&gt;d");
        assert_eq!(escape_attr(r#"a"b'c"#), "a&quot;b&apos;c");
    }

    #[test]
    fn test_salvage_style_id() {
        let broken = r#"<w:tbl><w:tblPr><w:tblStyle w:val="GridTable"/><w:tblPr>"#;
        assert_eq!(
            salvage::style_id(broken, "tblStyle"),
            Some("GridTable".to_string())
        );
        assert_eq!(salvage::style_id(broken, "pStyle"), None);
    }

    #[test]
    fn test_salvage_body_chunks_positional_order() {
        let broken = "<w:p><w:r><w:t>before</w:t></w:r></w:p>\
                      <w:tbl><w:tr><w:tc/></w:tr></w:tbl>\
                      <w:p/><junk";
        let chunks = salvage::body_chunks(broken);
        assert_eq!(chunks.len(), 3);
        assert!(matches!(chunks[0], salvage::Chunk::Paragraph(_)));
        assert!(matches!(chunks[1], salvage::Chunk::Table(_)));
        assert!(matches!(chunks[2], salvage::Chunk::Paragraph(_)));
    }

    #[test]
    fn test_salvage_does_not_match_ppr() {
        let content = "<w:pPr><w:jc w:val=\"left\"/></w:pPr>";
        assert!(salvage::body_chunks(content).is_empty());
    }
}
