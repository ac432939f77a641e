//! Composed body node types.

use serde::{Deserialize, Serialize};

/// A paragraph-level section break that starts a new page when rendered.
pub const SECTION_BREAK_XML: &str =
    "<w:p><w:pPr><w:sectPr><w:type w:val=\"nextPage\"/></w:sectPr></w:pPr></w:p>";

/// One node in a composed document body.
///
/// Paragraph and table payloads are raw WordprocessingML text, carried
/// verbatim from the source fragment (modulo table alignment
/// normalization) so attribute sets, namespace prefixes, and `xml:space`
/// markers survive recomposition unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyNode {
    /// A `w:p` element.
    Paragraph(String),
    /// A `w:tbl` element.
    Table(String),
    /// A synthetic new-page separator inserted between fragments.
    SectionBreak,
}

impl BodyNode {
    /// The node's serialized form.
    pub fn xml(&self) -> &str {
        match self {
            BodyNode::Paragraph(xml) | BodyNode::Table(xml) => xml,
            BodyNode::SectionBreak => SECTION_BREAK_XML,
        }
    }

    /// Whether this node is a separator.
    pub fn is_section_break(&self) -> bool {
        matches!(self, BodyNode::SectionBreak)
    }

    /// Whether this node is a table.
    pub fn is_table(&self) -> bool {
        matches!(self, BodyNode::Table(_))
    }
}

/// An ordered node sequence ready for packaging.
///
/// Built fresh per export request and discarded after packaging. Node
/// order equals requested fragment order, with separators only between,
/// never after, the last fragment.
#[derive(Debug, Clone, Default)]
pub struct ComposedDocument {
    /// Body nodes in final order.
    pub nodes: Vec<BodyNode>,
}

impl ComposedDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no content was collected.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of section-break separators.
    pub fn section_break_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_section_break()).count()
    }

    /// Number of table nodes.
    pub fn table_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_table()).count()
    }

    /// Serialize the node sequence to body-interior XML text.
    ///
    /// Identical node sequences serialize to identical bytes.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(self.nodes.iter().map(|n| n.xml().len()).sum());
        for node in &self.nodes {
            out.push_str(node.xml());
        }
        out
    }
}
