//! Concatenating fragment contents into one body-node sequence.
//!
//! Composition is a pure function of the ordered fragment list: parse
//! each fragment independently, normalize table alignment, splice in
//! page separators, then remove the blank-paragraph residue a naive
//! concatenation would leave behind.

use rayon::prelude::*;
use roxmltree::{Document, Node};

use crate::model::{BodyNode, ComposedDocument, FragmentRecord};
use crate::xml::{self, salvage, Confidence};

const JC_CENTER: &str = "<w:jc w:val=\"center\"/>";
const TBLPR_CENTER: &str = "<w:tblPr><w:jc w:val=\"center\"/></w:tblPr>";

/// `w:tblPr` children that the schema orders after `w:jc`.
///
/// A synthesized alignment must be spliced in before the first of these
/// so strict consumers keep accepting the table properties.
const AFTER_JC: &[&str] = &[
    "tblCellSpacing",
    "tblInd",
    "tblBorders",
    "shd",
    "tblLayout",
    "tblCellMar",
    "tblLook",
    "tblCaption",
    "tblDescription",
];

/// Options for document composition.
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// Insert a new-page separator between consecutive fragments.
    pub page_breaks: bool,

    /// Parse fragments in parallel. Output order is unaffected.
    pub parallel: bool,
}

impl ComposeOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable page separators.
    pub fn with_page_breaks(mut self, enabled: bool) -> Self {
        self.page_breaks = enabled;
        self
    }

    /// Disable parallel fragment parsing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            page_breaks: true,
            parallel: true,
        }
    }
}

/// Result of composing an ordered fragment list.
#[derive(Debug, Clone)]
pub struct ComposeOutcome {
    /// The composed node sequence. Empty when every fragment failed;
    /// the caller treats that as fatal.
    pub document: ComposedDocument,

    /// Ids of fragments dropped because their content yielded no nodes.
    pub dropped: Vec<String>,

    /// Ids whose content only yielded nodes through the salvage scanner.
    pub low_confidence: Vec<String>,
}

/// Composes ordered fragments into a single body-node sequence.
#[derive(Debug, Clone, Default)]
pub struct Composer {
    options: ComposeOptions,
}

impl Composer {
    /// Create a composer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a composer with the given options.
    pub fn with_options(options: ComposeOptions) -> Self {
        Self { options }
    }

    /// Compose fragments in request order.
    ///
    /// Unparseable fragments are dropped and reported by id, never fatal.
    /// Identical ordered input yields an identical node sequence.
    pub fn compose(&self, fragments: &[FragmentRecord]) -> ComposeOutcome {
        let parsed: Vec<(String, Option<(Vec<BodyNode>, Confidence)>)> = if self.options.parallel
        {
            fragments
                .par_iter()
                .map(|f| (f.id.clone(), fragment_nodes(&f.content)))
                .collect()
        } else {
            fragments
                .iter()
                .map(|f| (f.id.clone(), fragment_nodes(&f.content)))
                .collect()
        };

        let mut nodes: Vec<BodyNode> = Vec::new();
        let mut dropped = Vec::new();
        let mut low_confidence = Vec::new();

        for (id, result) in parsed {
            match result {
                Some((fragment_nodes, confidence)) => {
                    if confidence.is_low() {
                        log::warn!("fragment {id} was salvaged with the pattern scanner");
                        low_confidence.push(id);
                    }
                    if !nodes.is_empty() && self.options.page_breaks {
                        nodes.push(BodyNode::SectionBreak);
                    }
                    nodes.extend(fragment_nodes);
                }
                None => {
                    log::warn!("fragment {id} could not be parsed; dropping it");
                    dropped.push(id);
                }
            }
        }

        let nodes = cleanup(nodes);

        ComposeOutcome {
            document: ComposedDocument { nodes },
            dropped,
            low_confidence,
        }
    }
}

/// Parse one fragment into body nodes; `None` if nothing usable remains.
///
/// Tier one wraps the rootless sequence in a synthetic root and walks the
/// real node tree. Tier two runs the positional salvage scanner. Node
/// kinds other than paragraphs and tables are skipped.
fn fragment_nodes(content: &str) -> Option<(Vec<BodyNode>, Confidence)> {
    if content.trim().is_empty() {
        return None;
    }

    let wrapped = xml::wrap(content);
    if let Ok(doc) = Document::parse(&wrapped) {
        let mut nodes = Vec::new();
        for child in doc.root_element().children().filter(|n| n.is_element()) {
            let slice = &wrapped[child.range()];
            match child.tag_name().name() {
                "p" => nodes.push(BodyNode::Paragraph(slice.to_string())),
                "tbl" => nodes.push(BodyNode::Table(normalize_table_alignment(slice))),
                other => log::debug!("skipping unsupported body node <{other}>"),
            }
        }
        if nodes.is_empty() {
            return None;
        }
        return Some((nodes, Confidence::Parsed));
    }

    let chunks = salvage::body_chunks(content);
    if chunks.is_empty() {
        return None;
    }
    let nodes = chunks
        .into_iter()
        .map(|chunk| match chunk {
            salvage::Chunk::Paragraph(text) => BodyNode::Paragraph(text),
            salvage::Chunk::Table(text) => BodyNode::Table(normalize_table_alignment(&text)),
        })
        .collect();
    Some((nodes, Confidence::Salvaged))
}

/// Give every table in the element (nested tables included) an explicit
/// alignment, defaulting missing ones to `center`; existing `w:jc` values
/// are left untouched. Everything else is carried verbatim.
fn normalize_table_alignment(table_xml: &str) -> String {
    let wrapped = xml::wrap(table_xml);
    let Ok(doc) = Document::parse(&wrapped) else {
        // Salvaged chunks may not re-parse; carry them unchanged.
        return table_xml.to_string();
    };

    // (offset, delete_len, insert) edits against the wrapped text.
    let mut edits: Vec<(usize, usize, String)> = Vec::new();

    for tbl in doc
        .root_element()
        .descendants()
        .filter(|n| xml::is_elem(*n, "tbl"))
    {
        match tbl.children().find(|n| xml::is_elem(*n, "tblPr")) {
            Some(pr) => {
                if pr.children().any(|n| xml::is_elem(n, "jc")) {
                    continue;
                }
                let slice = &wrapped[pr.range()];
                if slice.ends_with("/>") {
                    // Self-closing tblPr: reopen it around the alignment.
                    let close = format!("{JC_CENTER}</{}>", raw_tag(slice));
                    edits.push((pr.range().end - 2, 2, format!(">{close}")));
                } else {
                    edits.push((jc_insertion_offset(pr, &wrapped), 0, JC_CENTER.to_string()));
                }
            }
            None => {
                let range = tbl.range();
                let slice = &wrapped[range.clone()];
                if let Some(first) = tbl.first_child() {
                    edits.push((first.range().start, 0, TBLPR_CENTER.to_string()));
                } else if slice.ends_with("/>") {
                    let close = format!("{TBLPR_CENTER}</{}>", raw_tag(slice));
                    edits.push((range.end - 2, 2, format!(">{close}")));
                } else if let Some(pos) = slice.rfind("</") {
                    edits.push((range.start + pos, 0, TBLPR_CENTER.to_string()));
                }
            }
        }
    }

    if edits.is_empty() {
        return table_xml.to_string();
    }

    // Apply back to front so earlier offsets stay valid.
    edits.sort_by(|a, b| b.0.cmp(&a.0));
    let mut edited = wrapped;
    for (at, delete, insert) in edits {
        edited.replace_range(at..at + delete, &insert);
    }

    let start = xml::wrapper_prefix_len();
    let end = edited.len() - "</root>".len();
    edited[start..end].to_string()
}

/// The prefixed tag name of an element's serialized form (`w:tblPr`).
fn raw_tag(slice: &str) -> &str {
    let inner = slice.trim_start_matches('<');
    let end = inner
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(inner.len());
    &inner[..end]
}

/// Where a synthesized `w:jc` belongs inside an existing `w:tblPr`.
fn jc_insertion_offset(pr: Node, wrapped: &str) -> usize {
    for child in pr.children().filter(|n| n.is_element()) {
        if AFTER_JC.contains(&child.tag_name().name()) {
            return child.range().start;
        }
    }
    let slice = &wrapped[pr.range()];
    match slice.rfind("</") {
        Some(pos) => pr.range().start + pos,
        None => pr.range().end,
    }
}

/// Remove concatenation residue: after every section break, drop the
/// contiguous run of empty paragraphs and redundant breaks, stopping at
/// the first node with real content. A separator never survives at the
/// tail of the sequence.
fn cleanup(nodes: Vec<BodyNode>) -> Vec<BodyNode> {
    let mut out: Vec<BodyNode> = Vec::with_capacity(nodes.len());
    let mut purging = false;

    for node in nodes {
        match &node {
            BodyNode::SectionBreak => {
                if purging {
                    continue;
                }
                purging = true;
                out.push(node);
            }
            BodyNode::Paragraph(text) => {
                if purging && paragraph_is_purgeable(text) {
                    continue;
                }
                purging = false;
                out.push(node);
            }
            BodyNode::Table(_) => {
                purging = false;
                out.push(node);
            }
        }
    }

    while out.last().is_some_and(|n| n.is_section_break()) {
        out.pop();
    }
    out
}

/// Whether a paragraph is pure formatting residue.
///
/// Unparseable (salvaged) paragraphs are kept: deleting content we cannot
/// inspect would be worse than an extra blank line.
fn paragraph_is_purgeable(paragraph_xml: &str) -> bool {
    let wrapped = xml::wrap(paragraph_xml);
    let Ok(doc) = Document::parse(&wrapped) else {
        return false;
    };
    match doc
        .root_element()
        .children()
        .find(|n| n.is_element())
    {
        Some(node) => xml::paragraph_is_empty(node),
        None => true,
    }
}
