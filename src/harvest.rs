//! Splitting a source document into storable fragments.
//!
//! The inverse of export: each body-level table becomes one fragment,
//! carrying a window of surrounding context paragraphs and a detected
//! caption. Fragment content is sliced verbatim from the source part so
//! recomposition later reproduces the original markup exactly.

use std::io::Cursor;
use std::path::Path;

use regex::Regex;
use roxmltree::Document;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::model::{FragmentRecord, StyleClosure};
use crate::package::read_part;
use crate::resolve::{StyleCatalog, StyleResolver};
use crate::xml;

/// Options for harvesting fragments from a source document.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Context paragraphs captured before each table.
    pub context_before: usize,

    /// Context paragraphs captured after each table.
    pub context_after: usize,
}

impl HarvestOptions {
    /// Create options with defaults (3 before, 1 after).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both context window sizes.
    pub fn with_context(mut self, before: usize, after: usize) -> Self {
        self.context_before = before;
        self.context_after = after;
        self
    }
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            context_before: 3,
            context_after: 1,
        }
    }
}

/// The product of harvesting one source document.
#[derive(Debug, Clone)]
pub struct Harvest {
    /// One record per body-level table, document order.
    pub fragments: Vec<FragmentRecord>,

    /// Each fragment's style closure against the source catalog,
    /// parallel to `fragments`.
    pub closures: Vec<StyleClosure>,

    /// The source document's raw `word/styles.xml`, if present.
    pub styles_xml: Option<String>,
}

impl Harvest {
    /// Number of harvested fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether the source document contained no tables.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Harvest fragments from a DOCX file.
pub fn harvest_file<P: AsRef<Path>>(path: P, options: &HarvestOptions) -> Result<Harvest> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string());
    harvest_with_source(&data, source.as_deref(), options)
}

/// Harvest fragments from DOCX bytes.
pub fn harvest_bytes(data: &[u8], options: &HarvestOptions) -> Result<Harvest> {
    harvest_with_source(data, None, options)
}

fn harvest_with_source(
    data: &[u8],
    source: Option<&str>,
    options: &HarvestOptions,
) -> Result<Harvest> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| Error::Packaging(format!("not a readable package: {e}")))?;
    let document_xml = read_part(&mut archive, "word/document.xml")?
        .ok_or_else(|| Error::Packaging("missing word/document.xml part".to_string()))?;
    let styles_xml = read_part(&mut archive, "word/styles.xml")?;

    let doc = Document::parse(&document_xml)
        .map_err(|e| Error::Xml(format!("document part: {e}")))?;
    let body = xml::find_descendant(doc.root_element(), "body")
        .ok_or_else(|| Error::Xml("document part has no body".to_string()))?;

    let children: Vec<_> = body.children().filter(|n| n.is_element()).collect();

    let id_base = source
        .and_then(|s| Path::new(s).file_stem().map(|s| s.to_string_lossy().to_string()))
        .unwrap_or_else(|| "fragment".to_string());

    let mut fragments = Vec::new();
    for (index, child) in children.iter().enumerate() {
        if !xml::is_elem(*child, "tbl") {
            continue;
        }

        // Non-empty paragraphs before the table, nearest last.
        let before: Vec<_> = children[..index]
            .iter()
            .rev()
            .filter(|n| xml::is_elem(**n, "p") && !xml::paragraph_is_empty(**n))
            .take(options.context_before)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        // Non-empty paragraphs after the table, nearest first.
        let after: Vec<_> = children[index + 1..]
            .iter()
            .filter(|n| xml::is_elem(**n, "p") && !xml::paragraph_is_empty(**n))
            .take(options.context_after)
            .collect();

        let mut content = String::new();
        for node in &before {
            content.push_str(&document_xml[node.range()]);
        }
        content.push_str(&document_xml[child.range()]);
        for node in &after {
            content.push_str(&document_xml[node.range()]);
        }

        let before_texts: Vec<String> =
            before.iter().map(|n| xml::visible_text(**n)).collect();

        let number = fragments.len() + 1;
        let mut record =
            FragmentRecord::new(format!("{id_base}-t{number:03}"), content);
        if let Some(caption) = detect_caption(&before_texts) {
            record = record.with_caption(caption);
        }
        if let Some(source) = source {
            record = record.with_source(source);
        }
        fragments.push(record);
    }

    let catalog = match &styles_xml {
        Some(xml) => StyleCatalog::parse(xml).unwrap_or_else(|e| {
            log::warn!("source style catalog did not parse: {e}");
            StyleCatalog::empty()
        }),
        None => StyleCatalog::empty(),
    };
    let resolver = StyleResolver::new(&catalog);
    let closures = fragments
        .iter()
        .map(|f| resolver.resolve(&f.content))
        .collect();

    log::debug!("harvested {} fragment(s)", fragments.len());
    Ok(Harvest {
        fragments,
        closures,
        styles_xml,
    })
}

/// Find a table caption among the preceding context paragraphs.
///
/// Numbered caption forms win ("Table 3." and the CJK equivalents); then
/// any short line mentioning a table; then the first short line at all.
fn detect_caption(before_texts: &[String]) -> Option<String> {
    let patterns = [
        r"^表\s*\d+[.\s：:]",
        r"(?i)^Table\s*\d+[.\s:]",
        r"^表\s*[一二三四五六七八九十]+[.\s：:]",
        r"^表格\s*\d+[.\s：:]",
    ];

    let texts: Vec<&str> = before_texts
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();

    for text in &texts {
        for pattern in &patterns {
            if Regex::new(pattern).unwrap().is_match(text) {
                return Some(text.to_string());
            }
        }
        if text.chars().count() < 100 && (text.contains('表') || text.contains("Table")) {
            return Some(text.to_string());
        }
    }

    texts
        .first()
        .filter(|t| t.chars().count() < 100)
        .map(|t| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn docx_with_body(body: &str) -> Vec<u8> {
        let document = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"{}\"><w:body>{body}</w:body></w:document>",
            xml::WORDML_NS
        );
        let styles = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:styles xmlns:w=\"{}\">\
             <w:style w:type=\"table\" w:styleId=\"Grid\"><w:name w:val=\"Grid\"/></w:style>\
             </w:styles>",
            xml::WORDML_NS
        );

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in [
            ("word/document.xml", document.as_str()),
            ("word/styles.xml", styles.as_str()),
        ] {
            writer
                .start_file(name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn para(text: &str) -> String {
        format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>")
    }

    #[test]
    fn test_harvest_one_fragment_per_table() {
        let body = format!(
            "{}{}<w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl>{}\
             <w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl>",
            para("intro"),
            para("Table 1. Revenue"),
            para("notes"),
        );
        let data = docx_with_body(&body);

        let harvest = harvest_bytes(&data, &HarvestOptions::new()).unwrap();
        assert_eq!(harvest.len(), 2);
        assert_eq!(harvest.fragments[0].id, "fragment-t001");
        assert_eq!(harvest.fragments[1].id, "fragment-t002");
    }

    #[test]
    fn test_fragment_content_is_verbatim_window() {
        let body = format!(
            "{}{}<w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl>{}",
            para("one"),
            para("two"),
            para("after"),
        );
        let data = docx_with_body(&body);

        let harvest = harvest_bytes(&data, &HarvestOptions::new()).unwrap();
        let content = &harvest.fragments[0].content;
        assert!(content.starts_with(&para("one")));
        assert!(content.contains("<w:tbl>"));
        assert!(content.ends_with(&para("after")));
    }

    #[test]
    fn test_context_window_is_bounded() {
        let body = format!(
            "{}{}{}{}{}<w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl>",
            para("p1"),
            para("p2"),
            para("p3"),
            para("p4"),
            para("p5"),
        );
        let data = docx_with_body(&body);

        let harvest =
            harvest_bytes(&data, &HarvestOptions::new().with_context(2, 0)).unwrap();
        let content = &harvest.fragments[0].content;
        assert!(!content.contains("p3"));
        assert!(content.contains("p4"));
        assert!(content.contains("p5"));
    }

    #[test]
    fn test_empty_context_paragraphs_are_skipped() {
        let body = format!(
            "{}<w:p/><w:p/><w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl>",
            para("real context"),
        );
        let data = docx_with_body(&body);

        let harvest =
            harvest_bytes(&data, &HarvestOptions::new().with_context(1, 0)).unwrap();
        assert!(harvest.fragments[0].content.contains("real context"));
    }

    #[test]
    fn test_caption_detection() {
        assert_eq!(
            detect_caption(&["intro".to_string(), "Table 3: Results".to_string()]),
            Some("Table 3: Results".to_string())
        );
        assert_eq!(
            detect_caption(&["表 2：收入".to_string()]),
            Some("表 2：收入".to_string())
        );
        // Short-line fallback.
        assert_eq!(
            detect_caption(&["Quarterly summary".to_string()]),
            Some("Quarterly summary".to_string())
        );
        assert_eq!(detect_caption(&[]), None);
    }

    #[test]
    fn test_closures_resolved_against_source_catalog() {
        let body = format!(
            "{}<w:tbl><w:tblPr><w:tblStyle w:val=\"Grid\"/></w:tblPr>\
             <w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl>",
            para("ctx"),
        );
        let data = docx_with_body(&body);

        let harvest = harvest_bytes(&data, &HarvestOptions::new()).unwrap();
        assert_eq!(harvest.closures.len(), 1);
        assert_eq!(
            harvest.closures[0].table.as_ref().unwrap().definition.id,
            "Grid"
        );
    }

    #[test]
    fn test_document_without_tables_is_empty_harvest() {
        let data = docx_with_body(&para("just text"));
        let harvest = harvest_bytes(&data, &HarvestOptions::new()).unwrap();
        assert!(harvest.is_empty());
    }

    #[test]
    fn test_garbage_bytes_are_a_packaging_error() {
        let err = harvest_bytes(b"nope", &HarvestOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Packaging(_)));
    }
}
