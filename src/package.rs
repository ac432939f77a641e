//! Rebuilding the OPC container around composed content.
//!
//! The assembler copies every part of a blank template package verbatim
//! except the two parts this engine controls: the body content part
//! (`word/document.xml`) and the style catalog part (`word/styles.xml`).

use std::collections::BTreeSet;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use regex::Regex;
use roxmltree::Document;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{Error, Result};
use crate::xml::NAMESPACES;

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>";

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";

/// A blank document package used as the structural skeleton for every
/// export: section/page setup, content types, and relationships come from
/// here. Supplied once at process start and treated as read-only.
#[derive(Debug, Clone)]
pub struct Template {
    bytes: Vec<u8>,
}

impl Template {
    /// Load a template from raw package bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::validate(&bytes)?;
        Ok(Self { bytes })
    }

    /// Load a template from a file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_bytes(std::fs::read(path)?)
    }

    /// The built-in minimal blank package: one empty A4 section, a Normal
    /// paragraph style, nothing else.
    pub fn minimal() -> Self {
        let bytes = build_minimal_package().expect("in-memory template build cannot fail");
        Self { bytes }
    }

    /// The raw package bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn validate(bytes: &[u8]) -> Result<()> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::Template(format!("not a readable package: {e}")))?;
        if archive.by_name(DOCUMENT_PART).is_err() {
            return Err(Error::Template(format!("missing {DOCUMENT_PART} part")));
        }
        Ok(())
    }
}

/// Read a named part as UTF-8 text; `None` when the part does not exist.
pub(crate) fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>> {
    match archive.by_name(name) {
        Ok(mut entry) => {
            let mut text = String::new();
            entry.read_to_string(&mut text)?;
            Ok(Some(text))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Rebuilds the template container around a composed body and a merged
/// style catalog.
pub struct PackageAssembler<'a> {
    template: &'a Template,
}

impl<'a> PackageAssembler<'a> {
    /// Create an assembler over a template.
    pub fn new(template: &'a Template) -> Self {
        Self { template }
    }

    /// Produce the final package bytes in memory.
    ///
    /// `styles_xml` replaces the template's style part wholesale; when it
    /// is absent or not well-formed the template's original styles are
    /// kept so the package stays openable.
    pub fn assemble(&self, body_xml: &str, styles_xml: Option<&str>) -> Result<Vec<u8>> {
        let mut archive = ZipArchive::new(Cursor::new(self.template.bytes()))?;

        let document_xml = read_part(&mut archive, DOCUMENT_PART)?
            .ok_or_else(|| Error::Template(format!("missing {DOCUMENT_PART} part")))?;
        let injected = inject_body(&document_xml, body_xml)?;
        let injected = ensure_namespace_declarations(injected, body_xml);

        let styles = match styles_xml {
            Some(xml) if Document::parse(xml).is_ok() => Some(xml),
            Some(_) => {
                log::warn!("merged style catalog is not well-formed; keeping template styles");
                None
            }
            None => None,
        };

        let template_has_styles = archive.by_name(STYLES_PART).is_ok();

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let options =
                SimpleFileOptions::default().compression_method(entry.compression());
            writer.start_file(name.as_str(), options)?;

            if name == DOCUMENT_PART {
                writer.write_all(injected.as_bytes())?;
            } else if name == STYLES_PART {
                match styles {
                    Some(xml) => writer.write_all(xml.as_bytes())?,
                    None => {
                        let mut original = Vec::new();
                        entry.read_to_end(&mut original)?;
                        writer.write_all(&original)?;
                    }
                }
            } else {
                let mut original = Vec::new();
                entry.read_to_end(&mut original)?;
                writer.write_all(&original)?;
            }
        }

        if let (false, Some(xml)) = (template_has_styles, styles) {
            writer.start_file(STYLES_PART, SimpleFileOptions::default())?;
            writer.write_all(xml.as_bytes())?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| Error::Packaging(format!("finishing container: {e}")))?;
        Ok(cursor.into_inner())
    }

    /// Assemble and write the package to `path`.
    ///
    /// The write goes through a scratch temp file in the destination
    /// directory, persisted atomically on success; the scratch file is
    /// removed on every failure path, so a partially written artifact is
    /// never exposed.
    pub fn assemble_to_file<P: AsRef<Path>>(
        &self,
        body_xml: &str,
        styles_xml: Option<&str>,
        path: P,
    ) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.assemble(body_xml, styles_xml)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut scratch = tempfile::NamedTempFile::new_in(dir)?;
        scratch.write_all(&bytes)?;
        scratch
            .persist(path)
            .map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

/// Replace the template body's children with the composed sequence,
/// preserving the trailing `w:sectPr` (page setup, header/footer links).
fn inject_body(document_xml: &str, body_xml: &str) -> Result<String> {
    let body_open = document_xml
        .find("<w:body")
        .ok_or_else(|| Error::Template("no <w:body> in document part".to_string()))?;
    let after_open = &document_xml[body_open..];
    let open_end_rel = after_open
        .find('>')
        .ok_or_else(|| Error::Template("unterminated <w:body> tag".to_string()))?;

    if after_open[..=open_end_rel].ends_with("/>") {
        // Self-closing body: reopen it around the content.
        let mut out =
            String::with_capacity(document_xml.len() + body_xml.len() + 16);
        out.push_str(&document_xml[..body_open + open_end_rel - 1]);
        out.push('>');
        out.push_str(body_xml);
        out.push_str("</w:body>");
        out.push_str(&document_xml[body_open + open_end_rel + 1..]);
        return Ok(out);
    }

    let body_open_end = body_open + open_end_rel + 1;
    let body_close = document_xml
        .rfind("</w:body>")
        .ok_or_else(|| Error::Template("no </w:body> in document part".to_string()))?;

    let interior = &document_xml[body_open_end..body_close];
    let keep_from = interior
        .rfind("<w:sectPr")
        .map(|pos| body_open_end + pos)
        .unwrap_or(body_close);

    let mut out = String::with_capacity(
        body_open_end + body_xml.len() + (document_xml.len() - keep_from),
    );
    out.push_str(&document_xml[..body_open_end]);
    out.push_str(body_xml);
    out.push_str(&document_xml[keep_from..]);
    Ok(out)
}

/// Add any known namespace prefixes the injected content uses but the
/// template's root element does not declare. An undeclared prefix would
/// silently corrupt the package.
fn ensure_namespace_declarations(document_xml: String, body_xml: &str) -> String {
    let Some(root_open) = document_xml.find("<w:document") else {
        return document_xml;
    };
    let Some(root_end_rel) = document_xml[root_open..].find('>') else {
        return document_xml;
    };
    let root_tag = &document_xml[root_open..root_open + root_end_rel];

    let element_re = Regex::new(r"</?([A-Za-z][A-Za-z0-9]*):").unwrap();
    let attribute_re = Regex::new(r"\s([A-Za-z][A-Za-z0-9]*):[A-Za-z0-9]+\s*=").unwrap();

    let mut used: BTreeSet<&str> = BTreeSet::new();
    for caps in element_re.captures_iter(body_xml) {
        used.insert(caps.get(1).map_or("", |m| m.as_str()));
    }
    for caps in attribute_re.captures_iter(body_xml) {
        used.insert(caps.get(1).map_or("", |m| m.as_str()));
    }

    let mut additions = String::new();
    for prefix in used {
        if prefix == "xml" || prefix == "xmlns" {
            continue;
        }
        let Some((_, uri)) = NAMESPACES.iter().find(|(p, _)| *p == prefix) else {
            continue;
        };
        if !root_tag.contains(&format!("xmlns:{prefix}=")) {
            additions.push_str(&format!(" xmlns:{prefix}=\"{uri}\""));
        }
    }

    if additions.is_empty() {
        return document_xml;
    }

    let mut out = document_xml;
    out.insert_str(root_open + root_end_rel, &additions);
    out
}

/// Build the built-in blank package.
fn build_minimal_package() -> std::result::Result<Vec<u8>, ZipError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (name, content) in [
        ("[Content_Types].xml", minimal_content_types()),
        ("_rels/.rels", minimal_package_rels()),
        ("word/_rels/document.xml.rels", minimal_document_rels()),
        (DOCUMENT_PART, minimal_document()),
        (STYLES_PART, minimal_styles()),
    ] {
        writer.start_file(name, options)?;
        writer.write_all(content.as_bytes())?;
    }

    Ok(writer.finish()?.into_inner())
}

fn minimal_content_types() -> String {
    format!(
        "{XML_DECL}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
         <Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
         <Override PartName=\"/word/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml\"/>\
         </Types>"
    )
}

fn minimal_package_rels() -> String {
    format!(
        "{XML_DECL}<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
         <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>\
         </Relationships>"
    )
}

fn minimal_document_rels() -> String {
    format!(
        "{XML_DECL}<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
         <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>\
         </Relationships>"
    )
}

fn minimal_document() -> String {
    let mut declarations = String::new();
    for (prefix, uri) in NAMESPACES {
        declarations.push_str(&format!(" xmlns:{prefix}=\"{uri}\""));
    }
    format!(
        "{XML_DECL}<w:document{declarations}><w:body>\
         <w:sectPr>\
         <w:pgSz w:w=\"11906\" w:h=\"16838\"/>\
         <w:pgMar w:top=\"1440\" w:right=\"1440\" w:bottom=\"1440\" w:left=\"1440\" w:header=\"708\" w:footer=\"708\" w:gutter=\"0\"/>\
         </w:sectPr>\
         </w:body></w:document>"
    )
}

fn minimal_styles() -> String {
    format!(
        "{XML_DECL}<w:styles xmlns:w=\"{}\">\
         <w:style w:type=\"paragraph\" w:default=\"1\" w:styleId=\"Normal\"><w:name w:val=\"Normal\"/></w:style>\
         </w:styles>",
        crate::xml::WORDML_NS
    )
}
