//! Harvest-then-export roundtrip: fragments cut out of a source document
//! recompose into a package carrying the same markup and styles.

use std::io::{Cursor, Read, Write};

use docweave::{
    harvest_bytes, export_package_with_styles, HarvestOptions, MemoryStore, StyleCatalog,
    Template,
};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

fn source_docx() -> Vec<u8> {
    let body = "\
        <w:p><w:r><w:t>Revenue by quarter</w:t></w:r></w:p>\
        <w:p><w:r><w:t>Table 1. Revenue</w:t></w:r></w:p>\
        <w:tbl><w:tblPr><w:tblStyle w:val=\"FancyGrid\"/></w:tblPr>\
        <w:tr><w:tc><w:p><w:r><w:t xml:space=\"preserve\"> Q1 </w:t></w:r></w:p></w:tc></w:tr></w:tbl>\
        <w:p><w:r><w:t>Figures are unaudited.</w:t></w:r></w:p>\
        <w:p><w:r><w:t>Table 2. Headcount</w:t></w:r></w:p>\
        <w:tbl><w:tr><w:tc><w:p><w:r><w:t>HC</w:t></w:r></w:p></w:tc></w:tr></w:tbl>";
    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"{WORDML_NS}\"><w:body>{body}</w:body></w:document>"
    );
    let styles = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:styles xmlns:w=\"{WORDML_NS}\">\
         <w:style w:type=\"table\" w:styleId=\"FancyGrid\"><w:name w:val=\"Fancy Grid\"/>\
         <w:basedOn w:val=\"PlainGrid\"/></w:style>\
         <w:style w:type=\"table\" w:styleId=\"PlainGrid\"><w:name w:val=\"Plain Grid\"/></w:style>\
         </w:styles>"
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in [
        ("word/document.xml", document.as_str()),
        ("word/styles.xml", styles.as_str()),
    ] {
        writer.start_file(name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn read_zip_part(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut text = String::new();
    entry.read_to_string(&mut text).unwrap();
    text
}

#[test]
fn test_harvest_then_export_roundtrip() {
    let harvest = harvest_bytes(&source_docx(), &HarvestOptions::new()).unwrap();
    assert_eq!(harvest.len(), 2);

    // First fragment: numbered caption wins over the nearer plain line.
    assert_eq!(
        harvest.fragments[0].caption.as_deref(),
        Some("Table 1. Revenue")
    );
    // Its closure resolved the table style with the inlined ancestor.
    let table_style = harvest.closures[0].table.as_ref().unwrap();
    assert_eq!(table_style.definition.id, "FancyGrid");
    assert_eq!(table_style.ancestors.len(), 1);
    assert_eq!(table_style.ancestors[0].id, "PlainGrid");

    // Stock the store the way a harvesting caller would.
    let catalog = StyleCatalog::parse(harvest.styles_xml.as_deref().unwrap()).unwrap();
    let mut store = MemoryStore::new();
    let ids: Vec<String> = harvest.fragments.iter().map(|f| f.id.clone()).collect();
    for record in harvest.fragments {
        store.insert_with_catalog(record, catalog.clone());
    }

    let template = Template::minimal();
    let outcome = export_package_with_styles(&store, &store, &template, &ids).unwrap();
    assert_eq!(outcome.fragment_count, 2);
    assert_eq!(outcome.section_breaks, 1);
    assert!(outcome.issues.is_empty());

    let document = read_zip_part(&outcome.bytes, "word/document.xml");
    roxmltree::Document::parse(&document).unwrap();
    // Context, whitespace markers, and both tables survived verbatim.
    assert!(document.contains("Table 1. Revenue"));
    assert!(document.contains("xml:space=\"preserve\""));
    assert!(document.contains("Figures are unaudited."));
    assert_eq!(document.matches("<w:tbl>").count(), 2);

    // The merged catalog holds the referenced style, its ancestor, and
    // no duplicates.
    let styles = read_zip_part(&outcome.bytes, "word/styles.xml");
    assert_eq!(styles.matches("w:styleId=\"FancyGrid\"").count(), 1);
    assert_eq!(styles.matches("w:styleId=\"PlainGrid\"").count(), 1);
}

#[test]
fn test_roundtrip_table_alignment_is_normalized() {
    let harvest = harvest_bytes(&source_docx(), &HarvestOptions::new()).unwrap();
    let mut store = MemoryStore::new();
    let ids: Vec<String> = harvest.fragments.iter().map(|f| f.id.clone()).collect();
    for record in harvest.fragments {
        store.insert(record);
    }

    let template = Template::minimal();
    let outcome = docweave::export_package(&store, &template, &ids).unwrap();
    let document = read_zip_part(&outcome.bytes, "word/document.xml");

    // Both tables end up with explicit centering (neither had w:jc).
    assert_eq!(document.matches("<w:jc w:val=\"center\"/>").count(), 2);
}
