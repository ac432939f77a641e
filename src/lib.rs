//! # docweave
//!
//! Recompose stored DOCX table fragments into standalone documents.
//!
//! A fragment is a reusable unit of document content (one table plus its
//! surrounding context paragraphs), addressed by id and held in an
//! external store. This library is the recomposition engine: given an
//! ordered id selection it resolves the style definitions each fragment
//! depends on, merges them without duplication, splices the contents with
//! page separators, cleans up concatenation artifacts, and rebuilds a
//! valid, openable package around the result.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docweave::{export_package, FragmentRecord, MemoryStore, Template};
//!
//! fn main() -> docweave::Result<()> {
//!     let mut store = MemoryStore::new();
//!     store.insert(FragmentRecord::new("t-001", "<w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl>"));
//!
//!     let template = Template::minimal();
//!     let ids = vec!["t-001".to_string()];
//!     let outcome = export_package(&store, &template, &ids)?;
//!     std::fs::write(&outcome.suggested_name, &outcome.bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Degrading, never failing**: missing ids and unparsable fragments
//!   are reported per id and excluded; only a fully empty result or a
//!   container error is fatal
//! - **Two-tier parsing**: synthetic-root parse first, clearly flagged
//!   pattern salvage second
//! - **Deterministic output**: identical ordered input yields
//!   byte-identical body and catalog
//! - **Harvesting**: split a source document into storable fragments with
//!   context windows and caption detection

pub mod compose;
pub mod error;
pub mod export;
pub mod harvest;
pub mod merge;
pub mod model;
pub mod package;
pub mod resolve;
pub mod store;
pub mod xml;

// Re-export commonly used types
pub use compose::{ComposeOptions, ComposeOutcome, Composer};
pub use error::{Error, Result};
pub use export::{
    ExportOptions, ExportOutcome, Exporter, FragmentIssue, IssueKind, DEFAULT_EXPORT_NAME,
};
pub use harvest::{harvest_bytes, harvest_file, Harvest, HarvestOptions};
pub use merge::MergedStyles;
pub use model::{
    BodyNode, ComposedDocument, FragmentRecord, ResolvedStyle, StyleClosure, StyleDefinition,
    StyleSlot, SECTION_BREAK_XML,
};
pub use package::{PackageAssembler, Template};
pub use resolve::{StyleCatalog, StyleResolver};
pub use store::{FragmentStore, MemoryStore, StyleStore};
pub use xml::Confidence;

/// Export a package for an ordered id selection, without style data.
///
/// Every fragment falls back to the template's styles.
pub fn export_package(
    fragments: &dyn FragmentStore,
    template: &Template,
    ids: &[String],
) -> Result<ExportOutcome> {
    Exporter::new(fragments, template).export(ids)
}

/// Export a package with per-fragment style catalogs from a style store.
pub fn export_package_with_styles(
    fragments: &dyn FragmentStore,
    styles: &dyn StyleStore,
    template: &Template,
    ids: &[String],
) -> Result<ExportOutcome> {
    Exporter::new(fragments, template)
        .with_styles(styles)
        .export(ids)
}

/// Builder for configured exports.
///
/// # Example
///
/// ```no_run
/// use docweave::{Docweave, FragmentRecord, MemoryStore};
///
/// let mut store = MemoryStore::new();
/// store.insert(FragmentRecord::new("a", "<w:tbl/>"));
///
/// let outcome = Docweave::new()
///     .without_page_breaks()
///     .with_suggested_name("tables.docx")
///     .export(&store, &["a".to_string()])?;
/// # Ok::<(), docweave::Error>(())
/// ```
pub struct Docweave {
    options: ExportOptions,
    template: Option<Template>,
}

impl Docweave {
    /// Create a new builder with default options and the built-in
    /// minimal template.
    pub fn new() -> Self {
        Self {
            options: ExportOptions::default(),
            template: None,
        }
    }

    /// Use a custom blank template package.
    pub fn with_template(mut self, template: Template) -> Self {
        self.template = Some(template);
        self
    }

    /// Disable page separators between fragments.
    pub fn without_page_breaks(mut self) -> Self {
        self.options = self.options.with_page_breaks(false);
        self
    }

    /// Disable `based-on` ancestor inlining in merged catalogs.
    pub fn without_ancestors(mut self) -> Self {
        self.options = self.options.with_inline_ancestors(false);
        self
    }

    /// Disable parallel fragment parsing.
    pub fn sequential(mut self) -> Self {
        self.options = self.options.sequential();
        self
    }

    /// Set the suggested file name on the outcome.
    pub fn with_suggested_name(mut self, name: impl Into<String>) -> Self {
        self.options = self.options.with_suggested_name(name);
        self
    }

    /// Run an export against a fragment store.
    pub fn export(&self, fragments: &dyn FragmentStore, ids: &[String]) -> Result<ExportOutcome> {
        let template = self.template.clone().unwrap_or_else(Template::minimal);
        Exporter::new(fragments, &template)
            .with_options(self.options.clone())
            .export(ids)
    }

    /// Run an export with a style store attached.
    pub fn export_with_styles(
        &self,
        fragments: &dyn FragmentStore,
        styles: &dyn StyleStore,
        ids: &[String],
    ) -> Result<ExportOutcome> {
        let template = self.template.clone().unwrap_or_else(Template::minimal);
        Exporter::new(fragments, &template)
            .with_styles(styles)
            .with_options(self.options.clone())
            .export(ids)
    }
}

impl Default for Docweave {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = Docweave::new();
        assert!(builder.options.page_breaks);
        assert!(builder.options.inline_ancestors);
        assert_eq!(builder.options.suggested_name, DEFAULT_EXPORT_NAME);
    }

    #[test]
    fn test_builder_chained() {
        let builder = Docweave::new()
            .without_page_breaks()
            .without_ancestors()
            .sequential()
            .with_suggested_name("out.docx");

        assert!(!builder.options.page_breaks);
        assert!(!builder.options.inline_ancestors);
        assert!(!builder.options.parallel);
        assert_eq!(builder.options.suggested_name, "out.docx");
    }

    #[test]
    fn test_export_package_end_to_end() {
        let mut store = MemoryStore::new();
        store.insert(FragmentRecord::new(
            "a",
            "<w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl>",
        ));

        let template = Template::minimal();
        let ids = vec!["a".to_string()];
        let outcome = export_package(&store, &template, &ids).unwrap();

        assert!(!outcome.bytes.is_empty());
        assert_eq!(outcome.fragment_count, 1);
        assert_eq!(outcome.suggested_name, DEFAULT_EXPORT_NAME);
    }

    #[test]
    fn test_export_empty_ids_fails() {
        let store = MemoryStore::new();
        let template = Template::minimal();
        assert!(export_package(&store, &template, &[]).is_err());
    }
}
