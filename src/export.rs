//! Request-scoped export orchestration.
//!
//! One export is one pass through the four engine stages: fetch the
//! requested fragments, resolve each one's style closure, compose the
//! body, merge the catalogs, and rebuild the container. Nothing is shared
//! across concurrent exports except read-only collaborator references.

use std::fmt;

use crate::compose::{ComposeOptions, Composer};
use crate::error::{Error, Result};
use crate::merge::MergedStyles;
use crate::model::FragmentRecord;
use crate::package::{PackageAssembler, Template};
use crate::resolve::{StyleCatalog, StyleResolver};
use crate::store::{FragmentStore, StyleStore};

/// Default suggested file name for an exported package.
pub const DEFAULT_EXPORT_NAME: &str = "exported-fragments.docx";

/// Options for one export request.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Insert a new-page separator between consecutive fragments.
    pub page_breaks: bool,

    /// Inline each resolved style's `based-on` ancestor chain so the
    /// merged catalog is self-contained for any fragment subset.
    pub inline_ancestors: bool,

    /// Parse fragments in parallel during composition.
    pub parallel: bool,

    /// Suggested file name handed back with the package bytes.
    pub suggested_name: String,
}

impl ExportOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable page separators.
    pub fn with_page_breaks(mut self, enabled: bool) -> Self {
        self.page_breaks = enabled;
        self
    }

    /// Enable or disable ancestor inlining.
    pub fn with_inline_ancestors(mut self, inline: bool) -> Self {
        self.inline_ancestors = inline;
        self
    }

    /// Disable parallel composition.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set the suggested file name.
    pub fn with_suggested_name(mut self, name: impl Into<String>) -> Self {
        self.suggested_name = name.into();
        self
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            page_breaks: true,
            inline_ancestors: true,
            parallel: true,
            suggested_name: DEFAULT_EXPORT_NAME.to_string(),
        }
    }
}

/// Why a fragment degraded during an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// The id was absent from the fragment store.
    NotFound,
    /// The stored content yielded no usable nodes.
    Unparsable,
    /// Content was extracted by the low-confidence salvage scanner.
    Salvaged,
    /// A referenced style id was missing from the catalog.
    StyleUnresolvable {
        /// The unresolvable style id.
        style_id: String,
    },
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::NotFound => write!(f, "not found"),
            IssueKind::Unparsable => write!(f, "content unparsable"),
            IssueKind::Salvaged => write!(f, "content salvaged at low confidence"),
            IssueKind::StyleUnresolvable { style_id } => {
                write!(f, "style {style_id} unresolvable")
            }
        }
    }
}

/// A non-fatal, per-fragment degradation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentIssue {
    /// The offending fragment id.
    pub id: String,
    /// What degraded.
    pub kind: IssueKind,
}

impl fmt::Display for FragmentIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.kind)
    }
}

/// The product of a successful export.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    /// The final package bytes.
    pub bytes: Vec<u8>,

    /// Suggested file name for the download.
    pub suggested_name: String,

    /// How many requested fragments made it into the package.
    pub fragment_count: usize,

    /// How many page separators the body contains.
    pub section_breaks: usize,

    /// Unique style definitions in the merged catalog.
    pub style_count: usize,

    /// Per-fragment degradations, in discovery order.
    pub issues: Vec<FragmentIssue>,
}

/// The recomposition engine, wired to its collaborators.
///
/// Stateless across requests: the exporter only borrows read-only
/// references, so one instance may serve concurrent exports.
pub struct Exporter<'a> {
    fragments: &'a dyn FragmentStore,
    styles: Option<&'a dyn StyleStore>,
    template: &'a Template,
    options: ExportOptions,
}

impl<'a> Exporter<'a> {
    /// Create an exporter over a fragment store and template.
    pub fn new(fragments: &'a dyn FragmentStore, template: &'a Template) -> Self {
        Self {
            fragments,
            styles: None,
            template,
            options: ExportOptions::default(),
        }
    }

    /// Attach a style store.
    pub fn with_styles(mut self, styles: &'a dyn StyleStore) -> Self {
        self.styles = Some(styles);
        self
    }

    /// Replace the options.
    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    /// Run one export for an ordered id list.
    ///
    /// Duplicated ids are legitimate and appear duplicated in the output.
    /// Per-fragment failures degrade; only an empty result or a packaging
    /// failure is fatal.
    pub fn export(&self, ids: &[String]) -> Result<ExportOutcome> {
        if ids.is_empty() {
            return Err(Error::InvalidInput("empty fragment id list".to_string()));
        }
        log::debug!("export requested for {} fragment id(s)", ids.len());

        let mut issues = Vec::new();

        let fetched = self.fragments.fetch(ids)?;
        let mut records: Vec<FragmentRecord> = Vec::with_capacity(fetched.len());
        for (id, record) in ids.iter().zip(fetched) {
            match record {
                Some(record) => records.push(record),
                None => {
                    log::warn!("fragment {id} not found in store");
                    issues.push(FragmentIssue {
                        id: id.clone(),
                        kind: IssueKind::NotFound,
                    });
                }
            }
        }

        if records.is_empty() {
            return Err(Error::NoContentCollected {
                requested: ids.to_vec(),
            });
        }

        let closures: Vec<_> = records
            .iter()
            .map(|record| {
                let catalog = match self.styles {
                    Some(store) => store.catalog_for(&record.id)?.unwrap_or_default(),
                    None => StyleCatalog::empty(),
                };
                let closure = StyleResolver::new(&catalog)
                    .with_ancestors(self.options.inline_ancestors)
                    .resolve(&record.content);
                for style_id in &closure.missing {
                    issues.push(FragmentIssue {
                        id: record.id.clone(),
                        kind: IssueKind::StyleUnresolvable {
                            style_id: style_id.clone(),
                        },
                    });
                }
                Ok(closure)
            })
            .collect::<Result<_>>()?;

        let compose_options = ComposeOptions {
            page_breaks: self.options.page_breaks,
            parallel: self.options.parallel,
        };
        let composed = Composer::with_options(compose_options).compose(&records);
        for id in &composed.dropped {
            issues.push(FragmentIssue {
                id: id.clone(),
                kind: IssueKind::Unparsable,
            });
        }
        for id in &composed.low_confidence {
            issues.push(FragmentIssue {
                id: id.clone(),
                kind: IssueKind::Salvaged,
            });
        }

        if composed.document.is_empty() {
            return Err(Error::NoContentCollected {
                requested: ids.to_vec(),
            });
        }

        let merged = MergedStyles::from_closures(&closures);
        let styles_xml = merged.to_xml();
        let bytes = PackageAssembler::new(self.template)
            .assemble(&composed.document.to_xml(), Some(&styles_xml))?;

        let fragment_count = records.len() - composed.dropped.len();
        log::debug!(
            "export assembled: {fragment_count} fragment(s), {} separator(s), {} style(s)",
            composed.document.section_break_count(),
            merged.len()
        );

        Ok(ExportOutcome {
            bytes,
            suggested_name: self.options.suggested_name.clone(),
            fragment_count,
            section_breaks: composed.document.section_break_count(),
            style_count: merged.len(),
            issues,
        })
    }
}
