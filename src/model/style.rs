//! Style definition and closure types.

use serde::{Deserialize, Serialize};

use crate::xml::Confidence;

/// The four slot kinds a fragment can reference a style from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleSlot {
    /// Paragraph style (`w:pStyle`).
    Paragraph,
    /// Table style (`w:tblStyle`).
    Table,
    /// Run/character style (`w:rStyle`).
    Run,
    /// Table-cell style (`w:tcStyle`).
    Cell,
}

impl StyleSlot {
    /// All slots, scan order.
    pub const ALL: [StyleSlot; 4] = [
        StyleSlot::Paragraph,
        StyleSlot::Table,
        StyleSlot::Run,
        StyleSlot::Cell,
    ];

    /// The marker element this slot is referenced by inside content.
    pub fn marker(self) -> &'static str {
        match self {
            StyleSlot::Paragraph => "pStyle",
            StyleSlot::Table => "tblStyle",
            StyleSlot::Run => "rStyle",
            StyleSlot::Cell => "tcStyle",
        }
    }

    /// The `w:type` value the catalog declares for this slot.
    ///
    /// Cell styles are table styles in the catalog; the distinction only
    /// exists on the content side.
    pub fn catalog_type(self) -> &'static str {
        match self {
            StyleSlot::Paragraph => "paragraph",
            StyleSlot::Table | StyleSlot::Cell => "table",
            StyleSlot::Run => "character",
        }
    }
}

/// One style definition from a document's style catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleDefinition {
    /// The `w:styleId` value.
    pub id: String,

    /// The catalog `w:type` value, if declared.
    pub style_type: Option<String>,

    /// The human-readable `w:name`, if declared.
    pub name: Option<String>,

    /// The `w:basedOn` parent id, if declared.
    pub based_on: Option<String>,

    /// The raw `<w:style>` element, verbatim from the source catalog.
    pub xml: String,
}

impl StyleDefinition {
    /// Whether this definition matches the slot's expected catalog type.
    ///
    /// Definitions without a declared type are accepted for any slot.
    pub fn matches_slot(&self, slot: StyleSlot) -> bool {
        match &self.style_type {
            Some(t) => t == slot.catalog_type(),
            None => true,
        }
    }
}

/// A style definition resolved for one slot, with its inlined ancestry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStyle {
    /// The directly referenced definition.
    pub definition: StyleDefinition,

    /// The `based-on` chain, nearest ancestor first. Empty when ancestor
    /// inlining is disabled or the definition has no parent.
    pub ancestors: Vec<StyleDefinition>,
}

impl ResolvedStyle {
    /// The definition plus its ancestors, self first.
    pub fn chain(&self) -> impl Iterator<Item = &StyleDefinition> {
        std::iter::once(&self.definition).chain(self.ancestors.iter())
    }
}

/// The subset of a style catalog one fragment actually depends on: up to
/// one resolved definition per slot.
///
/// Computed on demand per export request; never persisted.
#[derive(Debug, Clone)]
pub struct StyleClosure {
    /// Paragraph slot.
    pub paragraph: Option<ResolvedStyle>,

    /// Table slot.
    pub table: Option<ResolvedStyle>,

    /// Run slot.
    pub run: Option<ResolvedStyle>,

    /// Cell slot.
    pub cell: Option<ResolvedStyle>,

    /// Style ids the content referenced but the catalog did not define.
    pub missing: Vec<String>,

    /// How the references were extracted from the content.
    pub confidence: Confidence,
}

impl StyleClosure {
    /// An all-empty closure; the resolver's failure value.
    pub fn empty() -> Self {
        Self {
            paragraph: None,
            table: None,
            run: None,
            cell: None,
            missing: Vec::new(),
            confidence: Confidence::Parsed,
        }
    }

    /// Access a slot by kind.
    pub fn slot(&self, slot: StyleSlot) -> Option<&ResolvedStyle> {
        match slot {
            StyleSlot::Paragraph => self.paragraph.as_ref(),
            StyleSlot::Table => self.table.as_ref(),
            StyleSlot::Run => self.run.as_ref(),
            StyleSlot::Cell => self.cell.as_ref(),
        }
    }

    /// Resolved styles in slot scan order.
    pub fn resolved(&self) -> impl Iterator<Item = &ResolvedStyle> {
        StyleSlot::ALL.iter().filter_map(|s| self.slot(*s))
    }

    /// Whether no slot resolved.
    pub fn is_empty(&self) -> bool {
        self.resolved().next().is_none()
    }
}

impl Default for StyleClosure {
    fn default() -> Self {
        Self::empty()
    }
}
