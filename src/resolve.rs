//! Style resolution: find the style ids a fragment references and look
//! their definitions up in the source document's catalog.

use std::collections::{HashMap, HashSet};

use roxmltree::Document;

use crate::error::{Error, Result};
use crate::model::{ResolvedStyle, StyleClosure, StyleDefinition, StyleSlot};
use crate::xml::{self, salvage, Confidence};

/// A document's full style catalog, keyed by style id.
///
/// Parsed once per source document from its `word/styles.xml`; the raw
/// `<w:style>` element text is kept verbatim so merged catalogs reuse the
/// original serialization byte for byte.
#[derive(Debug, Clone, Default)]
pub struct StyleCatalog {
    styles: HashMap<String, StyleDefinition>,
}

impl StyleCatalog {
    /// An empty catalog. Every lookup resolves to "no style".
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a full `word/styles.xml` part.
    pub fn parse(styles_xml: &str) -> Result<Self> {
        let doc = Document::parse(styles_xml)
            .map_err(|e| Error::Xml(format!("style catalog: {e}")))?;

        let mut styles = HashMap::new();
        for style in doc
            .root_element()
            .children()
            .filter(|n| xml::is_elem(*n, "style"))
        {
            let Some(id) = xml::attr(style, "styleId") else {
                continue;
            };
            if id.is_empty() {
                continue;
            }

            let name = style
                .children()
                .find(|n| xml::is_elem(*n, "name"))
                .and_then(|n| xml::attr(n, "val"))
                .map(str::to_string);
            let based_on = style
                .children()
                .find(|n| xml::is_elem(*n, "basedOn"))
                .and_then(|n| xml::attr(n, "val"))
                .filter(|v| !v.is_empty())
                .map(str::to_string);

            styles.insert(
                id.to_string(),
                StyleDefinition {
                    id: id.to_string(),
                    style_type: xml::attr(style, "type").map(str::to_string),
                    name,
                    based_on,
                    xml: styles_xml[style.range()].to_string(),
                },
            );
        }

        Ok(Self { styles })
    }

    /// Look up a definition by id alone.
    pub fn get(&self, id: &str) -> Option<&StyleDefinition> {
        self.styles.get(id)
    }

    /// Look up a definition for a specific slot; a declared `w:type` that
    /// conflicts with the slot resolves to "no style".
    pub fn get_for_slot(&self, id: &str, slot: StyleSlot) -> Option<&StyleDefinition> {
        self.styles.get(id).filter(|def| {
            let ok = def.matches_slot(slot);
            if !ok {
                log::debug!(
                    "style {id} has type {:?}, expected {} for slot {:?}",
                    def.style_type,
                    slot.catalog_type(),
                    slot
                );
            }
            ok
        })
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Whether the catalog holds no definitions.
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

/// Resolves one fragment's style closure against a catalog.
///
/// Never fails: malformed content degrades through the salvage scanner,
/// and any deeper problem yields an all-empty closure.
pub struct StyleResolver<'a> {
    catalog: &'a StyleCatalog,
    inline_ancestors: bool,
}

impl<'a> StyleResolver<'a> {
    /// Create a resolver over a catalog, inlining ancestor chains.
    pub fn new(catalog: &'a StyleCatalog) -> Self {
        Self {
            catalog,
            inline_ancestors: true,
        }
    }

    /// Enable or disable `based-on` ancestor inlining.
    pub fn with_ancestors(mut self, inline: bool) -> Self {
        self.inline_ancestors = inline;
        self
    }

    /// Resolve the closure for one fragment's raw content.
    pub fn resolve(&self, content: &str) -> StyleClosure {
        if content.trim().is_empty() {
            return StyleClosure::empty();
        }

        let (references, confidence) = scan_references(content);

        let mut closure = StyleClosure::empty();
        closure.confidence = confidence;

        for (slot, id) in references {
            match self.catalog.get_for_slot(&id, slot) {
                Some(definition) => {
                    let ancestors = if self.inline_ancestors {
                        self.ancestor_chain(definition)
                    } else {
                        Vec::new()
                    };
                    let resolved = ResolvedStyle {
                        definition: definition.clone(),
                        ancestors,
                    };
                    match slot {
                        StyleSlot::Paragraph => closure.paragraph = Some(resolved),
                        StyleSlot::Table => closure.table = Some(resolved),
                        StyleSlot::Run => closure.run = Some(resolved),
                        StyleSlot::Cell => closure.cell = Some(resolved),
                    }
                }
                None => {
                    log::warn!("style {id} referenced for slot {:?} is not in the catalog", slot);
                    closure.missing.push(id);
                }
            }
        }

        closure
    }

    /// Walk the `based-on` chain, nearest ancestor first.
    ///
    /// The visited set breaks inheritance cycles (A based-on B based-on A)
    /// by terminating the walk instead of recursing.
    fn ancestor_chain(&self, definition: &StyleDefinition) -> Vec<StyleDefinition> {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(definition.id.clone());

        let mut chain = Vec::new();
        let mut next = definition.based_on.clone();
        while let Some(id) = next {
            if !visited.insert(id.clone()) {
                log::debug!("style inheritance cycle detected at {id}");
                break;
            }
            match self.catalog.get(&id) {
                Some(parent) => {
                    next = parent.based_on.clone();
                    chain.push(parent.clone());
                }
                None => {
                    log::debug!("style ancestor {id} is not in the catalog");
                    break;
                }
            }
        }
        chain
    }
}

/// Find up to one style reference per slot.
///
/// Tier one parses the wrapped fragment and scans structurally; tier two
/// falls back to the positional salvage scanner and flags the result.
fn scan_references(content: &str) -> (Vec<(StyleSlot, String)>, Confidence) {
    let wrapped = xml::wrap(content);
    if let Ok(doc) = Document::parse(&wrapped) {
        let root = doc.root_element();
        let mut found = Vec::new();
        for slot in StyleSlot::ALL {
            if let Some(marker) = xml::find_descendant(root, slot.marker()) {
                if let Some(id) = xml::attr(marker, "val").filter(|v| !v.is_empty()) {
                    found.push((slot, id.to_string()));
                }
            }
        }
        return (found, Confidence::Parsed);
    }

    log::debug!("fragment content did not parse; using salvage scanner for style ids");
    let mut found = Vec::new();
    for slot in StyleSlot::ALL {
        if let Some(id) = salvage::style_id(content, slot.marker()) {
            found.push((slot, id));
        }
    }
    (found, Confidence::Salvaged)
}
