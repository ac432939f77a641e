//! Merging many fragments' style closures into one deduplicated catalog.

use std::collections::HashSet;

use crate::model::{StyleClosure, StyleDefinition};
use crate::xml::WORDML_NS;

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>";

/// The style synthesized when no fragment contributed any definition, so
/// the output catalog is never empty.
const DEFAULT_STYLE_XML: &str = "<w:style w:type=\"paragraph\" w:default=\"1\" w:styleId=\"Normal\"><w:name w:val=\"Normal\"/></w:style>";

/// A per-request set of style definitions, unique by id.
///
/// Insertion order is preserved and first occurrence wins, so the merged
/// catalog keeps the visual intent of whichever fragment is positioned
/// first in the request. Built fresh per export and discarded after use.
#[derive(Debug, Clone, Default)]
pub struct MergedStyles {
    definitions: Vec<StyleDefinition>,
    seen: HashSet<String>,
}

impl MergedStyles {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an ordered list of closures, one per requested fragment.
    pub fn from_closures<'a, I>(closures: I) -> Self
    where
        I: IntoIterator<Item = &'a StyleClosure>,
    {
        let mut merged = Self::new();
        for closure in closures {
            for resolved in closure.resolved() {
                for definition in resolved.chain() {
                    merged.insert(definition);
                }
            }
        }
        merged
    }

    /// Insert a definition unless its id is already present.
    ///
    /// Returns whether the definition was added.
    pub fn insert(&mut self, definition: &StyleDefinition) -> bool {
        if self.seen.contains(&definition.id) {
            return false;
        }
        self.seen.insert(definition.id.clone());
        self.definitions.push(definition.clone());
        true
    }

    /// Number of unique definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether no definition has been collected.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Whether an id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Definitions in insertion order.
    pub fn definitions(&self) -> &[StyleDefinition] {
        &self.definitions
    }

    /// Serialize to a complete `word/styles.xml` part.
    ///
    /// Single root, single namespace declaration, definitions in insertion
    /// order; an empty set serializes the synthesized document-default
    /// paragraph style instead. Identical ordered input always produces
    /// byte-identical output.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(
            XML_DECL.len() + 128 + self.definitions.iter().map(|d| d.xml.len()).sum::<usize>(),
        );
        out.push_str(XML_DECL);
        out.push_str("<w:styles xmlns:w=\"");
        out.push_str(WORDML_NS);
        out.push_str("\">");
        if self.definitions.is_empty() {
            out.push_str(DEFAULT_STYLE_XML);
        } else {
            for definition in &self.definitions {
                out.push_str(&definition.xml);
            }
        }
        out.push_str("</w:styles>");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResolvedStyle, StyleClosure};

    fn def(id: &str) -> StyleDefinition {
        StyleDefinition {
            id: id.to_string(),
            style_type: Some("paragraph".to_string()),
            name: Some(id.to_string()),
            based_on: None,
            xml: format!("<w:style w:type=\"paragraph\" w:styleId=\"{id}\"><w:name w:val=\"{id}\"/></w:style>"),
        }
    }

    fn closure_with_paragraph(definition: StyleDefinition, ancestors: Vec<StyleDefinition>) -> StyleClosure {
        let mut closure = StyleClosure::empty();
        closure.paragraph = Some(ResolvedStyle {
            definition,
            ancestors,
        });
        closure
    }

    #[test]
    fn test_first_occurrence_wins() {
        let mut first = def("Body");
        first.xml = "<w:style w:styleId=\"Body\"><w:name w:val=\"First\"/></w:style>".to_string();
        let mut second = def("Body");
        second.xml = "<w:style w:styleId=\"Body\"><w:name w:val=\"Second\"/></w:style>".to_string();

        let closures = vec![
            closure_with_paragraph(first, Vec::new()),
            closure_with_paragraph(second, Vec::new()),
        ];
        let merged = MergedStyles::from_closures(&closures);

        assert_eq!(merged.len(), 1);
        assert!(merged.to_xml().contains("First"));
        assert!(!merged.to_xml().contains("Second"));
    }

    #[test]
    fn test_ancestors_are_merged_and_deduplicated() {
        let closures = vec![
            closure_with_paragraph(def("Body"), vec![def("Normal")]),
            closure_with_paragraph(def("Quote"), vec![def("Normal")]),
        ];
        let merged = MergedStyles::from_closures(&closures);

        assert_eq!(merged.len(), 3);
        assert!(merged.contains("Body"));
        assert!(merged.contains("Quote"));
        assert!(merged.contains("Normal"));
    }

    #[test]
    fn test_empty_set_synthesizes_default() {
        let merged = MergedStyles::from_closures(&[StyleClosure::empty()]);
        assert!(merged.is_empty());

        let xml = merged.to_xml();
        assert!(xml.contains("w:default=\"1\""));
        assert!(xml.contains("w:styleId=\"Normal\""));
        roxmltree::Document::parse(&xml).unwrap();
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let closures = vec![
            closure_with_paragraph(def("B"), vec![def("A")]),
            closure_with_paragraph(def("C"), Vec::new()),
        ];
        let a = MergedStyles::from_closures(&closures).to_xml();
        let b = MergedStyles::from_closures(&closures).to_xml();
        assert_eq!(a, b);

        // Insertion order follows request order, not id order.
        let b_pos = a.find("w:styleId=\"B\"").unwrap();
        let a_pos = a.find("w:styleId=\"A\"").unwrap();
        let c_pos = a.find("w:styleId=\"C\"").unwrap();
        assert!(b_pos < a_pos && a_pos < c_pos);
    }

    #[test]
    fn test_output_is_well_formed() {
        let closures = vec![closure_with_paragraph(def("Body"), vec![def("Normal")])];
        let xml = MergedStyles::from_closures(&closures).to_xml();
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let styles: Vec<_> = doc
            .root_element()
            .children()
            .filter(|n| n.is_element())
            .collect();
        assert_eq!(styles.len(), 2);
    }
}
