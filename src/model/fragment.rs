//! Fragment record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored, reusable unit of document content: context paragraphs around
/// one table, addressed by id.
///
/// Records are immutable once created and owned by the external fragment
/// store; this crate only ever reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentRecord {
    /// Store-wide identifier.
    pub id: String,

    /// Raw content: a rootless WordprocessingML node sequence, zero or
    /// more `w:p` elements around exactly one `w:tbl`.
    pub content: String,

    /// Creation timestamp.
    pub created: DateTime<Utc>,

    /// Detected table caption, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    /// Name of the document the fragment was harvested from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl FragmentRecord {
    /// Create a record with the current timestamp.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            created: Utc::now(),
            caption: None,
            source: None,
        }
    }

    /// Set the caption and return self.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Set the source document name and return self.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Whether the stored content is blank.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = FragmentRecord::new("t-001", "<w:tbl/>")
            .with_caption("Table 1. Results")
            .with_source("report.docx");

        assert_eq!(record.id, "t-001");
        assert_eq!(record.caption.as_deref(), Some("Table 1. Results"));
        assert_eq!(record.source.as_deref(), Some("report.docx"));
        assert!(!record.is_empty());
    }

    #[test]
    fn test_record_roundtrips_through_json() {
        let record = FragmentRecord::new("t-002", "<w:p/><w:tbl/>");
        let json = serde_json::to_string(&record).unwrap();
        let back: FragmentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, record.id);
        assert_eq!(back.content, record.content);
        assert_eq!(back.caption, None);
    }

    #[test]
    fn test_is_empty() {
        assert!(FragmentRecord::new("x", "   ").is_empty());
    }
}
