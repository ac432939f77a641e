//! Error types for the docweave library.

use std::io;
use thiserror::Error;

/// Result type alias for docweave operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while recomposing fragments into a package.
///
/// Per-fragment problems (a missing id, unparsable stored content, an
/// unresolvable style reference) are deliberately *not* represented here:
/// they are absorbed into [`crate::export::FragmentIssue`] and logged, so a
/// single bad fragment never fails a whole export. Only total emptiness or
/// a container-level failure surfaces as an `Error`.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The request itself is unusable (e.g. an empty id list).
    #[error("Invalid request: {0}")]
    InvalidInput(String),

    /// Every requested fragment failed to produce content.
    ///
    /// Reported as a client error: the offending ids are carried so the
    /// caller can say precisely which ids were requested.
    #[error("No content collected for any of the requested fragments: {}", requested.join(", "))]
    NoContentCollected {
        /// The ids that were requested, in request order.
        requested: Vec<String>,
    },

    /// The blank template package is missing or malformed.
    #[error("Invalid template package: {0}")]
    Template(String),

    /// Container-level failure while reading or rebuilding the package.
    #[error("Packaging error: {0}")]
    Packaging(String),

    /// ZIP archive error from the underlying container library.
    #[error("Container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An XML part that must be well-formed failed to parse or serialize.
    #[error("XML error: {0}")]
    Xml(String),

    /// The external fragment or style store reported a failure.
    ///
    /// Absence of an id is *not* a store error; stores signal absence with
    /// `None` per position.
    #[error("Store error: {0}")]
    Store(String),
}

impl From<roxmltree::Error> for Error {
    fn from(err: roxmltree::Error) -> Self {
        Error::Xml(err.to_string())
    }
}
