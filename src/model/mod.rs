//! Data model for fragment recomposition.
//!
//! These types bridge the external fragment/style stores and the
//! composition pipeline: what a store hands back ([`FragmentRecord`]),
//! what the resolver computes ([`StyleClosure`]), and what the composer
//! produces ([`ComposedDocument`]).

mod fragment;
mod node;
mod style;

pub use fragment::FragmentRecord;
pub use node::{BodyNode, ComposedDocument, SECTION_BREAK_XML};
pub use style::{ResolvedStyle, StyleClosure, StyleDefinition, StyleSlot};
