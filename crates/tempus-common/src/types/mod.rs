//! Value model for Tempus.
//!
//! This module contains the immutable value types a triple is built from:
//!
//! - [`Node`] - a typed identifier, written `/kind<id>`
//! - [`Predicate`] - an immutable (`"name"@[]`) or temporal
//!   (`"name"@[RFC3339]`) predicate
//! - [`Literal`] - a typed literal, written `"value"^^type:kind`
//! - [`Object`] - the sum of the three object positions
//! - [`Triple`] - the `(Subject, Predicate, Object)` tuple itself
//!
//! All types round-trip through their textual form: parsing a serialized
//! value and re-serializing it produces byte-identical text.

mod literal;
mod node;
mod predicate;
mod triple;

pub use literal::Literal;
pub use node::Node;
pub use predicate::{format_anchor, parse_anchor, Anchor, Predicate};
pub use triple::{Object, Triple};
