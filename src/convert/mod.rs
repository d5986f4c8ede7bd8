//! Bidirectional conversion between graph nodes and typed entities.
//!
//! Scalars are coerced through a closed table keyed by [`FieldKind`]: a
//! failure on one field leaves that field at its default and never aborts
//! the rest of the conversion. Relationship data is never written as node
//! properties.
//!
//! [`FieldKind`]: crate::schema::FieldKind

mod converter;
mod value;

pub use converter::{related_node, related_nodes, DefaultNodeConverter, NodeConverter};
pub use value::{coerce, coerce_kind, parse_datetime, FieldValue};
