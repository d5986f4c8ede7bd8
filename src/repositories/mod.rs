//! Data access layer for graph-mapped entities.
//!
//! [`GraphRepository`] is the single generic repository: it resolves the
//! entity's schema, asks the synthesizer for a statement, runs it on the
//! executor and converts the rows back into entities.

mod base;

pub use base::GraphRepository;
