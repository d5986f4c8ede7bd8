//! Schema descriptors for graph-mapped entities.
//!
//! Each entity type registers a static descriptor table through
//! [`GraphEntity::fields`]. The table is turned into an [`EntitySchema`] once
//! per type and cached in the [`SchemaRegistry`] for the process lifetime.

mod descriptor;
mod naming;
mod registry;

pub use descriptor::{
    Cardinality, Direction, EntitySchema, FieldDescriptor, FieldKind, RelationshipSpec,
    RESERVED_FIELDS,
};
pub use naming::to_snake_case;
pub use registry::SchemaRegistry;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::convert::FieldValue;

/// Identity and lifecycle timestamps shared by every entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeMeta {
    /// Store-assigned node identifier; `None` until persisted.
    pub id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A record type persisted as a labeled graph node.
///
/// Implementors supply a descriptor table and name-keyed field accessors;
/// conversion and query synthesis are driven entirely by the table.
///
/// ```ignore
/// impl GraphEntity for Post {
///     const LABEL: &'static str = "Post";
///
///     fn fields() -> Vec<FieldDescriptor> {
///         vec![
///             FieldDescriptor::scalar("title", FieldKind::String).searchable(),
///             FieldDescriptor::relationship("liked_by", &["LIKE"]).target("User").incoming(),
///         ]
///     }
///     // meta, meta_mut, read_field, write_field ...
/// }
/// ```
pub trait GraphEntity: Default + Send + Sync + 'static {
    /// Node label for this type.
    const LABEL: &'static str;

    /// Declared field table. Called once per process by the registry.
    fn fields() -> Vec<FieldDescriptor>;

    fn meta(&self) -> &NodeMeta;

    fn meta_mut(&mut self) -> &mut NodeMeta;

    /// Reads the field with the given identifier.
    fn read_field(&self, name: &str) -> Option<FieldValue>;

    /// Assigns the field with the given identifier.
    ///
    /// Returns false when the name is unknown or the value has the wrong shape.
    fn write_field(&mut self, name: &str, value: FieldValue) -> bool;

    /// Cached schema for this type.
    fn schema() -> Arc<EntitySchema> {
        SchemaRegistry::global().schema_of::<Self>()
    }

    fn id(&self) -> Option<&str> {
        self.meta().id.as_deref()
    }
}
