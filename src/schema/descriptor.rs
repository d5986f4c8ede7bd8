//! Static field descriptor tables.

use crate::schema::naming::to_snake_case;

/// Names owned by [`NodeMeta`](crate::schema::NodeMeta); never mapped as fields.
pub const RESERVED_FIELDS: [&str; 4] = ["id", "created_at", "updated_at", "deleted_at"];

/// Closed set of value kinds a mapped field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    /// Enumeration over a known set of variant names, first variant is the default.
    Enum(&'static [&'static str]),
    /// Sequence of another kind.
    List(&'static FieldKind),
}

impl FieldKind {
    pub fn is_list(&self) -> bool {
        matches!(self, FieldKind::List(_))
    }
}

/// Direction of a relationship relative to the entity that declares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Outgoing,
    Incoming,
    Both,
}

impl Direction {
    /// Left and right arrow fragments around a relationship pattern.
    pub fn arrows(self) -> (&'static str, &'static str) {
        match self {
            Direction::Outgoing => ("-", "->"),
            Direction::Incoming => ("<-", "-"),
            Direction::Both => ("-", "-"),
        }
    }
}

/// How a relationship field is materialized on the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    /// Full collection of related entities.
    #[default]
    Collection,
    /// Single related entity.
    Single,
    /// Number of related nodes only.
    Count,
}

/// Shape of a relationship-mapped field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipSpec {
    pub types: Vec<String>,
    pub target_label: Option<String>,
    /// Property of the target node compared by relationship filters.
    pub target_field: Option<String>,
    pub direction: Direction,
    pub cardinality: Cardinality,
}

/// Metadata for one mapped entity field.
///
/// Built with a small builder API:
///
/// ```
/// use graphmap::schema::{FieldDescriptor, FieldKind};
///
/// let title = FieldDescriptor::scalar("title", FieldKind::String).searchable();
/// let liked_by = FieldDescriptor::relationship("liked_by", &["LIKE"])
///     .target("User")
///     .incoming();
///
/// assert_eq!(title.stored_name, "title");
/// assert!(liked_by.is_relationship());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Identifier of the field on the entity.
    pub name: String,
    /// Property key the value is persisted under.
    pub stored_name: String,
    pub kind: FieldKind,
    pub nullable: bool,
    pub searchable: bool,
    pub relationship: Option<RelationshipSpec>,
}

impl FieldDescriptor {
    /// A property-mapped field, stored under the snake-cased field name.
    pub fn scalar(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            stored_name: to_snake_case(name),
            kind,
            nullable: false,
            searchable: false,
            relationship: None,
        }
    }

    /// A relationship-mapped field over one or more relationship types.
    ///
    /// Defaults to an outgoing collection of string identifiers.
    pub fn relationship(name: &str, types: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            stored_name: to_snake_case(name),
            kind: FieldKind::List(&FieldKind::String),
            nullable: false,
            searchable: false,
            relationship: Some(RelationshipSpec {
                types: types.iter().map(|t| t.to_string()).collect(),
                target_label: None,
                target_field: None,
                direction: Direction::Outgoing,
                cardinality: Cardinality::Collection,
            }),
        }
    }

    /// True when the identifier or stored name collides with a reserved
    /// lifecycle property.
    pub fn is_reserved(&self) -> bool {
        RESERVED_FIELDS.contains(&self.name.as_str())
            || RESERVED_FIELDS.contains(&self.stored_name.as_str())
    }

    pub fn stored_as(mut self, stored_name: &str) -> Self {
        self.stored_name = stored_name.to_string();
        self
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn target(mut self, label: &str) -> Self {
        if let Some(rel) = self.relationship.as_mut() {
            rel.target_label = Some(label.to_string());
        }
        self
    }

    pub fn target_field(mut self, field: &str) -> Self {
        if let Some(rel) = self.relationship.as_mut() {
            rel.target_field = Some(field.to_string());
        }
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        if let Some(rel) = self.relationship.as_mut() {
            rel.direction = direction;
        }
        self
    }

    pub fn incoming(self) -> Self {
        self.direction(Direction::Incoming)
    }

    pub fn outgoing(self) -> Self {
        self.direction(Direction::Outgoing)
    }

    pub fn both(self) -> Self {
        self.direction(Direction::Both)
    }

    fn cardinality(mut self, cardinality: Cardinality) -> Self {
        if let Some(rel) = self.relationship.as_mut() {
            rel.cardinality = cardinality;
        }
        self
    }

    pub fn collection(self) -> Self {
        self.cardinality(Cardinality::Collection)
    }

    pub fn single(self) -> Self {
        self.cardinality(Cardinality::Single)
    }

    /// Materializes the relationship as a count; the field holds an integer.
    pub fn count_only(mut self) -> Self {
        self.kind = FieldKind::Integer;
        self.cardinality(Cardinality::Count)
    }

    pub fn is_relationship(&self) -> bool {
        self.relationship.is_some()
    }

    pub fn is_count_only(&self) -> bool {
        self.relationship
            .as_ref()
            .is_some_and(|rel| rel.cardinality == Cardinality::Count)
    }

    /// Column alias used for aggregated relationship data.
    pub fn collection_alias(&self) -> String {
        format!("{}_collection", self.name.to_lowercase())
    }
}

/// Per-type metadata: label plus scalar and relationship descriptors.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    label: String,
    scalars: Vec<FieldDescriptor>,
    relationships: Vec<FieldDescriptor>,
}

impl EntitySchema {
    /// Splits a declared field table into scalar and relationship fields.
    ///
    /// Descriptors whose identifier or stored name is one of
    /// [`RESERVED_FIELDS`] are dropped, so no declared field can shadow the
    /// identifier or a lifecycle timestamp. Declaration order is preserved
    /// within each group.
    pub fn new(label: &str, fields: Vec<FieldDescriptor>) -> Self {
        let (relationships, scalars): (Vec<_>, Vec<_>) = fields
            .into_iter()
            .filter(|f| !f.is_reserved())
            .partition(|f| f.is_relationship());

        Self {
            label: label.to_string(),
            scalars,
            relationships,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn scalars(&self) -> &[FieldDescriptor] {
        &self.scalars
    }

    pub fn relationships(&self) -> &[FieldDescriptor] {
        &self.relationships
    }

    pub fn has_relationships(&self) -> bool {
        !self.relationships.is_empty()
    }

    /// Looks up a scalar or relationship field by its identifier.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.scalars
            .iter()
            .chain(self.relationships.iter())
            .find(|f| f.name == name)
    }

    /// Stored names of the scalar fields marked searchable.
    ///
    /// Falls back to every string-kind scalar when none is marked.
    pub fn searchable_fields(&self) -> Vec<String> {
        let marked: Vec<String> = self
            .scalars
            .iter()
            .filter(|f| f.searchable)
            .map(|f| f.stored_name.clone())
            .collect();
        if !marked.is_empty() {
            return marked;
        }
        self.scalars
            .iter()
            .filter(|f| f.kind == FieldKind::String)
            .map(|f| f.stored_name.clone())
            .collect()
    }
}
