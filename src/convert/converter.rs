//! Node/entity conversion.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use crate::convert::value::{coerce, parse_datetime_value, FieldValue};
use crate::error::AppError;
use crate::graph::{Node, Row};
use crate::schema::{EntitySchema, FieldDescriptor, GraphEntity};

/// Converts between graph nodes and entities of type `T`.
///
/// This is the extension point for entity-specific hydration: a custom
/// converter typically wraps [`DefaultNodeConverter`] and additionally decodes
/// nested related-entity collections from `<field>_collection` columns.
pub trait NodeConverter<T: GraphEntity>: Send + Sync {
    /// Builds an entity from a node's identifier and property bag.
    fn convert_from_node(&self, node: &Node) -> T;

    /// Builds an entity from the node column `alias` of a result row.
    fn convert_from_record(&self, row: &Row, alias: &str) -> Result<T, AppError>;

    /// Property map persisted for an entity. Never contains relationship fields.
    fn convert_to_properties(&self, entity: &T) -> Map<String, JsonValue>;
}

/// Schema-driven converter for scalar fields and relationship counts.
pub struct DefaultNodeConverter<T> {
    schema: Arc<EntitySchema>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: GraphEntity> DefaultNodeConverter<T> {
    pub fn new() -> Self {
        Self::with_schema(T::schema())
    }

    pub fn with_schema(schema: Arc<EntitySchema>) -> Self {
        Self {
            schema,
            _entity: PhantomData,
        }
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }
}

impl<T: GraphEntity> Default for DefaultNodeConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: GraphEntity> Clone for DefaultNodeConverter<T> {
    fn clone(&self) -> Self {
        Self::with_schema(Arc::clone(&self.schema))
    }
}

impl<T: GraphEntity> NodeConverter<T> for DefaultNodeConverter<T> {
    fn convert_from_node(&self, node: &Node) -> T {
        let mut entity = T::default();

        let meta = entity.meta_mut();
        meta.id = Some(node.id.clone());
        meta.created_at = parse_datetime_value(node.property("created_at"));
        meta.updated_at = parse_datetime_value(node.property("updated_at"));
        meta.deleted_at = parse_datetime_value(node.property("deleted_at"));

        for field in self.schema.scalars() {
            let Some(raw) = node.property(&field.stored_name) else {
                continue;
            };
            match coerce(field, raw) {
                Ok(value) => {
                    if !entity.write_field(&field.name, value) {
                        tracing::trace!(
                            label = self.schema.label(),
                            field = %field.name,
                            "Entity rejected coerced value"
                        );
                    }
                }
                Err(e) => {
                    tracing::trace!(
                        label = self.schema.label(),
                        node_id = %node.id,
                        error = %e,
                        "Skipping field that failed to convert"
                    );
                }
            }
        }

        entity
    }

    fn convert_from_record(&self, row: &Row, alias: &str) -> Result<T, AppError> {
        let node: Node = row.get(alias)?;
        let mut entity = self.convert_from_node(&node);

        for field in self.schema.relationships().iter().filter(|f| f.is_count_only()) {
            if let Some(count) = row.get_raw(&field.collection_alias()).and_then(count_value) {
                entity.write_field(&field.name, FieldValue::Integer(saturate_i32(count)));
            }
        }

        Ok(entity)
    }

    fn convert_to_properties(&self, entity: &T) -> Map<String, JsonValue> {
        let mut properties = Map::new();
        for field in self.schema.scalars() {
            let Some(value) = entity.read_field(&field.name) else {
                continue;
            };
            if is_omitted(field, &value) {
                continue;
            }
            properties.insert(field.stored_name.clone(), value.to_json());
        }
        properties
    }
}

/// Nullable fields omit only null/blank values; others also omit defaults.
fn is_omitted(field: &FieldDescriptor, value: &FieldValue) -> bool {
    if field.nullable {
        value.is_blank()
    } else {
        value.is_default(field.kind)
    }
}

fn count_value(raw: &JsonValue) -> Option<i64> {
    raw.as_i64()
        .or_else(|| raw.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
        .or_else(|| raw.as_f64().map(|f| f as i64))
}

/// Clamps a relationship count into the `i32` range, negatives to zero.
fn saturate_i32(count: i64) -> i64 {
    count.clamp(0, i64::from(i32::MAX))
}

/// Decodes a collected node list column; absent or malformed yields empty.
pub fn related_nodes(row: &Row, column: &str) -> Vec<Node> {
    match row.get_opt::<Vec<Node>>(column) {
        Ok(nodes) => nodes.unwrap_or_default(),
        Err(e) => {
            tracing::trace!(column, error = %e, "Ignoring undecodable related nodes");
            Vec::new()
        }
    }
}

/// Decodes a single optional node column.
pub fn related_node(row: &Row, column: &str) -> Option<Node> {
    row.get_opt::<Node>(column).ok().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, NodeMeta};
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;
    use std::collections::HashMap;

    const STATUS: &[&str] = &["Draft", "Published"];

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Article {
        meta: NodeMeta,
        title: String,
        views: i64,
        rating: f64,
        featured: bool,
        status: String,
        tags: Vec<String>,
        published_at: Option<DateTime<Utc>>,
        likes: i32,
        authors: Vec<String>,
    }

    impl GraphEntity for Article {
        const LABEL: &'static str = "Article";

        fn fields() -> Vec<FieldDescriptor> {
            vec![
                FieldDescriptor::scalar("title", FieldKind::String).searchable(),
                FieldDescriptor::scalar("views", FieldKind::Integer),
                FieldDescriptor::scalar("rating", FieldKind::Float),
                FieldDescriptor::scalar("featured", FieldKind::Boolean),
                FieldDescriptor::scalar("status", FieldKind::Enum(STATUS)),
                FieldDescriptor::scalar("tags", FieldKind::List(&FieldKind::String)),
                FieldDescriptor::scalar("publishedAt", FieldKind::DateTime).nullable(),
                FieldDescriptor::relationship("likes", &["LIKE"])
                    .target("User")
                    .incoming()
                    .count_only(),
                FieldDescriptor::relationship("authors", &["WROTE"])
                    .target("User")
                    .incoming(),
            ]
        }

        fn meta(&self) -> &NodeMeta {
            &self.meta
        }

        fn meta_mut(&mut self) -> &mut NodeMeta {
            &mut self.meta
        }

        fn read_field(&self, name: &str) -> Option<FieldValue> {
            Some(match name {
                "title" => self.title.clone().into(),
                "views" => self.views.into(),
                "rating" => self.rating.into(),
                "featured" => self.featured.into(),
                "status" => FieldValue::Enum(self.status.clone()),
                "tags" => self.tags.clone().into(),
                "publishedAt" => self.published_at.into(),
                "likes" => self.likes.into(),
                "authors" => self.authors.clone().into(),
                _ => return None,
            })
        }

        fn write_field(&mut self, name: &str, value: FieldValue) -> bool {
            match (name, value) {
                ("title", FieldValue::String(v)) => self.title = v,
                ("views", FieldValue::Integer(v)) => self.views = v,
                ("rating", FieldValue::Float(v)) => self.rating = v,
                ("featured", FieldValue::Boolean(v)) => self.featured = v,
                ("status", FieldValue::Enum(v)) => self.status = v,
                ("tags", FieldValue::List(items)) => {
                    self.tags = items
                        .iter()
                        .filter_map(|i| i.as_str().map(str::to_string))
                        .collect()
                }
                ("publishedAt", FieldValue::DateTime(v)) => self.published_at = Some(v),
                ("publishedAt", FieldValue::Null) => self.published_at = None,
                ("likes", FieldValue::Integer(v)) => self.likes = v as i32,
                _ => return false,
            }
            true
        }
    }

    fn converter() -> DefaultNodeConverter<Article> {
        DefaultNodeConverter::with_schema(Arc::new(EntitySchema::new(
            Article::LABEL,
            Article::fields(),
        )))
    }

    fn full_article() -> Article {
        Article {
            title: "Graphs".into(),
            views: 12,
            rating: 4.5,
            featured: true,
            status: "Published".into(),
            tags: vec!["rust".into(), "neo4j".into()],
            published_at: Some(Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()),
            likes: 3,
            authors: vec!["1".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_round_trip_preserves_non_default_scalars() {
        let conv = converter();
        let article = full_article();

        let props = conv.convert_to_properties(&article);
        let back = conv.convert_from_node(&Node::new("9", props));

        assert_eq!(back.meta.id.as_deref(), Some("9"));
        assert_eq!(back.title, article.title);
        assert_eq!(back.views, article.views);
        assert_eq!(back.rating, article.rating);
        assert!(back.featured);
        assert_eq!(back.status, "Published");
        assert_eq!(back.tags, article.tags);
        assert_eq!(back.published_at, article.published_at);
        // relationship data never travels through properties
        assert_eq!(back.likes, 0);
        assert!(back.authors.is_empty());
    }

    #[test]
    fn test_defaults_absent_from_properties() {
        let conv = converter();
        let article = Article {
            title: "   ".into(),
            status: "Draft".into(),
            ..Default::default()
        };

        let props = conv.convert_to_properties(&article);
        assert!(props.is_empty(), "unexpected properties: {:?}", props);

        let back = conv.convert_from_node(&Node::new("1", props));
        assert_eq!(back.title, "");
        assert_eq!(back.views, 0);
        assert_eq!(back.published_at, None);
    }

    #[test]
    fn test_relationship_fields_never_in_properties() {
        let conv = converter();
        let props = conv.convert_to_properties(&full_article());
        assert!(!props.contains_key("likes"));
        assert!(!props.contains_key("authors"));
        assert!(props.contains_key("published_at"));
    }

    #[test]
    fn test_coercion_failure_is_isolated() {
        let conv = converter();
        let props = json!({
            "title": "Still here",
            "views": "many",
            "rating": "4.25",
            "status": "PUBLISHED",
            "tags": ["a", 1, null],
            "created_at": "not a date",
            "updated_at": "2024-02-03T04:05:06Z"
        });
        let node = Node::new("5", props.as_object().unwrap().clone());

        let article = conv.convert_from_node(&node);
        assert_eq!(article.title, "Still here");
        assert_eq!(article.views, 0);
        assert_eq!(article.rating, 4.25);
        assert_eq!(article.status, "Published");
        assert_eq!(article.tags, vec!["a", "1"]);
        assert_eq!(article.meta.created_at, None);
        assert!(article.meta.updated_at.is_some());
    }

    #[test]
    fn test_convert_from_record_missing_column() {
        let conv = converter();
        let row = Row::new(HashMap::new());
        let result = conv.convert_from_record(&row, "n");
        assert!(matches!(result, Err(AppError::MissingColumn(c)) if c == "n"));
    }

    #[test]
    fn test_convert_from_record_counts() {
        let conv = converter();
        let mut data = HashMap::new();
        data.insert(
            "n".to_string(),
            json!({"id": "3", "labels": ["Article"], "properties": {"title": "T"}}),
        );
        data.insert("likes_collection".to_string(), json!(7));
        data.insert("authors_collection".to_string(), json!([]));

        let article = conv.convert_from_record(&Row::new(data), "n").unwrap();
        assert_eq!(article.meta.id.as_deref(), Some("3"));
        assert_eq!(article.likes, 7);
    }

    #[test]
    fn test_count_saturates_to_i32() {
        let conv = converter();
        let mut data = HashMap::new();
        data.insert("n".to_string(), json!({"id": "3", "properties": {}}));
        data.insert("likes_collection".to_string(), json!(5_000_000_000i64));

        let article = conv.convert_from_record(&Row::new(data), "n").unwrap();
        assert_eq!(article.likes, i32::MAX);
        assert_eq!(saturate_i32(-4), 0);
    }

    #[test]
    fn test_related_nodes_decoding() {
        let mut data = HashMap::new();
        data.insert(
            "authors_collection".to_string(),
            json!([{"id": "1", "properties": {"name": "Ada"}}]),
        );
        data.insert("editor".to_string(), JsonValue::Null);
        let row = Row::new(data);

        let nodes = related_nodes(&row, "authors_collection");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].get::<String>("name").unwrap(), "Ada");
        assert!(related_nodes(&row, "missing").is_empty());
        assert!(related_node(&row, "editor").is_none());
    }
}
