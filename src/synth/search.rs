//! Search and count statements.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::graph::Params;
use crate::schema::{Cardinality, EntitySchema, FieldDescriptor, FieldKind};
use crate::synth::{node_pattern, rel_pattern, type_alternation, validate_identifier, Statement};

/// Value of an entity-specific search filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Case-insensitive containment.
    Text(String),
    Enum(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    /// Membership; matched against the target node for relationship fields.
    TextList(Vec<String>),
}

/// A filter bound to the field it constrains.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: FieldDescriptor,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(field: FieldDescriptor, value: FilterValue) -> Self {
        Self { field, value }
    }

    fn param_name(&self) -> String {
        self.field.name.to_lowercase()
    }

    /// Default-valued filters contribute no condition.
    fn is_active(&self) -> bool {
        match &self.value {
            FilterValue::Text(s) => !s.trim().is_empty(),
            FilterValue::Enum(s) => {
                !s.trim().is_empty()
                    && !matches!(self.field.kind, FieldKind::Enum(variants)
                        if variants.first().is_some_and(|first| first.eq_ignore_ascii_case(s)))
            }
            FilterValue::Integer(i) => *i != 0,
            FilterValue::Float(f) => *f != 0.0,
            FilterValue::Boolean(b) => *b,
            FilterValue::DateTime(dt) => *dt != DateTime::<Utc>::UNIX_EPOCH,
            FilterValue::TextList(ids) => {
                !ids.is_empty() && !ids.iter().any(|id| id.trim().is_empty())
            }
        }
    }
}

/// Generic search request: free text, pagination, ordering and filters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchModel {
    pub text_search: Option<String>,
    /// 1-based page number.
    pub page: u32,
    /// 0 means unlimited.
    pub page_size: u32,
    pub include_deleted: bool,
    pub order_by_field: Option<String>,
    pub descending: bool,
    /// Stored names searched by `text_search`; empty uses the schema's fields.
    pub searchable_fields: Vec<String>,
    pub filters: Vec<Filter>,
}

impl Default for SearchModel {
    fn default() -> Self {
        Self {
            text_search: None,
            page: 1,
            page_size: 25,
            include_deleted: false,
            order_by_field: Some("created_at".to_string()),
            descending: true,
            searchable_fields: Vec::new(),
            filters: Vec::new(),
        }
    }
}

impl SearchModel {
    /// Rows skipped before the current page.
    pub fn skip(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_search = Some(text.into());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_include_deleted(mut self, include_deleted: bool) -> Self {
        self.include_deleted = include_deleted;
        self
    }

    pub fn with_order(mut self, field: impl Into<String>, descending: bool) -> Self {
        self.order_by_field = Some(field.into());
        self.descending = descending;
        self
    }

    pub fn without_order(mut self) -> Self {
        self.order_by_field = None;
        self
    }

    pub fn with_searchable_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchable_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_filter(mut self, field: FieldDescriptor, value: FilterValue) -> Self {
        self.filters.push(Filter::new(field, value));
        self
    }
}

/// One page of entities plus the total number of matches.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<T> {
    pub results: Vec<T>,
    /// Matches across all pages, counted by an independent statement.
    pub total_results: i64,
}

impl<T> SearchResult<T> {
    pub fn new(results: Vec<T>, total_results: i64) -> Self {
        Self {
            results,
            total_results,
        }
    }

    /// Number of entities on this page.
    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.results.iter()
    }
}

impl<T> Default for SearchResult<T> {
    fn default() -> Self {
        Self::new(Vec::new(), 0)
    }
}

impl<T> IntoIterator for SearchResult<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

/// Relationship-filter MATCH clauses, WHERE conditions and their parameters.
#[derive(Default)]
struct FilterClauses {
    matches: Vec<String>,
    conditions: Vec<String>,
    params: Params,
}

impl FilterClauses {
    fn build(schema: &EntitySchema, model: &SearchModel) -> Result<Self, AppError> {
        let mut clauses = Self::default();

        if !model.include_deleted {
            clauses.conditions.push("(n.deleted_at IS NULL)".to_string());
        }

        if let Some(text) = model
            .text_search
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            let fields = if model.searchable_fields.is_empty() {
                schema.searchable_fields()
            } else {
                model.searchable_fields.clone()
            };
            if !fields.is_empty() {
                let mut alternatives = Vec::with_capacity(fields.len());
                for field in &fields {
                    validate_identifier("searchable field", field)?;
                    alternatives.push(format!(
                        "toLower(toString(n.{})) CONTAINS $text_search",
                        field
                    ));
                }
                clauses
                    .conditions
                    .push(format!("({})", alternatives.join(" OR ")));
                clauses
                    .params
                    .insert("text_search".to_string(), text.to_lowercase().into());
            }
        }

        for filter in model.filters.iter().filter(|f| f.is_active()) {
            clauses.push_filter(filter)?;
        }

        Ok(clauses)
    }

    fn push_filter(&mut self, filter: &Filter) -> Result<(), AppError> {
        let param = filter.param_name();
        validate_identifier("filter parameter", &param)?;
        let stored = &filter.field.stored_name;

        let (condition, value) = match (&filter.value, &filter.field.relationship) {
            (FilterValue::TextList(ids), Some(rel)) => {
                let target_field = rel.target_field.as_deref().ok_or_else(|| {
                    AppError::InvalidArgument(format!(
                        "relationship filter '{}' has no target field",
                        filter.field.name
                    ))
                })?;
                validate_identifier("target field", target_field)?;

                let target_var = format!("target_{}", param);
                let target = node_pattern(&target_var, rel.target_label.as_deref())?;
                let types = type_alternation(&rel.types)?;
                self.matches.push(format!(
                    "MATCH {}",
                    rel_pattern("n", "", &types, rel.direction, &target)
                ));

                let lowered: Vec<JsonValue> =
                    ids.iter().map(|id| id.to_lowercase().into()).collect();
                (
                    format!("toLower({}.{}) IN ${}", target_var, target_field, param),
                    JsonValue::Array(lowered),
                )
            }
            (FilterValue::TextList(ids), None) => {
                validate_identifier("field", stored)?;
                (
                    format!("n.{} IN ${}", stored, param),
                    JsonValue::from(ids.clone()),
                )
            }
            (FilterValue::Text(text), _) => {
                validate_identifier("field", stored)?;
                (
                    format!("toLower(n.{}) CONTAINS ${}", stored, param),
                    text.to_lowercase().into(),
                )
            }
            (scalar, _) => {
                validate_identifier("field", stored)?;
                let value = match scalar {
                    FilterValue::Enum(v) => JsonValue::from(v.clone()),
                    FilterValue::Integer(i) => JsonValue::from(*i),
                    FilterValue::Float(f) => JsonValue::from(*f),
                    FilterValue::Boolean(b) => JsonValue::from(*b),
                    FilterValue::DateTime(dt) => JsonValue::from(dt.to_rfc3339()),
                    FilterValue::Text(_) | FilterValue::TextList(_) => JsonValue::Null,
                };
                (format!("n.{} = ${}", stored, param), value)
            }
        };

        self.conditions.push(condition);
        self.params.insert(param, value);
        Ok(())
    }

    /// `MATCH (n:Label)`, relationship-filter matches, then WHERE if any.
    fn head(&self, label: &str) -> Result<Vec<String>, AppError> {
        validate_identifier("label", label)?;
        let mut lines = vec![format!("MATCH (n:{})", label)];
        lines.extend(self.matches.iter().cloned());
        if !self.conditions.is_empty() {
            lines.push(format!("WHERE {}", self.conditions.join(" AND ")));
        }
        Ok(lines)
    }
}

/// OPTIONAL MATCH per relationship field, aggregated in a WITH, then RETURN.
///
/// Aggregation happens before ordering and pagination so pages are computed
/// over distinct source nodes.
fn relationship_projection(schema: &EntitySchema) -> Result<Vec<String>, AppError> {
    let mut lines = Vec::new();
    let mut with_items = vec!["n".to_string()];
    let mut columns = vec!["n".to_string()];

    for field in schema.relationships() {
        let Some(rel) = field.relationship.as_ref() else {
            continue;
        };
        let alias = field.name.to_lowercase();
        validate_identifier("relationship field", &alias)?;

        let var = format!("rel_{}", alias);
        let types = type_alternation(&rel.types)?;
        let target = node_pattern(&var, rel.target_label.as_deref())?;
        lines.push(format!(
            "OPTIONAL MATCH {}",
            rel_pattern("n", "", &types, rel.direction, &target)
        ));

        let (expr, column) = match rel.cardinality {
            Cardinality::Count => (format!("count(DISTINCT {})", var), field.collection_alias()),
            Cardinality::Collection => {
                (format!("collect(DISTINCT {})", var), field.collection_alias())
            }
            Cardinality::Single => (format!("head(collect(DISTINCT {}))", var), alias),
        };
        with_items.push(format!("{} AS {}", expr, column));
        columns.push(column);
    }

    lines.push(format!("WITH {}", with_items.join(", ")));
    lines.push(format!("RETURN DISTINCT {}", columns.join(", ")));
    Ok(lines)
}

fn assemble(
    schema: &EntitySchema,
    model: &SearchModel,
    skip: u64,
    limit: u64,
    expand_relationships: bool,
) -> Result<Statement, AppError> {
    let clauses = FilterClauses::build(schema, model)?;
    let mut lines = clauses.head(schema.label())?;

    if expand_relationships && schema.has_relationships() {
        lines.extend(relationship_projection(schema)?);
    } else {
        lines.push("RETURN DISTINCT n".to_string());
    }

    if let Some(order) = model
        .order_by_field
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
    {
        validate_identifier("order field", order)?;
        let direction = if model.descending { "DESC" } else { "ASC" };
        lines.push(format!("ORDER BY n.{} {}", order, direction));
    }
    if skip > 0 {
        lines.push(format!("SKIP {}", skip));
    }
    if limit > 0 {
        lines.push(format!("LIMIT {}", limit));
    }

    Ok(Statement {
        cypher: lines.join("\n"),
        params: clauses.params,
    })
}

/// Paginated search; expands relationship fields when the schema has any.
pub fn build_search(schema: &EntitySchema, model: &SearchModel) -> Result<Statement, AppError> {
    assemble(
        schema,
        model,
        model.skip(),
        u64::from(model.page_size),
        true,
    )
}

/// Total matches for the model's filters, ignoring ordering and pagination.
pub fn build_count(schema: &EntitySchema, model: &SearchModel) -> Result<Statement, AppError> {
    let clauses = FilterClauses::build(schema, model)?;
    let mut lines = clauses.head(schema.label())?;
    lines.push("RETURN count(DISTINCT n) AS total_count".to_string());

    Ok(Statement {
        cypher: lines.join("\n"),
        params: clauses.params,
    })
}

/// Free-text search over searchable fields, newest first, without expansion.
pub fn build_text_search(
    schema: &EntitySchema,
    term: &str,
    skip: Option<u64>,
    limit: Option<u64>,
) -> Result<Statement, AppError> {
    let model = SearchModel {
        page_size: 0,
        ..SearchModel::default()
    }
    .with_text(term);
    assemble(
        schema,
        &model,
        skip.unwrap_or(0),
        limit.unwrap_or(0),
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::extract_return_columns;
    use crate::schema::FieldKind;
    use serde_json::json;

    fn note_schema() -> EntitySchema {
        EntitySchema::new(
            "Note",
            vec![
                FieldDescriptor::scalar("title", FieldKind::String).searchable(),
                FieldDescriptor::scalar("body", FieldKind::String),
                FieldDescriptor::scalar("rank", FieldKind::Integer),
                FieldDescriptor::scalar("pinned", FieldKind::Boolean),
            ],
        )
    }

    fn post_schema() -> EntitySchema {
        EntitySchema::new(
            "Post",
            vec![
                FieldDescriptor::scalar("title", FieldKind::String).searchable(),
                FieldDescriptor::relationship("liked_by", &["LIKE"])
                    .target("User")
                    .incoming(),
                FieldDescriptor::relationship("disliked_by", &["DISLIKE"])
                    .target("User")
                    .incoming()
                    .count_only(),
                FieldDescriptor::relationship("author", &["WROTE", "EDITED"])
                    .target("User")
                    .incoming()
                    .single(),
            ],
        )
    }

    #[test]
    fn test_default_search_shape() {
        let stmt = build_search(&note_schema(), &SearchModel::default()).unwrap();
        assert_eq!(
            stmt.cypher,
            "MATCH (n:Note)\nWHERE (n.deleted_at IS NULL)\nRETURN DISTINCT n\nORDER BY n.created_at DESC\nLIMIT 25"
        );
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_no_limit_when_page_size_zero() {
        let model = SearchModel::default().with_page(3).with_page_size(0);
        let stmt = build_search(&note_schema(), &model).unwrap();
        assert!(!stmt.cypher.contains("LIMIT"));
        assert!(!stmt.cypher.contains("SKIP"));
    }

    #[test]
    fn test_exactly_one_limit_with_page_size() {
        let model = SearchModel::default().with_page(3).with_page_size(10);
        let stmt = build_search(&post_schema(), &model).unwrap();
        assert_eq!(stmt.cypher.matches("LIMIT").count(), 1);
        assert!(stmt.cypher.ends_with("SKIP 20\nLIMIT 10"));
    }

    #[test]
    fn test_no_empty_where() {
        let model = SearchModel::default()
            .with_include_deleted(true)
            .without_order()
            .with_page_size(0);
        let stmt = build_search(&note_schema(), &model).unwrap();
        assert_eq!(stmt.cypher, "MATCH (n:Note)\nRETURN DISTINCT n");
    }

    #[test]
    fn test_text_search_lowercases_term() {
        let model = SearchModel::default().with_text("  HeLLo ");
        let stmt = build_search(&note_schema(), &model).unwrap();
        assert!(stmt.cypher.contains(
            "WHERE (n.deleted_at IS NULL) AND (toLower(toString(n.title)) CONTAINS $text_search)"
        ));
        assert_eq!(stmt.params["text_search"], json!("hello"));
    }

    #[test]
    fn test_text_search_explicit_fields() {
        let model = SearchModel::default()
            .with_text("x")
            .with_searchable_fields(["title", "body"]);
        let stmt = build_search(&note_schema(), &model).unwrap();
        assert!(stmt.cypher.contains(
            "(toLower(toString(n.title)) CONTAINS $text_search OR toLower(toString(n.body)) CONTAINS $text_search)"
        ));
    }

    #[test]
    fn test_blank_text_search_ignored() {
        let model = SearchModel::default().with_text("   ");
        let stmt = build_search(&note_schema(), &model).unwrap();
        assert!(!stmt.cypher.contains("CONTAINS"));
        assert!(!stmt.params.contains_key("text_search"));
    }

    #[test]
    fn test_scalar_filters() {
        let schema = note_schema();
        let model = SearchModel::default()
            .with_filter(
                schema.field("body").unwrap().clone(),
                FilterValue::Text("Graph".into()),
            )
            .with_filter(schema.field("rank").unwrap().clone(), FilterValue::Integer(0))
            .with_filter(
                schema.field("pinned").unwrap().clone(),
                FilterValue::Boolean(true),
            );
        let stmt = build_search(&schema, &model).unwrap();

        assert!(stmt
            .cypher
            .contains("(n.deleted_at IS NULL) AND toLower(n.body) CONTAINS $body AND n.pinned = $pinned"));
        assert!(!stmt.cypher.contains("$rank"));
        assert_eq!(stmt.params["body"], json!("graph"));
        assert_eq!(stmt.params["pinned"], json!(true));
    }

    #[test]
    fn test_default_enum_filter_skipped() {
        let status = FieldDescriptor::scalar("status", FieldKind::Enum(&["Draft", "Live"]));
        let model = SearchModel::default()
            .with_filter(status.clone(), FilterValue::Enum("draft".into()));
        let stmt = build_search(&note_schema(), &model).unwrap();
        assert!(!stmt.cypher.contains("$status"));

        let model = SearchModel::default().with_filter(status, FilterValue::Enum("Live".into()));
        let stmt = build_search(&note_schema(), &model).unwrap();
        assert!(stmt.cypher.contains("n.status = $status"));
    }

    #[test]
    fn test_list_filter_on_property() {
        let tags = FieldDescriptor::scalar("tags", FieldKind::List(&FieldKind::String));
        let model = SearchModel::default()
            .with_filter(tags, FilterValue::TextList(vec!["Rust".into()]));
        let stmt = build_search(&note_schema(), &model).unwrap();
        assert!(stmt.cypher.contains("n.tags IN $tags"));
        assert_eq!(stmt.params["tags"], json!(["Rust"]));
    }

    #[test]
    fn test_relationship_filter() {
        let liked_by = FieldDescriptor::relationship("liked_by", &["LIKE", "LOVE"])
            .target("User")
            .target_field("name");
        let model = SearchModel::default()
            .with_filter(liked_by, FilterValue::TextList(vec!["Ada".into(), "Bob".into()]));
        let stmt = build_search(&note_schema(), &model).unwrap();

        assert!(stmt.cypher.starts_with(
            "MATCH (n:Note)\nMATCH (n)-[:LIKE|LOVE]->(target_liked_by:User)\nWHERE"
        ));
        assert!(stmt
            .cypher
            .contains("toLower(target_liked_by.name) IN $liked_by"));
        assert_eq!(stmt.params["liked_by"], json!(["ada", "bob"]));
    }

    #[test]
    fn test_relationship_filter_with_blank_id_skipped() {
        let liked_by = FieldDescriptor::relationship("liked_by", &["LIKE"])
            .target("User")
            .target_field("name");
        let model = SearchModel::default()
            .with_filter(liked_by, FilterValue::TextList(vec!["ada".into(), " ".into()]));
        let stmt = build_search(&note_schema(), &model).unwrap();
        assert!(!stmt.cypher.contains("target_liked_by"));
    }

    #[test]
    fn test_relationship_filter_missing_target_field() {
        let liked_by = FieldDescriptor::relationship("liked_by", &["LIKE"]).target("User");
        let model = SearchModel::default()
            .with_filter(liked_by, FilterValue::TextList(vec!["ada".into()]));
        let result = build_search(&note_schema(), &model);
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn test_relationship_filter_without_label() {
        let tagged = FieldDescriptor::relationship("tagged", &["TAGGED"]).target_field("name");
        let model = SearchModel::default()
            .with_filter(tagged, FilterValue::TextList(vec!["x".into()]));
        let stmt = build_search(&note_schema(), &model).unwrap();
        assert!(stmt.cypher.contains("MATCH (n)-[:TAGGED]->(target_tagged)"));
    }

    #[test]
    fn test_relationship_rewrite() {
        let model = SearchModel::default().with_page(2).with_page_size(5);
        let stmt = build_search(&post_schema(), &model).unwrap();
        let lines: Vec<&str> = stmt.cypher.lines().collect();

        assert_eq!(
            lines,
            vec![
                "MATCH (n:Post)",
                "WHERE (n.deleted_at IS NULL)",
                "OPTIONAL MATCH (n)<-[:LIKE]-(rel_liked_by:User)",
                "OPTIONAL MATCH (n)<-[:DISLIKE]-(rel_disliked_by:User)",
                "OPTIONAL MATCH (n)<-[:WROTE|EDITED]-(rel_author:User)",
                "WITH n, collect(DISTINCT rel_liked_by) AS liked_by_collection, count(DISTINCT rel_disliked_by) AS disliked_by_collection, head(collect(DISTINCT rel_author)) AS author",
                "RETURN DISTINCT n, liked_by_collection, disliked_by_collection, author",
                "ORDER BY n.created_at DESC",
                "SKIP 5",
                "LIMIT 5",
            ]
        );
        assert!(!stmt.cypher.contains("RETURN DISTINCT n\n"));
        assert_eq!(
            extract_return_columns(&stmt.cypher).unwrap(),
            vec!["n", "liked_by_collection", "disliked_by_collection", "author"]
        );
    }

    #[test]
    fn test_count_independent_of_pagination() {
        let schema = post_schema();
        let base = SearchModel::default().with_text("hello");
        let first = build_count(&schema, &base.clone().with_page(1).with_page_size(25)).unwrap();
        let other = build_count(&schema, &base.with_page(4).with_page_size(3)).unwrap();

        assert_eq!(first, other);
        assert!(first.cypher.ends_with("RETURN count(DISTINCT n) AS total_count"));
        assert!(!first.cypher.contains("ORDER BY"));
        assert!(!first.cypher.contains("SKIP"));
        assert!(!first.cypher.contains("LIMIT"));
        assert!(!first.cypher.contains("OPTIONAL MATCH"));
    }

    #[test]
    fn test_count_keeps_relationship_filter_matches() {
        let liked_by = FieldDescriptor::relationship("liked_by", &["LIKE"])
            .target("User")
            .target_field("name")
            .incoming();
        let model = SearchModel::default()
            .with_filter(liked_by, FilterValue::TextList(vec!["ada".into()]));
        let stmt = build_count(&post_schema(), &model).unwrap();
        assert!(stmt
            .cypher
            .contains("MATCH (n)<-[:LIKE]-(target_liked_by:User)"));
        assert_eq!(stmt.params["liked_by"], json!(["ada"]));
    }

    #[test]
    fn test_invalid_order_field_rejected() {
        let model = SearchModel::default().with_order("created_at DESC, n.x", true);
        assert!(matches!(
            build_search(&note_schema(), &model),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_text_search_statement() {
        let stmt = build_text_search(&post_schema(), "Rust", Some(5), Some(10)).unwrap();
        assert_eq!(
            stmt.cypher,
            "MATCH (n:Post)\nWHERE (n.deleted_at IS NULL) AND (toLower(toString(n.title)) CONTAINS $text_search)\nRETURN DISTINCT n\nORDER BY n.created_at DESC\nSKIP 5\nLIMIT 10"
        );

        let stmt = build_text_search(&post_schema(), "Rust", None, None).unwrap();
        assert!(!stmt.cypher.contains("SKIP"));
        assert!(!stmt.cypher.contains("LIMIT"));
    }

    #[test]
    fn test_skip_and_page_floor() {
        let model = SearchModel {
            page: 0,
            page_size: 10,
            ..SearchModel::default()
        };
        assert_eq!(model.skip(), 0);
        assert_eq!(SearchModel::default().with_page(4).with_page_size(7).skip(), 21);
    }

    #[test]
    fn test_search_result_counts() {
        let result = SearchResult::new(vec![1, 2], 10);
        assert_eq!(result.total_count(), 2);
        assert_eq!(result.total_results, 10);
        assert_eq!(result.into_iter().sum::<i32>(), 3);
    }
}
