//! Generic repository over any [`GraphEntity`].

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::convert::{DefaultNodeConverter, NodeConverter};
use crate::error::AppError;
use crate::graph::{CypherExecutor, Node, Params, QueryExt, Row};
use crate::schema::{Direction, EntitySchema, GraphEntity, RESERVED_FIELDS};
use crate::synth::{self, RelationshipDelta, SearchModel, SearchResult, Statement};

/// Column holding the primary node in synthesized statements.
const NODE_ALIAS: &str = "n";

/// Repository for entities of type `T` over the executor `E`.
///
/// Each operation is a single statement run on its own pooled connection,
/// so a repository can be cloned and shared between tasks freely. Driver
/// failures are logged with the operation and identifiers involved, then
/// returned unchanged; nothing is retried.
pub struct GraphRepository<T: GraphEntity, E> {
    executor: Arc<E>,
    converter: Arc<dyn NodeConverter<T>>,
    schema: Arc<EntitySchema>,
}

impl<T: GraphEntity, E> Clone for GraphRepository<T, E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            converter: Arc::clone(&self.converter),
            schema: Arc::clone(&self.schema),
        }
    }
}

impl<T: GraphEntity, E: CypherExecutor> GraphRepository<T, E> {
    /// Repository using the schema-driven [`DefaultNodeConverter`].
    pub fn new(executor: Arc<E>) -> Self {
        Self::with_converter(executor, Arc::new(DefaultNodeConverter::<T>::new()))
    }

    /// Repository using an entity-specific converter.
    pub fn with_converter(executor: Arc<E>, converter: Arc<dyn NodeConverter<T>>) -> Self {
        Self {
            executor,
            converter,
            schema: T::schema(),
        }
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn converter(&self) -> &dyn NodeConverter<T> {
        self.converter.as_ref()
    }

    fn label(&self) -> &str {
        self.schema.label()
    }

    async fn fetch(&self, operation: &'static str, stmt: Statement) -> Result<Vec<Row>, AppError> {
        tracing::debug!(
            operation,
            label = self.label(),
            query = %stmt.cypher,
            "Executing statement"
        );
        self.executor.statement(stmt).fetch_all().await
    }

    fn convert_rows(&self, rows: &[Row]) -> Result<Vec<T>, AppError> {
        rows.iter()
            .map(|row| self.converter.convert_from_record(row, NODE_ALIAS))
            .collect()
    }

    fn convert_first(&self, rows: &[Row]) -> Result<Option<T>, AppError> {
        rows.first()
            .map(|row| self.converter.convert_from_record(row, NODE_ALIAS))
            .transpose()
    }

    /// Persists a new node built from the entity's scalar fields.
    ///
    /// The store assigns the identifier and creation timestamp; both are set
    /// on the returned entity.
    pub async fn create(&self, entity: &T) -> Result<T, AppError> {
        let properties = self.converter.convert_to_properties(entity);
        let stmt = synth::build_create(self.label(), properties)?;

        let rows = self.fetch("create", stmt).await.inspect_err(|e| {
            tracing::error!(label = self.label(), error = %e, "Failed to create entity")
        })?;

        self.convert_first(&rows)?.ok_or_else(|| {
            AppError::Internal(format!("create returned no {} node", self.label()))
        })
    }

    /// Looks up a live node by identifier.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<T>, AppError> {
        let stmt = synth::build_get_by_id(self.label(), id)?;

        let rows = self.fetch("get_by_id", stmt).await.inspect_err(|e| {
            tracing::error!(label = self.label(), id, error = %e, "Failed to get entity by id")
        })?;

        self.convert_first(&rows)
    }

    /// Looks up the first live node whose field equals `value`.
    ///
    /// `field` is a field identifier, a stored property name, or one of the
    /// lifecycle timestamps.
    pub async fn get_by_field(
        &self,
        field: &str,
        value: impl Into<JsonValue>,
    ) -> Result<Option<T>, AppError> {
        let stored_name = self.resolve_stored_name(field)?;
        let stmt = synth::build_get_by_field(self.label(), &stored_name, value.into())?;

        let rows = self.fetch("get_by_field", stmt).await.inspect_err(|e| {
            tracing::error!(
                label = self.label(),
                field,
                error = %e,
                "Failed to get entity by field"
            )
        })?;

        self.convert_first(&rows)
    }

    fn resolve_stored_name(&self, field: &str) -> Result<String, AppError> {
        if let Some(descriptor) = self.schema.field(field) {
            if descriptor.is_relationship() {
                return Err(AppError::InvalidArgument(format!(
                    "'{}' is a relationship field and has no stored value",
                    field
                )));
            }
            return Ok(descriptor.stored_name.clone());
        }
        if let Some(descriptor) = self.schema.scalars().iter().find(|f| f.stored_name == field) {
            return Ok(descriptor.stored_name.clone());
        }
        if field != "id" && RESERVED_FIELDS.contains(&field) {
            return Ok(field.to_string());
        }
        Err(AppError::InvalidArgument(format!(
            "unknown field '{}' on {}",
            field,
            self.label()
        )))
    }

    /// Every live entity, unpaginated.
    pub async fn get_all(&self) -> Result<SearchResult<T>, AppError> {
        let model = SearchModel {
            page_size: 0,
            ..SearchModel::default()
        };
        self.get_all_with(&model).await
    }

    /// One page of entities matching `model`, plus the total match count.
    ///
    /// The page and the count are independent statements run concurrently;
    /// either failing fails the whole operation.
    pub async fn get_all_with(&self, model: &SearchModel) -> Result<SearchResult<T>, AppError> {
        let search = synth::build_search(&self.schema, model)?;
        let count = synth::build_count(&self.schema, model)?;

        let (rows, total) = futures::try_join!(
            self.fetch("search", search),
            self.fetch_count(count)
        )
        .inspect_err(|e| {
            tracing::error!(
                label = self.label(),
                page = model.page,
                page_size = model.page_size,
                error = %e,
                "Failed to search entities"
            )
        })?;

        Ok(SearchResult::new(self.convert_rows(&rows)?, total))
    }

    /// Free-text search over the searchable fields, newest first.
    pub async fn search(
        &self,
        term: &str,
        skip: Option<u64>,
        limit: Option<u64>,
    ) -> Result<Vec<T>, AppError> {
        let stmt = synth::build_text_search(&self.schema, term, skip, limit)?;

        let rows = self.fetch("text_search", stmt).await.inspect_err(|e| {
            tracing::error!(label = self.label(), term, error = %e, "Failed to search entities")
        })?;

        self.convert_rows(&rows)
    }

    /// Number of entities matching the model's filters.
    pub async fn count(&self, model: &SearchModel) -> Result<i64, AppError> {
        let stmt = synth::build_count(&self.schema, model)?;
        self.fetch_count(stmt).await.inspect_err(|e| {
            tracing::error!(label = self.label(), error = %e, "Failed to count entities")
        })
    }

    /// Number of live entities.
    pub async fn count_all(&self) -> Result<i64, AppError> {
        self.count(&SearchModel::default()).await
    }

    async fn fetch_count(&self, stmt: Statement) -> Result<i64, AppError> {
        let rows = self.fetch("count", stmt).await?;
        match rows.first() {
            Some(row) => row.get("total_count"),
            None => Ok(0),
        }
    }

    /// Runs an arbitrary statement and returns the raw rows.
    pub async fn execute_query(&self, cypher: &str, params: Params) -> Result<Vec<Row>, AppError> {
        let stmt = Statement {
            cypher: cypher.to_string(),
            params,
        };
        self.fetch("execute_query", stmt)
            .await
            .inspect_err(|e| {
                tracing::error!(query = cypher, error = %e, "Failed to execute custom query")
            })
    }

    /// Runs an arbitrary statement and converts its `n` column into entities.
    pub async fn execute_query_as(&self, cypher: &str, params: Params) -> Result<Vec<T>, AppError> {
        let rows = self.execute_query(cypher, params).await?;
        self.convert_rows(&rows)
    }

    /// Entities related to node `id`, newest first, decoded with the
    /// default converter for `R`.
    pub async fn get_related<R: GraphEntity>(
        &self,
        id: &str,
        rel_type: &str,
        direction: Direction,
        target_label: Option<&str>,
    ) -> Result<Vec<R>, AppError> {
        let converter = DefaultNodeConverter::<R>::new();
        self.get_related_with(id, rel_type, direction, target_label, &converter)
            .await
    }

    /// Like [`get_related`](Self::get_related) with an explicit converter.
    pub async fn get_related_with<R: GraphEntity>(
        &self,
        id: &str,
        rel_type: &str,
        direction: Direction,
        target_label: Option<&str>,
        converter: &dyn NodeConverter<R>,
    ) -> Result<Vec<R>, AppError> {
        let stmt = synth::build_get_related(self.label(), id, rel_type, direction, target_label)?;

        let rows = self.fetch("get_related", stmt).await.inspect_err(|e| {
            tracing::error!(
                label = self.label(),
                id,
                rel_type,
                ?direction,
                error = %e,
                "Failed to get related entities"
            )
        })?;

        rows.iter()
            .map(|row| row.get::<Node>("target").map(|node| converter.convert_from_node(&node)))
            .collect()
    }

    /// Raw `r, source, target` rows for node `id`.
    pub async fn get_relationships(
        &self,
        id: &str,
        rel_type: &str,
        direction: Direction,
    ) -> Result<Vec<Row>, AppError> {
        let stmt = synth::build_get_relationships(self.label(), id, rel_type, direction)?;

        self.fetch("get_relationships", stmt).await.inspect_err(|e| {
            tracing::error!(
                label = self.label(),
                id,
                rel_type,
                ?direction,
                error = %e,
                "Failed to get relationships"
            )
        })
    }

    /// Marks the node deleted.
    ///
    /// Returns true only when the statement reports back the requested id.
    pub async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let stmt = synth::build_soft_delete(self.label(), id)?;

        let rows = self.fetch("soft_delete", stmt).await.inspect_err(|e| {
            tracing::error!(label = self.label(), id, error = %e, "Failed to soft delete entity")
        })?;

        let deleted = match rows.first() {
            Some(row) => row.get_opt::<String>("id")?.is_some_and(|returned| returned == id),
            None => false,
        };
        Ok(deleted)
    }

    /// Removes the node and all of its relationships.
    pub async fn detach_delete(&self, id: &str) -> Result<bool, AppError> {
        let stmt = synth::build_detach_delete(self.label(), id)?;

        let rows = self.fetch("detach_delete", stmt).await.inspect_err(|e| {
            tracing::error!(label = self.label(), id, error = %e, "Failed to detach delete entity")
        })?;

        let deleted_count = match rows.first() {
            Some(row) => row.get::<i64>("deleted_count")?,
            None => 0,
        };
        Ok(deleted_count > 0)
    }

    /// Partially updates node `id` from the entity's non-blank scalars.
    ///
    /// Returns `None` when no node has that id.
    pub async fn update(&self, id: &str, entity: &T) -> Result<Option<T>, AppError> {
        let properties = self.converter.convert_to_properties(entity);
        let stmt = synth::build_update(self.label(), id, properties)?;

        let rows = self.fetch("update", stmt).await.inspect_err(|e| {
            tracing::error!(label = self.label(), id, error = %e, "Failed to update entity")
        })?;

        self.convert_first(&rows)
    }

    /// Ensures one `rel_type` edge exists between the two nodes.
    ///
    /// Returns false when either node does not exist.
    pub async fn create_relationship(
        &self,
        source_id: &str,
        rel_type: &str,
        target_id: &str,
        direction: Direction,
    ) -> Result<bool, AppError> {
        let stmt = synth::build_create_relationship(source_id, rel_type, target_id, direction)?;

        let rows = self.fetch("create_relationship", stmt).await.inspect_err(|e| {
            tracing::error!(
                source_id,
                rel_type,
                target_id,
                ?direction,
                error = %e,
                "Failed to create relationship"
            )
        })?;

        Ok(!rows.is_empty())
    }

    /// Reconciles the source's `rel_type` edges to exactly `target_ids`.
    ///
    /// Returns the number of targets now connected; unknown ids are skipped.
    pub async fn sync_relationships(
        &self,
        source_id: &str,
        rel_type: &str,
        target_ids: &[String],
        direction: Direction,
    ) -> Result<i64, AppError> {
        let stmt = synth::build_sync_relationships(source_id, rel_type, target_ids, direction)?;

        let rows = self.fetch("sync_relationships", stmt).await.inspect_err(|e| {
            tracing::error!(
                source_id,
                rel_type,
                targets = target_ids.len(),
                ?direction,
                error = %e,
                "Failed to sync relationships"
            )
        })?;

        match rows.first() {
            Some(row) => row.get("synced_count"),
            None => Ok(0),
        }
    }

    /// Edges [`sync_relationships`](Self::sync_relationships) would remove
    /// and add, without writing anything.
    ///
    /// `to_add` lists desired ids that are not connected yet, including ids
    /// that resolve to no node; the sync itself skips those.
    pub async fn plan_sync(
        &self,
        source_id: &str,
        rel_type: &str,
        target_ids: &[String],
        direction: Direction,
    ) -> Result<RelationshipDelta, AppError> {
        let rows = self.get_relationships(source_id, rel_type, direction).await?;
        let current = rows
            .iter()
            .map(|row| row.get::<Node>("target").map(|node| node.id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RelationshipDelta::compute(&current, target_ids))
    }
}
