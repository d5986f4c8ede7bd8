//! Neo4j backend over the Bolt protocol.
//!
//! Wraps a pooled [`neo4rs::Graph`]. Each auto-commit statement borrows a
//! pooled connection for as long as its [`RowStream`] is alive, so dropping
//! the stream (or the future producing it) returns the connection.
//!
//! # Example
//!
//! ```ignore
//! use graphmap::graph::backends::neo4j::Neo4jClient;
//! use graphmap::graph::{Graph, QueryExt};
//!
//! let client = Neo4jClient::connect(&config.neo4j).await?;
//! let graph = Graph::new(client);
//!
//! let rows = graph.query("MATCH (n:User) RETURN n").fetch_all().await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use neo4rs::{BoltList, BoltMap, BoltNull, BoltString, BoltType, ConfigBuilder};
use serde_json::{Map, Value as JsonValue};
use tokio::sync::Mutex;

use crate::config::Neo4jConfig;
use crate::error::AppError;
use crate::graph::cypher::{extract_return_columns, ParseError};
use crate::graph::row::{Params, Row, RowStream};
use crate::graph::traits::{CypherExecutor, GraphClient, Transaction};

/// Neo4j graph client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct Neo4jClient {
    graph: neo4rs::Graph,
}

impl Neo4jClient {
    /// Connects using the `[neo4j]` configuration section.
    pub async fn connect(config: &Neo4jConfig) -> Result<Self, AppError> {
        let neo4j_config = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(config.password.as_deref().unwrap_or(""))
            .max_connections(config.max_connections)
            .fetch_size(config.fetch_size)
            .build()?;

        let graph = neo4rs::Graph::connect(neo4j_config).await?;
        tracing::info!(uri = %config.uri, "Connected to Neo4j");

        Ok(Self { graph })
    }

    /// Wraps an already connected driver handle.
    pub fn from_graph(graph: neo4rs::Graph) -> Self {
        Self { graph }
    }

    pub fn inner(&self) -> &neo4rs::Graph {
        &self.graph
    }
}

#[async_trait]
impl CypherExecutor for Neo4jClient {
    async fn execute_cypher(
        &self,
        cypher: &str,
        params: Params,
    ) -> Result<RowStream<'_>, AppError> {
        use async_stream::try_stream;

        let columns = return_columns(cypher)?;
        let statement = build_query(cypher, params);
        let graph = self.graph.clone();
        let cypher = cypher.to_string();

        Ok(Box::pin(try_stream! {
            // The detached stream holds its pooled connection until dropped
            let mut result = graph
                .execute(statement)
                .await
                .map_err(|e| query_error(&cypher, e))?;

            while let Some(row) = result.next().await.map_err(|e| query_error(&cypher, e))? {
                yield decode_row(&row, &columns);
            }
        }))
    }

    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError> {
        self.graph
            .run(build_query(cypher, params))
            .await
            .map_err(|e| query_error(cypher, e))
    }
}

#[async_trait]
impl GraphClient for Neo4jClient {
    type Tx<'a> = Neo4jTransaction;

    async fn begin(&self) -> Result<Self::Tx<'_>, AppError> {
        let txn = self.graph.start_txn().await?;
        Ok(Neo4jTransaction {
            txn: Mutex::new(Some(txn)),
            finished: false,
        })
    }
}

/// An explicit Neo4j transaction.
///
/// Statements are serialized through an internal lock because the driver
/// transaction requires exclusive access. Rows are buffered per statement.
pub struct Neo4jTransaction {
    txn: Mutex<Option<neo4rs::Txn>>,
    finished: bool,
}

#[async_trait]
impl CypherExecutor for Neo4jTransaction {
    async fn execute_cypher(
        &self,
        cypher: &str,
        params: Params,
    ) -> Result<RowStream<'_>, AppError> {
        let columns = return_columns(cypher)?;
        let mut guard = self.txn.lock().await;
        let txn = guard
            .as_mut()
            .ok_or_else(|| AppError::Internal("transaction already finished".into()))?;

        let mut result = txn
            .execute(build_query(cypher, params))
            .await
            .map_err(|e| query_error(cypher, e))?;

        let mut rows = Vec::new();
        while let Some(row) = result
            .next(txn.handle())
            .await
            .map_err(|e| query_error(cypher, e))?
        {
            rows.push(Ok(decode_row(&row, &columns)));
        }

        Ok(Box::pin(futures::stream::iter(rows)))
    }

    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError> {
        let mut guard = self.txn.lock().await;
        let txn = guard
            .as_mut()
            .ok_or_else(|| AppError::Internal("transaction already finished".into()))?;
        txn.run(build_query(cypher, params))
            .await
            .map_err(|e| query_error(cypher, e))
    }
}

#[async_trait]
impl Transaction for Neo4jTransaction {
    async fn commit(mut self) -> Result<(), AppError> {
        self.finished = true;
        match self.txn.get_mut().take() {
            Some(txn) => Ok(txn.commit().await?),
            None => Err(AppError::Internal("transaction already finished".into())),
        }
    }

    async fn rollback(mut self) -> Result<(), AppError> {
        self.finished = true;
        match self.txn.get_mut().take() {
            Some(txn) => Ok(txn.rollback().await?),
            None => Err(AppError::Internal("transaction already finished".into())),
        }
    }
}

impl Drop for Neo4jTransaction {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("Neo4jTransaction dropped without commit or rollback");
        }
    }
}

fn query_error(cypher: &str, err: neo4rs::Error) -> AppError {
    AppError::Query {
        message: format!("Cypher query failed: {}", err),
        query: cypher.to_string(),
    }
}

/// Column names to decode for a statement.
///
/// Write-only statements have no RETURN clause and produce no columns.
fn return_columns(cypher: &str) -> Result<Vec<String>, AppError> {
    match extract_return_columns(cypher) {
        Ok(columns) => Ok(columns),
        Err(ParseError::NoReturnClause) => Ok(Vec::new()),
        Err(ParseError::ReturnStarNotSupported) => Err(AppError::InvalidArgument(
            "RETURN * is not supported - please specify columns explicitly".into(),
        )),
        Err(ParseError::InvalidSyntax(msg)) => {
            Err(AppError::InvalidArgument(format!("Cypher syntax error: {}", msg)))
        }
    }
}

fn build_query(cypher: &str, params: Params) -> neo4rs::Query {
    params
        .into_iter()
        .fold(neo4rs::query(cypher), |query, (name, value)| {
            query.param(&name, json_to_bolt(value))
        })
}

/// Converts a JSON parameter into its Bolt representation.
fn json_to_bolt(value: JsonValue) -> BoltType {
    match value {
        JsonValue::Null => BoltType::Null(BoltNull),
        JsonValue::Bool(b) => b.into(),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap_or_default().into(),
        },
        JsonValue::String(s) => s.into(),
        JsonValue::Array(items) => BoltType::List(BoltList {
            value: items.into_iter().map(json_to_bolt).collect(),
        }),
        JsonValue::Object(entries) => BoltType::Map(BoltMap {
            value: entries
                .into_iter()
                .map(|(k, v)| (BoltString::from(k.as_str()), json_to_bolt(v)))
                .collect(),
        }),
    }
}

fn decode_row(row: &neo4rs::Row, columns: &[String]) -> Row {
    let data: HashMap<String, JsonValue> = columns
        .iter()
        .map(|column| (column.clone(), decode_column(row, column)))
        .collect();
    Row::new(data)
}

/// Decodes a single column, trying graph types before plain values.
fn decode_column(row: &neo4rs::Row, column: &str) -> JsonValue {
    if let Ok(node) = row.get::<neo4rs::Node>(column) {
        return node_to_json(&node);
    }
    if let Ok(rel) = row.get::<neo4rs::Relation>(column) {
        return relation_to_json(&rel);
    }
    if let Ok(nodes) = row.get::<Vec<neo4rs::Node>>(column) {
        return JsonValue::Array(nodes.iter().map(node_to_json).collect());
    }
    temporal_or_json(
        row.get(column).ok(),
        || row.get(column).ok(),
        || row.get(column).ok(),
    )
}

/// Renders Bolt temporal values as RFC 3339 strings.
///
/// Strings pass through untouched. Anything else is tried as a zoned, then a
/// local date-time before falling back to its plain JSON form; a local
/// date-time is taken as UTC.
fn temporal_or_json(
    json: Option<JsonValue>,
    zoned: impl FnOnce() -> Option<DateTime<FixedOffset>>,
    local: impl FnOnce() -> Option<NaiveDateTime>,
) -> JsonValue {
    match json {
        Some(value @ JsonValue::String(_)) => value,
        other => zoned()
            .map(|dt| dt.to_rfc3339())
            .or_else(|| local().map(|dt| dt.and_utc().to_rfc3339()))
            .map(JsonValue::String)
            .or(other)
            .unwrap_or(JsonValue::Null),
    }
}

fn node_to_json(node: &neo4rs::Node) -> JsonValue {
    let mut properties = Map::new();
    for key in node.keys() {
        let value = temporal_or_json(
            node.get(key).ok(),
            || node.get(key).ok(),
            || node.get(key).ok(),
        );
        properties.insert(key.to_string(), value);
    }

    serde_json::json!({
        "id": node.id().to_string(),
        "labels": node.labels().iter().map(|l| l.to_string()).collect::<Vec<_>>(),
        "properties": properties,
    })
}

fn relation_to_json(rel: &neo4rs::Relation) -> JsonValue {
    let mut properties = Map::new();
    for key in rel.keys() {
        let value = temporal_or_json(
            rel.get(key).ok(),
            || rel.get(key).ok(),
            || rel.get(key).ok(),
        );
        properties.insert(key.to_string(), value);
    }

    serde_json::json!({
        "id": rel.id().to_string(),
        "type": rel.typ().to_string(),
        "start_id": rel.start_node_id().to_string(),
        "end_id": rel.end_node_id().to_string(),
        "properties": properties,
    })
}
