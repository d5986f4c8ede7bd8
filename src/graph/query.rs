//! Statements and the fluent query builder.

use futures::{StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::graph::row::{Params, Row, RowStream};
use crate::graph::traits::CypherExecutor;

/// Query text plus parameter bindings.
///
/// Values always travel in `params`; the text only ever references them as
/// `$name`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    pub cypher: String,
    pub params: Params,
}

impl Statement {
    pub fn new(cypher: impl Into<String>) -> Self {
        Self {
            cypher: cypher.into(),
            params: Params::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<JsonValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }
}

/// A [`Statement`] bound to the executor that will run it.
///
/// ```ignore
/// let titles: Vec<String> = client
///     .query("MATCH (n:Post) WHERE n.title STARTS WITH $prefix RETURN n.title AS title")
///     .param("prefix", "Hello")
///     .fetch_column("title")
///     .await?;
/// ```
pub struct Query<'a, E: CypherExecutor + ?Sized> {
    executor: &'a E,
    statement: Statement,
}

impl<'a, E: CypherExecutor + ?Sized> Query<'a, E> {
    pub fn new(executor: &'a E, cypher: &str) -> Self {
        Self::from_statement(executor, Statement::new(cypher))
    }

    pub fn from_statement(executor: &'a E, statement: Statement) -> Self {
        Self {
            executor,
            statement,
        }
    }

    /// Binds `$name`. A value with no JSON form is bound as `null`.
    pub fn param<T: Serialize>(mut self, name: &str, value: T) -> Self {
        let value = serde_json::to_value(value).unwrap_or(JsonValue::Null);
        self.statement.params.insert(name.to_string(), value);
        self
    }

    pub fn param_raw(mut self, name: &str, value: JsonValue) -> Self {
        self.statement.params.insert(name.to_string(), value);
        self
    }

    /// Replaces every binding.
    pub fn params(mut self, params: Params) -> Self {
        self.statement.params = params;
        self
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Streams result rows; the connection is held until the stream drops.
    pub async fn execute(self) -> Result<RowStream<'a>, AppError> {
        let Statement { cypher, params } = self.statement;
        self.executor.execute_cypher(&cypher, params).await
    }

    pub async fn fetch_all(self) -> Result<Vec<Row>, AppError> {
        self.execute().await?.try_collect().await
    }

    pub async fn fetch_one(self) -> Result<Option<Row>, AppError> {
        self.execute().await?.next().await.transpose()
    }

    /// Decodes `column` from every row.
    pub async fn fetch_column<T: DeserializeOwned>(self, column: &str) -> Result<Vec<T>, AppError> {
        self.fetch_all()
            .await?
            .iter()
            .map(|row| row.get(column))
            .collect()
    }

    /// Decodes `column` from the first row; no rows and null both give `None`.
    pub async fn fetch_scalar<T: DeserializeOwned>(
        self,
        column: &str,
    ) -> Result<Option<T>, AppError> {
        match self.fetch_one().await? {
            Some(row) => row.get_opt(column),
            None => Ok(None),
        }
    }

    /// Runs the statement and discards any rows.
    pub async fn run(self) -> Result<(), AppError> {
        let Statement { cypher, params } = self.statement;
        self.executor.run_cypher(&cypher, params).await
    }
}

/// `executor.query(..)` and `executor.statement(..)` for every executor.
pub trait QueryExt: CypherExecutor {
    fn query(&self, cypher: &str) -> Query<'_, Self>
    where
        Self: Sized,
    {
        Query::new(self, cypher)
    }

    fn statement(&self, statement: Statement) -> Query<'_, Self>
    where
        Self: Sized,
    {
        Query::from_statement(self, statement)
    }
}

impl<E: CypherExecutor> QueryExt for E {}
