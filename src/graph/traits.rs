//! Driver boundary traits.
//!
//! - [`CypherExecutor`]: everything a repository needs; one statement in,
//!   rows out.
//! - [`Transaction`]: ends an explicit transaction.
//! - [`GraphClient`]: a pooled client that can open explicit transactions,
//!   whose transaction type is itself an executor.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;
use crate::graph::row::{Params, RowStream};

/// Runs parameterized Cypher against a property graph.
///
/// Implementations acquire a connection per call and hold it only as long as
/// the returned stream lives. Dropping the stream early (including on task
/// cancellation) releases it. Driver failures come back as
/// [`AppError::Query`] or [`AppError::Connection`] and are never retried here.
#[async_trait]
pub trait CypherExecutor: Send + Sync {
    /// Runs a statement and streams its rows.
    ///
    /// # Arguments
    ///
    /// * `cypher` - Statement text; values are referenced as `$name`
    /// * `params` - Bindings for every `$name` in the text
    ///
    /// # Returns
    ///
    /// A lazy stream of [`Row`](crate::graph::Row)s keyed by RETURN column.
    /// A statement without RETURN yields an empty stream.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mut params = Params::new();
    /// params.insert("title".into(), "Hello".into());
    /// let mut rows = executor
    ///     .execute_cypher("MATCH (n:Post {title: $title}) RETURN n", params)
    ///     .await?;
    /// while let Some(row) = rows.try_next().await? {
    ///     let node: Node = row.get("n")?;
    /// }
    /// ```
    async fn execute_cypher(&self, cypher: &str, params: Params)
        -> Result<RowStream<'_>, AppError>;

    /// Runs a statement for its side effects, discarding any rows.
    ///
    /// # Arguments
    ///
    /// * `cypher` - Statement text, usually a write (`CREATE`, `MERGE`, `SET`)
    /// * `params` - Bindings for every `$name` in the text
    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError>;
}

/// Shared executors run statements on the executor they point to.
#[async_trait]
impl<E: CypherExecutor + ?Sized> CypherExecutor for Arc<E> {
    async fn execute_cypher(
        &self,
        cypher: &str,
        params: Params,
    ) -> Result<RowStream<'_>, AppError> {
        self.as_ref().execute_cypher(cypher, params).await
    }

    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError> {
        self.as_ref().run_cypher(cypher, params).await
    }
}

/// The end of an explicit transaction.
///
/// Both outcomes consume the transaction, so no statement can run on it
/// afterwards.
#[async_trait]
pub trait Transaction: Send + Sync {
    /// Makes every statement run in the transaction visible to other sessions.
    async fn commit(self) -> Result<(), AppError>;

    /// Discards every statement run in the transaction.
    async fn rollback(self) -> Result<(), AppError>;
}

/// A pooled client that can also open explicit transactions.
///
/// Its own [`CypherExecutor`] methods run auto-commit statements; statements
/// that must succeed or fail together go through [`begin`](GraphClient::begin).
#[async_trait]
pub trait GraphClient: CypherExecutor {
    /// Transaction handle; runs statements until committed or rolled back.
    type Tx<'a>: Transaction + CypherExecutor
    where
        Self: 'a;

    /// Opens a transaction on a dedicated pooled connection.
    ///
    /// # Returns
    ///
    /// A handle that must end in [`Transaction::commit`] or
    /// [`Transaction::rollback`]. A handle dropped unfinished is rolled back
    /// by the server.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let txn = client.begin().await?;
    /// txn.run_cypher("CREATE (n:Post {title: $title})", params).await?;
    /// txn.commit().await?;
    /// ```
    async fn begin(&self) -> Result<Self::Tx<'_>, AppError>;
}
