//! Driver boundary for property-graph access.
//!
//! Repositories reach the database only through [`CypherExecutor`], so they
//! run unchanged against Neo4j ([`backends::neo4j`]) and against in-memory
//! executors in tests. A [`Statement`] is query text plus bindings; [`Query`]
//! pairs one with an executor and decodes the resulting [`Row`]s, whose node
//! and relationship columns deserialize into [`Node`] and [`Relationship`].
//!
//! ```ignore
//! use graphmap::graph::{Graph, QueryExt};
//! use graphmap::graph::backends::neo4j::Neo4jClient;
//!
//! let graph = Graph::new(Neo4jClient::connect(&config.neo4j).await?);
//!
//! let post: Option<Node> = graph
//!     .query("MATCH (n:Post) WHERE id(n) = toInteger($id) RETURN n")
//!     .param("id", post_id)
//!     .fetch_scalar("n")
//!     .await?;
//! ```

mod cypher;
mod macros;
mod query;
mod row;
mod traits;

pub mod backends;

pub use cypher::{extract_return_columns, ParseError};
pub use query::{Query, QueryExt, Statement};
pub use row::{Node, Params, Relationship, Row, RowStream};
pub use traits::{CypherExecutor, GraphClient, Transaction};

// `cypher!` is exported at the crate root
#[doc(inline)]
pub use crate::cypher;

use std::future::Future;

use crate::error::AppError;

/// Shareable handle over a [`GraphClient`].
///
/// As a [`CypherExecutor`] it runs auto-commit statements on the client, so
/// repositories are built directly on it; [`Graph::transaction`] hands a
/// closure an explicit transaction instead.
///
/// ```ignore
/// let graph = Graph::new(client);
///
/// graph.transaction(|txn| async move {
///     txn.query("CREATE (:User {name: $name})").param("name", "ada").run().await?;
///     txn.query("CREATE (:User {name: $name})").param("name", "bob").run().await?;
///     txn.commit().await
/// }).await?;
/// ```
pub struct Graph<C: GraphClient> {
    client: C,
}

impl<C: GraphClient> Graph<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// The wrapped client, for opening transactions by hand.
    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    /// Runs `f` with a freshly opened transaction.
    ///
    /// # Arguments
    ///
    /// * `f` - Receives the transaction by value and must end it with
    ///   `commit()` or `rollback()`
    ///
    /// # Returns
    ///
    /// Whatever `f` returns. Failing to open the transaction returns that
    /// error without calling `f`. A transaction that `f` drops unfinished is
    /// rolled back by the server when its connection returns to the pool.
    pub async fn transaction<F, R, Fut>(&self, f: F) -> Result<R, AppError>
    where
        F: FnOnce(C::Tx<'_>) -> Fut,
        Fut: Future<Output = Result<R, AppError>>,
    {
        let txn = self.client.begin().await?;
        f(txn).await
    }
}

#[async_trait::async_trait]
impl<C: GraphClient> CypherExecutor for Graph<C> {
    async fn execute_cypher(
        &self,
        cypher: &str,
        params: Params,
    ) -> Result<RowStream<'_>, AppError> {
        self.client.execute_cypher(cypher, params).await
    }

    async fn run_cypher(&self, cypher: &str, params: Params) -> Result<(), AppError> {
        self.client.run_cypher(cypher, params).await
    }
}
