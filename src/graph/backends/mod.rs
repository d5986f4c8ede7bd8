//! Backend implementations of the driver boundary.
//!
//! Each backend implements the core traits from [`crate::graph`]:
//!
//! - [`CypherExecutor`](crate::graph::CypherExecutor)
//! - [`Transaction`](crate::graph::Transaction)
//! - [`GraphClient`](crate::graph::GraphClient)
//!
//! | Backend | Module |
//! |---------|--------|
//! | Neo4j (Bolt, via neo4rs) | [`neo4j`] |

pub mod neo4j;
