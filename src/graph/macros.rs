//! The `cypher!` shorthand.

/// Builds a [`Query`](crate::graph::Query) and binds each `name = value`
/// pair to `$name`. [`QueryExt`](crate::graph::QueryExt) must be in scope.
///
/// ```ignore
/// use graphmap::cypher;
/// use graphmap::graph::QueryExt;
///
/// let rows = cypher!(
///     graph,
///     "MATCH (u:User)-[:LIKE]->(p:Post) WHERE u.email = $email RETURN p LIMIT $limit",
///     email = email,
///     limit = 10,
/// )
/// .fetch_all()
/// .await?;
/// ```
#[macro_export]
macro_rules! cypher {
    ($executor:expr, $cypher:expr) => {
        $executor.query($cypher)
    };
    ($executor:expr, $cypher:expr, $($name:ident = $value:expr),+ $(,)?) => {
        $executor.query($cypher)$(.param(stringify!($name), $value))+
    };
}
