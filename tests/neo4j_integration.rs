//! Integration tests for the Neo4j backend and the repository layer.
//!
//! These tests require a running Neo4j instance, configured through
//! `GRAPHMAP_TEST_NEO4J_URI` / `_USER` / `_PASSWORD` (defaults target a local
//! `bolt://localhost:7687` with `neo4j`/`password`).
//! Run with: `cargo test --features integration --test neo4j_integration`

#![cfg(feature = "integration")]

use std::sync::Arc;

use graphmap::config::Neo4jConfig;
use graphmap::graph::backends::neo4j::Neo4jClient;
use graphmap::cypher;
use graphmap::graph::{Graph, GraphClient, Node, QueryExt, Transaction};
use graphmap::models::{post_repository, user_repository, Post, User, LIKE};
use graphmap::schema::{Direction, GraphEntity};
use graphmap::synth::SearchModel;
use serial_test::serial;

/// Marker carried by every node these tests create.
const TEST_DOMAIN: &str = "@integration.test";
const TEST_PREFIX: &str = "[it] ";

fn test_config() -> Neo4jConfig {
    let env = |key: &str, default: &str| {
        std::env::var(format!("GRAPHMAP_TEST_NEO4J_{}", key)).unwrap_or_else(|_| default.into())
    };
    Neo4jConfig {
        uri: env("URI", "bolt://localhost:7687"),
        user: env("USER", "neo4j"),
        password: Some(env("PASSWORD", "password")),
        max_connections: 4,
        fetch_size: 100,
    }
}

async fn create_graph() -> Arc<Graph<Neo4jClient>> {
    let client = Neo4jClient::connect(&test_config())
        .await
        .expect("Failed to connect to test database");
    Arc::new(Graph::new(client))
}

/// Clean up test data before/after tests
async fn cleanup(graph: &Graph<Neo4jClient>) {
    let _ = cypher!(
        graph,
        "MATCH (n) WHERE n.email ENDS WITH $domain OR n.title STARTS WITH $prefix DETACH DELETE n",
        domain = TEST_DOMAIN,
        prefix = TEST_PREFIX,
    )
    .run()
    .await;
}

fn user(name: &str) -> User {
    User {
        name: name.to_string(),
        email: format!("{}{}", name.to_lowercase(), TEST_DOMAIN),
        ..Default::default()
    }
}

fn post(title: &str) -> Post {
    Post {
        title: format!("{}{}", TEST_PREFIX, title),
        content: format!("About {}", title),
        ..Default::default()
    }
}

fn only_test_posts() -> SearchModel {
    SearchModel::default()
        .with_text(TEST_PREFIX.trim())
        .with_searchable_fields(["title"])
}

// All tests share one database and clean up by marker, so they run serially
#[serial]
mod database_tests {
    use super::*;

    #[tokio::test]
    async fn test_node_column_decoding() {
        let graph = create_graph().await;
        cleanup(&graph).await;

        let rows = graph
            .query("CREATE (n:Post {title: $title, tags: ['a', 'b']}) RETURN n")
            .param("title", format!("{}raw", TEST_PREFIX))
            .fetch_all()
            .await
            .expect("Query failed");

        assert_eq!(rows.len(), 1);
        let node: Node = rows[0].get("n").expect("No node column");
        assert!(node.has_label("Post"));
        assert!(node.id.parse::<i64>().is_ok());
        assert_eq!(node.get::<Vec<String>>("tags").unwrap(), ["a", "b"]);

        cleanup(&graph).await;
    }

    #[tokio::test]
    async fn test_native_datetime_properties_decode() {
        let graph = create_graph().await;
        cleanup(&graph).await;

        let id: String = graph
            .query(
                "CREATE (n:Post {title: $title, created_at: datetime(), updated_at: localdatetime()}) \
                 RETURN toString(id(n)) AS id",
            )
            .param("title", format!("{}native", TEST_PREFIX))
            .fetch_scalar("id")
            .await
            .unwrap()
            .expect("no id returned");

        let posts = post_repository(Arc::clone(&graph));
        let fetched = posts.get_by_id(&id).await.unwrap().expect("post missing");
        assert!(fetched.meta.created_at.is_some());
        assert!(fetched.meta.updated_at.is_some());

        let created: String = graph
            .query("MATCH (n:Post) WHERE id(n) = toInteger($id) RETURN n.created_at AS created")
            .param("id", &id)
            .fetch_scalar("created")
            .await
            .unwrap()
            .expect("no created_at column");
        assert!(chrono::DateTime::parse_from_rfc3339(&created).is_ok());

        cleanup(&graph).await;
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let graph = create_graph().await;
        cleanup(&graph).await;
        let posts = post_repository(Arc::clone(&graph));

        let created = posts.create(&post("first")).await.expect("create failed");
        let id = created.id().expect("no id assigned").to_string();
        assert!(created.meta.created_at.is_some());

        let fetched = posts.get_by_id(&id).await.unwrap().expect("post missing");
        assert_eq!(fetched.title, created.title);

        let patch = Post {
            title: String::new(),
            content: "New".into(),
            ..Default::default()
        };
        let updated = posts.update(&id, &patch).await.unwrap().expect("update missed");
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.content, "New");
        assert!(updated.meta.updated_at.is_some());

        assert!(posts.delete(&id).await.unwrap());
        assert!(posts.get_by_id(&id).await.unwrap().is_none());
        assert!(posts.detach_delete(&id).await.unwrap());
        assert!(!posts.detach_delete(&id).await.unwrap());

        cleanup(&graph).await;
    }

    #[tokio::test]
    async fn test_search_expands_liked_by() {
        let graph = create_graph().await;
        cleanup(&graph).await;
        let users = user_repository(Arc::clone(&graph));
        let posts = post_repository(Arc::clone(&graph));

        let ada = users.create(&user("Ada")).await.unwrap();
        let liked = posts.create(&post("liked")).await.unwrap();
        posts.create(&post("quiet")).await.unwrap();

        assert!(users
            .create_relationship(
                ada.id().unwrap(),
                LIKE,
                liked.id().unwrap(),
                Direction::Outgoing
            )
            .await
            .unwrap());

        let page = posts.get_all_with(&only_test_posts()).await.unwrap();
        assert_eq!(page.total_results, 2);
        assert_eq!(page.total_count(), 2);
        for p in &page.results {
            if p.id() == liked.id() {
                assert_eq!(p.liked_by.len(), 1);
                assert_eq!(p.liked_by[0].name, "Ada");
            } else {
                assert!(p.liked_by.is_empty());
            }
        }

        let one_per_page = only_test_posts().with_page_size(1);
        let first = posts.get_all_with(&one_per_page).await.unwrap();
        assert_eq!(first.results.len(), 1);
        assert_eq!(first.total_results, 2);

        cleanup(&graph).await;
    }

    #[tokio::test]
    async fn test_sync_relationships_reconciles() {
        let graph = create_graph().await;
        cleanup(&graph).await;
        let users = user_repository(Arc::clone(&graph));
        let posts = post_repository(Arc::clone(&graph));

        let ada = users.create(&user("Ada")).await.unwrap();
        let ada_id = ada.id().unwrap().to_string();
        let mut post_ids = Vec::new();
        for title in ["a", "b", "c"] {
            let created = posts.create(&post(title)).await.unwrap();
            post_ids.push(created.id().unwrap().to_string());
        }

        let synced = users
            .sync_relationships(&ada_id, LIKE, &post_ids, Direction::Outgoing)
            .await
            .unwrap();
        assert_eq!(synced, 3);
        let again = users
            .sync_relationships(&ada_id, LIKE, &post_ids, Direction::Outgoing)
            .await
            .unwrap();
        assert_eq!(again, 3);

        let subset = vec![post_ids[0].clone(), post_ids[2].clone(), "999999999".to_string()];
        let synced = users
            .sync_relationships(&ada_id, LIKE, &subset, Direction::Outgoing)
            .await
            .unwrap();
        assert_eq!(synced, 2);

        let related: Vec<Post> = users
            .get_related(&ada_id, LIKE, Direction::Outgoing, Some(Post::LABEL))
            .await
            .unwrap();
        let mut related_ids: Vec<_> = related.iter().filter_map(|p| p.id()).collect();
        related_ids.sort();
        let mut expected = vec![post_ids[0].as_str(), post_ids[2].as_str()];
        expected.sort();
        assert_eq!(related_ids, expected);

        let rows = users
            .get_relationships(&ada_id, LIKE, Direction::Outgoing)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        users
            .sync_relationships(&ada_id, LIKE, &[], Direction::Outgoing)
            .await
            .unwrap();
        let rows = users
            .get_relationships(&ada_id, LIKE, Direction::Outgoing)
            .await
            .unwrap();
        assert!(rows.is_empty());

        cleanup(&graph).await;
    }

    #[tokio::test]
    async fn test_text_search_and_lookup_by_field() {
        let graph = create_graph().await;
        cleanup(&graph).await;
        let users = user_repository(Arc::clone(&graph));

        users.create(&user("Hello")).await.unwrap();
        users.create(&user("Goodbye")).await.unwrap();

        let found = users.search("hell", None, None).await.unwrap();
        assert!(found.iter().any(|u| u.name == "Hello"));
        assert!(found.iter().all(|u| u.name != "Goodbye"));

        let by_email = users
            .get_by_field("email", format!("goodbye{}", TEST_DOMAIN))
            .await
            .unwrap()
            .expect("lookup by email failed");
        assert_eq!(by_email.name, "Goodbye");

        cleanup(&graph).await;
    }

    #[tokio::test]
    async fn test_transaction_rollback() {
        let graph = create_graph().await;
        cleanup(&graph).await;

        let txn = graph.client().begin().await.expect("Failed to begin");
        txn.query("CREATE (n:Post {title: $title})")
            .param("title", format!("{}rolled back", TEST_PREFIX))
            .run()
            .await
            .expect("Failed to create in transaction");
        txn.rollback().await.expect("Failed to roll back");

        let rows = graph
            .query("MATCH (n:Post) WHERE n.title STARTS WITH $prefix RETURN n")
            .param("prefix", TEST_PREFIX)
            .fetch_all()
            .await
            .unwrap();
        assert!(rows.is_empty());

        cleanup(&graph).await;
    }

    #[tokio::test]
    async fn test_transaction_commit() {
        let graph = create_graph().await;
        cleanup(&graph).await;

        let txn = graph.client().begin().await.expect("Failed to begin");
        txn.query("CREATE (n:Post {title: $title})")
            .param("title", format!("{}committed", TEST_PREFIX))
            .run()
            .await
            .expect("Failed to create in transaction");
        txn.commit().await.expect("Failed to commit");

        let posts = post_repository(Arc::clone(&graph));
        assert_eq!(posts.count(&only_test_posts()).await.unwrap(), 1);

        cleanup(&graph).await;
    }

    #[tokio::test]
    async fn test_transaction_closure() {
        let graph = create_graph().await;
        cleanup(&graph).await;

        graph
            .transaction(|txn| async move {
                for title in ["one", "two"] {
                    txn.query("CREATE (n:Post {title: $title})")
                        .param("title", format!("{}{}", TEST_PREFIX, title))
                        .run()
                        .await?;
                }
                txn.commit().await
            })
            .await
            .expect("transaction closure failed");

        let posts = post_repository(Arc::clone(&graph));
        assert_eq!(posts.count(&only_test_posts()).await.unwrap(), 2);

        cleanup(&graph).await;
    }
}
