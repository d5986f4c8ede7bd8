//! Example domain: users reacting to posts.
//!
//! `User` and `Post` are linked by `LIKE` and `DISLIKE` relationships, always
//! pointing from the user to the post. Each type ships an entity-specific
//! converter that hydrates the nested related entities returned by a
//! relationship-expanding search.

mod post;
mod user;

use std::sync::Arc;

pub use post::{Post, PostConverter};
pub use user::{User, UserConverter};

use crate::graph::CypherExecutor;
use crate::repositories::GraphRepository;

/// Relationship type for a user liking a post.
pub const LIKE: &str = "LIKE";

/// Relationship type for a user disliking a post.
pub const DISLIKE: &str = "DISLIKE";

/// Repository for users, hydrating liked and disliked posts.
pub fn user_repository<E: CypherExecutor>(executor: Arc<E>) -> GraphRepository<User, E> {
    GraphRepository::with_converter(executor, Arc::new(UserConverter::default()))
}

/// Repository for posts, hydrating the users who reacted to them.
pub fn post_repository<E: CypherExecutor>(executor: Arc<E>) -> GraphRepository<Post, E> {
    GraphRepository::with_converter(executor, Arc::new(PostConverter::default()))
}
