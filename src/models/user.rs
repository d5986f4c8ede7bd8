//! User model.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::{Post, DISLIKE, LIKE};
use crate::convert::{related_nodes, DefaultNodeConverter, FieldValue, NodeConverter};
use crate::error::AppError;
use crate::graph::{Node, Row};
use crate::schema::{FieldDescriptor, FieldKind, GraphEntity, NodeMeta};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct User {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub name: String,
    pub email: String,
    pub liked_posts: Vec<Post>,
    pub disliked_posts: Vec<Post>,
}

impl GraphEntity for User {
    const LABEL: &'static str = "User";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::scalar("name", FieldKind::String).searchable(),
            FieldDescriptor::scalar("email", FieldKind::String).searchable(),
            FieldDescriptor::relationship("liked_posts", &[LIKE])
                .target(Post::LABEL)
                .target_field("title")
                .outgoing(),
            FieldDescriptor::relationship("disliked_posts", &[DISLIKE])
                .target(Post::LABEL)
                .target_field("title")
                .outgoing(),
        ]
    }

    fn meta(&self) -> &NodeMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut NodeMeta {
        &mut self.meta
    }

    fn read_field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "name" => Some(self.name.as_str().into()),
            "email" => Some(self.email.as_str().into()),
            _ => None,
        }
    }

    fn write_field(&mut self, name: &str, value: FieldValue) -> bool {
        match (name, value) {
            ("name", FieldValue::String(v)) => self.name = v,
            ("email", FieldValue::String(v)) => self.email = v,
            _ => return false,
        }
        true
    }
}

/// Converts users and the posts they liked or disliked.
#[derive(Clone, Default)]
pub struct UserConverter {
    base: DefaultNodeConverter<User>,
    posts: DefaultNodeConverter<Post>,
}

impl UserConverter {
    fn posts(&self, row: &Row, column: &str) -> Vec<Post> {
        related_nodes(row, column)
            .iter()
            .map(|node| self.posts.convert_from_node(node))
            .collect()
    }
}

impl NodeConverter<User> for UserConverter {
    fn convert_from_node(&self, node: &Node) -> User {
        self.base.convert_from_node(node)
    }

    fn convert_from_record(&self, row: &Row, alias: &str) -> Result<User, AppError> {
        let mut user = self.base.convert_from_record(row, alias)?;
        user.liked_posts = self.posts(row, "liked_posts_collection");
        user.disliked_posts = self.posts(row, "disliked_posts_collection");
        Ok(user)
    }

    fn convert_to_properties(&self, user: &User) -> Map<String, JsonValue> {
        self.base.convert_to_properties(user)
    }
}
