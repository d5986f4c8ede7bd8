//! Post model.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::{User, DISLIKE, LIKE};
use crate::convert::{related_nodes, DefaultNodeConverter, FieldValue, NodeConverter};
use crate::error::AppError;
use crate::graph::{Node, Row};
use crate::schema::{FieldDescriptor, FieldKind, GraphEntity, NodeMeta};

/// A piece of content users can like or dislike.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Post {
    #[serde(flatten)]
    pub meta: NodeMeta,
    pub title: String,
    pub content: String,
    /// Users with a `LIKE` edge to this post.
    pub liked_by: Vec<User>,
    /// Users with a `DISLIKE` edge to this post.
    pub disliked_by: Vec<User>,
}

impl GraphEntity for Post {
    const LABEL: &'static str = "Post";

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::scalar("title", FieldKind::String).searchable(),
            FieldDescriptor::scalar("content", FieldKind::String).searchable(),
            FieldDescriptor::relationship("liked_by", &[LIKE])
                .target(User::LABEL)
                .target_field("name")
                .incoming(),
            FieldDescriptor::relationship("disliked_by", &[DISLIKE])
                .target(User::LABEL)
                .target_field("name")
                .incoming(),
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
            "title" => Some(self.title.as_str().into()),
            "content" => Some(self.content.as_str().into()),
            _ => None,
        }
    }

    fn write_field(&mut self, name: &str, value: FieldValue) -> bool {
        match (name, value) {
            ("title", FieldValue::String(v)) => self.title = v,
            ("content", FieldValue::String(v)) => self.content = v,
            _ => return false,
        }
        true
    }
}

/// Converts posts and the users collected under `liked_by_collection` and
/// `disliked_by_collection`.
#[derive(Clone, Default)]
pub struct PostConverter {
    base: DefaultNodeConverter<Post>,
    users: DefaultNodeConverter<User>,
}

impl PostConverter {
    fn users(&self, row: &Row, column: &str) -> Vec<User> {
        related_nodes(row, column)
            .iter()
            .map(|node| self.users.convert_from_node(node))
            .collect()
    }
}

impl NodeConverter<Post> for PostConverter {
    fn convert_from_node(&self, node: &Node) -> Post {
        self.base.convert_from_node(node)
    }

    fn convert_from_record(&self, row: &Row, alias: &str) -> Result<Post, AppError> {
        let mut post = self.base.convert_from_record(row, alias)?;
        post.liked_by = self.users(row, "liked_by_collection");
        post.disliked_by = self.users(row, "disliked_by_collection");
        Ok(post)
    }

    fn convert_to_properties(&self, post: &Post) -> Map<String, JsonValue> {
        self.base.convert_to_properties(post)
    }
}
