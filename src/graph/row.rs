//! Result rows and the graph values they carry.

use std::collections::HashMap;
use std::pin::Pin;

use futures::Stream;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::AppError;

/// Named statement parameters, referenced in Cypher as `$name`.
pub type Params = HashMap<String, JsonValue>;

/// Rows pulled lazily from the driver.
pub type RowStream<'a> = Pin<Box<dyn Stream<Item = Result<Row, AppError>> + Send + 'a>>;

fn decode<T: DeserializeOwned>(what: &str, key: &str, value: &JsonValue) -> Result<T, AppError> {
    serde_json::from_value(value.clone())
        .map_err(|e| AppError::Internal(format!("failed to deserialize {} '{}': {}", what, key, e)))
}

/// One result record, keyed by RETURN column.
///
/// Graph-valued columns hold the JSON shape of [`Node`] or [`Relationship`],
/// so `row.get::<Node>("n")` decodes a node directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: HashMap<String, JsonValue>,
}

impl Row {
    pub fn new(columns: HashMap<String, JsonValue>) -> Self {
        Self { columns }
    }

    /// Decodes a required column.
    ///
    /// # Errors
    ///
    /// [`AppError::MissingColumn`] when the statement did not return `key`;
    /// [`AppError::Internal`] when the value does not decode as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, AppError> {
        let value = self
            .columns
            .get(key)
            .ok_or_else(|| AppError::MissingColumn(key.to_string()))?;
        decode("column", key, value)
    }

    /// Decodes an optional column. Absent and null are both `None`; a value
    /// of the wrong shape is still an error.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        match self.columns.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(value) => decode("column", key, value).map(Some),
        }
    }

    pub fn get_raw(&self, key: &str) -> Option<&JsonValue> {
        self.columns.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.columns.contains_key(key)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn into_inner(self) -> HashMap<String, JsonValue> {
        self.columns
    }
}

impl From<HashMap<String, JsonValue>> for Row {
    fn from(columns: HashMap<String, JsonValue>) -> Self {
        Self::new(columns)
    }
}

/// A graph node as returned in a row column.
///
/// The identifier is opaque and assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: Map<String, JsonValue>,
}

impl Node {
    /// Creates a node with the given identifier and property bag.
    pub fn new(id: impl Into<String>, properties: Map<String, JsonValue>) -> Self {
        Self {
            id: id.into(),
            labels: Vec::new(),
            properties,
        }
    }

    /// Adds a label, builder style.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Decodes a required property.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, AppError> {
        let value = self
            .properties
            .get(key)
            .ok_or_else(|| AppError::Internal(format!("property not found: {}", key)))?;
        decode("property", key, value)
    }

    /// Decodes an optional property; absent and null both map to `None`.
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        match self.properties.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(value) => decode("property", key, value).map(Some),
        }
    }

    /// Gets a property or falls back to `default` when absent or not convertible.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_opt(key).ok().flatten().unwrap_or(default)
    }

    /// Returns the raw property value.
    pub fn property(&self, key: &str) -> Option<&JsonValue> {
        self.properties.get(key)
    }

    /// Returns true if the node carries the label.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// A relationship as returned in a row column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub start_id: String,
    pub end_id: String,
    #[serde(default)]
    pub properties: Map<String, JsonValue>,
}
