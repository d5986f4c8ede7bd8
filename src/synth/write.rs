//! Node read-by-key and write statements.

use serde_json::{Map, Value as JsonValue};

use crate::error::AppError;
use crate::synth::{validate_identifier, Statement};

/// Creation timestamp assigned by the server.
const NOW: &str = "toString(datetime())";

pub fn build_create(label: &str, properties: Map<String, JsonValue>) -> Result<Statement, AppError> {
    validate_identifier("label", label)?;
    Ok(Statement::new(format!(
        "CREATE (n:{} $properties)\nSET n.created_at = {}\nRETURN n",
        label, NOW
    ))
    .param("properties", properties))
}

pub fn build_get_by_id(label: &str, id: &str) -> Result<Statement, AppError> {
    validate_identifier("label", label)?;
    Ok(Statement::new(format!(
        "MATCH (n:{}) WHERE id(n) = toInteger($id) AND (n.deleted_at IS NULL)\nRETURN n",
        label
    ))
    .param("id", id))
}

/// Lookup by a stored property name; the first match wins.
pub fn build_get_by_field(
    label: &str,
    stored_name: &str,
    value: JsonValue,
) -> Result<Statement, AppError> {
    validate_identifier("label", label)?;
    validate_identifier("field", stored_name)?;
    Ok(Statement::new(format!(
        "MATCH (n:{}) WHERE n.{} = $field_value AND (n.deleted_at IS NULL)\nRETURN n\nLIMIT 1",
        label, stored_name
    ))
    .param("field_value", value))
}

/// Drops null and blank-string properties so a partial update never clears
/// stored values.
pub fn updatable_properties(properties: Map<String, JsonValue>) -> Map<String, JsonValue> {
    properties
        .into_iter()
        .filter(|(_, value)| match value {
            JsonValue::Null => false,
            JsonValue::String(s) => !s.trim().is_empty(),
            _ => true,
        })
        .collect()
}

pub fn build_update(
    label: &str,
    id: &str,
    properties: Map<String, JsonValue>,
) -> Result<Statement, AppError> {
    validate_identifier("label", label)?;
    Ok(Statement::new(format!(
        "MATCH (n:{}) WHERE id(n) = toInteger($id)\nSET n += $properties, n.updated_at = {}\nRETURN n",
        label, NOW
    ))
    .param("id", id)
    .param("properties", updatable_properties(properties)))
}

/// Marks the node deleted and returns its identifier as `id`.
pub fn build_soft_delete(label: &str, id: &str) -> Result<Statement, AppError> {
    validate_identifier("label", label)?;
    Ok(Statement::new(format!(
        "MATCH (n:{}) WHERE id(n) = toInteger($id)\nSET n.deleted_at = {}\nRETURN toString(id(n)) AS id",
        label, NOW
    ))
    .param("id", id))
}

/// Removes the node and its relationships; returns `deleted_count`.
pub fn build_detach_delete(label: &str, id: &str) -> Result<Statement, AppError> {
    validate_identifier("label", label)?;
    Ok(Statement::new(format!(
        "MATCH (n:{}) WHERE id(n) = toInteger($id)\nDETACH DELETE n\nRETURN count(n) AS deleted_count",
        label
    ))
    .param("id", id))
}
