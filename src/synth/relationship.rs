//! Relationship statements and set reconciliation.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::schema::Direction;
use crate::synth::{node_pattern, rel_pattern, validate_identifier, Statement};

/// Idempotently merges one edge between two nodes; returns `r`.
pub fn build_create_relationship(
    source_id: &str,
    rel_type: &str,
    target_id: &str,
    direction: Direction,
) -> Result<Statement, AppError> {
    validate_identifier("relationship type", rel_type)?;
    let cypher = [
        "MATCH (source) WHERE id(source) = toInteger($source_id)".to_string(),
        "MATCH (target) WHERE id(target) = toInteger($target_id)".to_string(),
        format!(
            "MERGE {}",
            rel_pattern("source", "r", rel_type, direction, "target")
        ),
        "RETURN r".to_string(),
    ]
    .join("\n");

    Ok(Statement::new(cypher)
        .param("source_id", source_id)
        .param("target_id", target_id))
}

/// Reconciles the source's `rel_type` edges to exactly `target_ids`.
///
/// One statement: edges to targets outside the desired set are deleted, then
/// an edge to every resolvable desired target is merged. Unknown target ids
/// contribute nothing. Returns `synced_count`, the number of targets merged.
pub fn build_sync_relationships(
    source_id: &str,
    rel_type: &str,
    target_ids: &[String],
    direction: Direction,
) -> Result<Statement, AppError> {
    validate_identifier("relationship type", rel_type)?;
    let desired: Vec<JsonValue> = target_ids
        .iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|id| JsonValue::from(id.as_str()))
        .collect();

    let cypher = [
        "MATCH (source) WHERE id(source) = toInteger($source_id)".to_string(),
        format!(
            "OPTIONAL MATCH {}",
            rel_pattern("source", "old", rel_type, direction, "old_target")
        ),
        "WHERE NOT toString(id(old_target)) IN $target_ids".to_string(),
        "DELETE old".to_string(),
        "WITH DISTINCT source".to_string(),
        "UNWIND $target_ids AS target_id".to_string(),
        "MATCH (target) WHERE id(target) = toInteger(target_id)".to_string(),
        format!(
            "MERGE {}",
            rel_pattern("source", "r", rel_type, direction, "target")
        ),
        "RETURN count(DISTINCT target) AS synced_count".to_string(),
    ]
    .join("\n");

    Ok(Statement::new(cypher)
        .param("source_id", source_id)
        .param("target_ids", JsonValue::Array(desired)))
}

/// Related nodes of `source_label` node `id`, newest first, as `target`.
pub fn build_get_related(
    source_label: &str,
    id: &str,
    rel_type: &str,
    direction: Direction,
    target_label: Option<&str>,
) -> Result<Statement, AppError> {
    validate_identifier("label", source_label)?;
    validate_identifier("relationship type", rel_type)?;
    let target = node_pattern("target", target_label)?;

    let cypher = [
        format!(
            "MATCH (source:{}) WHERE id(source) = toInteger($id)",
            source_label
        ),
        format!(
            "MATCH {}",
            rel_pattern("source", "", rel_type, direction, &target)
        ),
        "RETURN target".to_string(),
        "ORDER BY target.created_at DESC".to_string(),
    ]
    .join("\n");

    Ok(Statement::new(cypher).param("id", id))
}

/// Raw relationship rows `r, source, target` for node `id`.
pub fn build_get_relationships(
    source_label: &str,
    id: &str,
    rel_type: &str,
    direction: Direction,
) -> Result<Statement, AppError> {
    validate_identifier("label", source_label)?;
    validate_identifier("relationship type", rel_type)?;

    let cypher = [
        format!(
            "MATCH (source:{}) WHERE id(source) = toInteger($id)",
            source_label
        ),
        format!(
            "MATCH {}",
            rel_pattern("source", "r", rel_type, direction, "target")
        ),
        "RETURN r, source, target".to_string(),
        "ORDER BY r.created_at DESC".to_string(),
    ]
    .join("\n");

    Ok(Statement::new(cypher).param("id", id))
}

/// Edges to drop and to add when moving from `current` to `desired` targets.
///
/// This is the reconciliation the sync statement performs server side;
/// computing it locally previews a sync without writing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelationshipDelta {
    pub to_remove: BTreeSet<String>,
    pub to_add: BTreeSet<String>,
}

impl RelationshipDelta {
    pub fn compute<'a, C, D>(current: C, desired: D) -> Self
    where
        C: IntoIterator<Item = &'a String>,
        D: IntoIterator<Item = &'a String>,
    {
        let current: BTreeSet<&String> = current.into_iter().collect();
        let desired: BTreeSet<&String> = desired.into_iter().collect();

        Self {
            to_remove: current.difference(&desired).map(|s| s.to_string()).collect(),
            to_add: desired.difference(&current).map(|s| s.to_string()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }

    /// Applies the delta to a target set.
    pub fn apply(&self, current: &mut BTreeSet<String>) {
        for id in &self.to_remove {
            current.remove(id);
        }
        current.extend(self.to_add.iter().cloned());
    }
}
