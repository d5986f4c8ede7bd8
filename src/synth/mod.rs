//! Cypher statement synthesis.
//!
//! Builders in this module turn an [`EntitySchema`](crate::schema::EntitySchema)
//! plus a request (search model, property map, identifiers) into a
//! [`Statement`]: query text and its parameter bindings. Values always travel
//! as parameters; only labels, relationship types and property names are
//! spliced into the text, and those are validated as identifiers first.
//!
//! Node identity is the store's numeric node id. Callers pass it as a decimal
//! string; statements compare `id(x) = toInteger($param)` so the planner can
//! seek by id. An id that is not a number matches nothing.

mod relationship;
mod search;
mod write;

pub use relationship::{
    build_create_relationship, build_get_related, build_get_relationships,
    build_sync_relationships, RelationshipDelta,
};
pub use search::{
    build_count, build_search, build_text_search, Filter, FilterValue, SearchModel, SearchResult,
};
pub use write::{
    build_create, build_detach_delete, build_get_by_field, build_get_by_id, build_soft_delete,
    build_update, updatable_properties,
};

pub use crate::graph::Statement;

use crate::error::AppError;
use crate::schema::Direction;

/// Rejects anything but `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_identifier(what: &str, value: &str) -> Result<(), AppError> {
    let mut chars = value.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidArgument(format!(
            "invalid {} '{}': expected letters, digits and underscores",
            what, value
        )))
    }
}

/// Validated `A|B|C` alternation of relationship types.
pub(crate) fn type_alternation(types: &[String]) -> Result<String, AppError> {
    if types.is_empty() {
        return Err(AppError::InvalidArgument(
            "relationship field declares no relationship types".into(),
        ));
    }
    for rel_type in types {
        validate_identifier("relationship type", rel_type)?;
    }
    Ok(types.join("|"))
}

/// `(from)<arrow>[var:TYPES]<arrow>(to)` for the given direction.
pub(crate) fn rel_pattern(
    from: &str,
    rel_var: &str,
    types: &str,
    direction: Direction,
    to: &str,
) -> String {
    let (left, right) = direction.arrows();
    format!("({}){}[{}:{}]{}({})", from, left, rel_var, types, right, to)
}

/// `var:Label`, or just `var` when no label is declared.
pub(crate) fn node_pattern(var: &str, label: Option<&str>) -> Result<String, AppError> {
    match label {
        Some(label) if !label.is_empty() => {
            validate_identifier("label", label)?;
            Ok(format!("{}:{}", var, label))
        }
        _ => Ok(var.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("label", "Post").is_ok());
        assert!(validate_identifier("field", "created_at").is_ok());
        assert!(validate_identifier("field", "_x1").is_ok());
        assert!(validate_identifier("field", "").is_err());
        assert!(validate_identifier("field", "1abc").is_err());
        assert!(validate_identifier("label", "Post) DETACH DELETE (m").is_err());
    }

    #[test]
    fn test_rel_pattern_directions() {
        assert_eq!(
            rel_pattern("n", "", "LIKE", Direction::Incoming, "u:User"),
            "(n)<-[:LIKE]-(u:User)"
        );
        assert_eq!(
            rel_pattern("source", "r", "A|B", Direction::Outgoing, "target"),
            "(source)-[r:A|B]->(target)"
        );
        assert_eq!(
            rel_pattern("a", "r", "KNOWS", Direction::Both, "b"),
            "(a)-[r:KNOWS]-(b)"
        );
    }

    #[test]
    fn test_type_alternation() {
        assert_eq!(
            type_alternation(&["LIKE".into(), "LOVE".into()]).unwrap(),
            "LIKE|LOVE"
        );
        assert!(type_alternation(&[]).is_err());
        assert!(type_alternation(&["BAD TYPE".into()]).is_err());
    }

    #[test]
    fn test_node_pattern_without_label() {
        assert_eq!(node_pattern("target", None).unwrap(), "target");
        assert_eq!(node_pattern("target", Some("User")).unwrap(), "target:User");
    }
}
