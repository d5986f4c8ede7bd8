//! Application error types.

use thiserror::Error;

/// Application-level errors for graphmap.
#[derive(Error, Debug)]
pub enum AppError {
    // Neo4j errors
    #[error("Neo4j connection error: {0}")]
    Connection(#[from] neo4rs::Error),

    #[error("Neo4j query error: {message}")]
    Query { message: String, query: String },

    // Argument errors
    #[error("Row does not contain column '{0}'")]
    MissingColumn(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Conversion errors (recovered per field by the converter)
    #[error("Cannot convert field '{field}': {message}")]
    Conversion { field: String, message: String },

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds a conversion error for a named field.
    pub fn conversion(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conversion {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true for errors reported by the database driver.
    pub fn is_execution_error(&self) -> bool {
        matches!(self, AppError::Connection(_) | AppError::Query { .. })
    }
}
