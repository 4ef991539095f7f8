use thiserror::Error;

use crate::model::{ExpressId, ModelId};

/// Main error type for ifcgraph
#[derive(Error, Debug)]
pub enum IfcGraphError {
    /// A requested record id does not exist in the model
    #[error("Record #{express_id} not found in model {model_id}")]
    NotFound {
        model_id: ModelId,
        express_id: ExpressId,
    },

    /// The model id is not known to the store
    #[error("Model not found: {0}")]
    ModelNotFound(ModelId),

    /// The record graph breaks a structural assumption (project roots, relation fields)
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// The store refused a write-back
    #[error("Write of record #{express_id} in model {model_id} failed: {reason}")]
    WriteFailed {
        model_id: ModelId,
        express_id: ExpressId,
        reason: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON encoding of records or dumps
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IfcGraphError {
    pub fn not_found(model_id: ModelId, express_id: ExpressId) -> Self {
        Self::NotFound {
            model_id,
            express_id,
        }
    }

    pub fn schema_violation(msg: impl Into<String>) -> Self {
        Self::SchemaViolation(msg.into())
    }

    pub fn write_failed(model_id: ModelId, express_id: ExpressId, reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            model_id,
            express_id,
            reason: reason.into(),
        }
    }
}

/// Convenient Result type using IfcGraphError
pub type Result<T> = std::result::Result<T, IfcGraphError>;
