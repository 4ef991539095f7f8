//! Record model: ids, type codes, typed field values and schema inverses.

mod record;
mod schema;
mod types;

pub use record::{Fields, Record, Value};
pub use schema::{inverse_attributes, InverseAttribute, SchemaVersion};
pub use types::{Category, TypeCode};

use serde::{Deserialize, Serialize};

/// Record id, unique within a model.
pub type ExpressId = u32;

/// Handle of a loaded model inside a store.
pub type ModelId = u32;

/// Whole-model interchange: schema name plus every stored record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDump {
    pub schema: String,
    pub records: Vec<Record>,
}

impl ModelDump {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
