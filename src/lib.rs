pub mod config;
pub mod error;
pub mod db;
pub mod model;
pub mod store;
pub mod relations;
pub mod properties;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{IfcGraphError, Result};
pub use model::{ExpressId, ModelDump, ModelId, Record, SchemaVersion, TypeCode, Value};
pub use properties::Properties;
pub use relations::{RelationKind, ResolverOptions};
pub use store::{MemoryStore, RecordStore, SqliteStore};
