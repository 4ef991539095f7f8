//! RecordStore Trait - the record store boundary consumed by the resolver
//!
//! The resolver never owns records: every lookup returns a transient copy and
//! every mutation is persisted through `write_record`. Two backends live here:
//!
//! - [`MemoryStore`] keeps models in process memory (tests, demos)
//! - [`SqliteStore`] persists models in SQLite through [`crate::db::Db`]
//!
//! # Shared semantics
//!
//! - Ids of a type come back in ascending express-id order.
//! - `recursive` replaces every reference in direct fields with the fully
//!   expanded referenced record.
//! - `expand_inverse` appends each inverse attribute that applies to the
//!   record's type as a list of relation-record references, ordered by id.
//!   The attribute is present even when nothing points at the record.
//! - Inverse attributes are derived: writes strip them and collapse expanded
//!   records back to references before persisting.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::model::{inverse_attributes, ExpressId, ModelId, Record, SchemaVersion, TypeCode, Value};

/// Abstraction over the record store holding every model.
///
/// Implementations must be `Send + Sync`; every call is a suspension point
/// and may be dispatched concurrently for reads. Writes are not coordinated
/// by the store, callers serialize mutations per model.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch one record.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id is absent, `ModelNotFound` for unknown models.
    async fn get_record(
        &self,
        model_id: ModelId,
        id: ExpressId,
        recursive: bool,
        expand_inverse: bool,
    ) -> Result<Record>;

    /// Ids of every record of `type_code`, in store order.
    async fn get_record_ids_of_type(
        &self,
        model_id: ModelId,
        type_code: TypeCode,
        include_subtypes: bool,
    ) -> Result<Vec<ExpressId>>;

    async fn get_record_type_code(&self, model_id: ModelId, id: ExpressId) -> Result<TypeCode>;

    /// Schema name the model was authored in (`"IFC2X3"`, `"IFC4"`, ...).
    async fn get_schema_version(&self, model_id: ModelId) -> Result<String>;

    /// Persist a record, replacing any stored record with the same id.
    async fn write_record(&self, model_id: ModelId, record: Record) -> Result<()>;
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    async fn get_record(
        &self,
        model_id: ModelId,
        id: ExpressId,
        recursive: bool,
        expand_inverse: bool,
    ) -> Result<Record> {
        (**self).get_record(model_id, id, recursive, expand_inverse).await
    }

    async fn get_record_ids_of_type(
        &self,
        model_id: ModelId,
        type_code: TypeCode,
        include_subtypes: bool,
    ) -> Result<Vec<ExpressId>> {
        (**self)
            .get_record_ids_of_type(model_id, type_code, include_subtypes)
            .await
    }

    async fn get_record_type_code(&self, model_id: ModelId, id: ExpressId) -> Result<TypeCode> {
        (**self).get_record_type_code(model_id, id).await
    }

    async fn get_schema_version(&self, model_id: ModelId) -> Result<String> {
        (**self).get_schema_version(model_id).await
    }

    async fn write_record(&self, model_id: ModelId, record: Record) -> Result<()> {
        (**self).write_record(model_id, record).await
    }
}

/// Replace every reference inside `value` with the expanded record from `lookup`.
pub(crate) fn expand_references<F>(value: &mut Value, lookup: &mut F) -> Result<()>
where
    F: FnMut(ExpressId) -> Result<Record>,
{
    match value {
        Value::Ref(id) => {
            let mut nested = lookup(*id)?;
            for field in nested.fields.values_mut() {
                expand_references(field, lookup)?;
            }
            *value = Value::Record(Box::new(nested));
        }
        Value::List(items) => {
            for item in items {
                expand_references(item, lookup)?;
            }
        }
        Value::Record(nested) => {
            for field in nested.fields.values_mut() {
                expand_references(field, lookup)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Canonical stored form: no inverse attributes, no expanded records.
pub(crate) fn to_stored_form(mut record: Record, schema: SchemaVersion) -> Record {
    for attr in inverse_attributes(record.type_code, schema) {
        record.fields.remove(attr.name);
    }
    for field in record.fields.values_mut() {
        collapse_references(field);
    }
    record
}

fn collapse_references(value: &mut Value) {
    match value {
        Value::Record(nested) => *value = Value::Ref(nested.id),
        Value::List(items) => items.iter_mut().for_each(collapse_references),
        _ => {}
    }
}
