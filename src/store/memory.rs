//! In-process record store.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::RwLock;

use super::{expand_references, to_stored_form, RecordStore};
use crate::error::{IfcGraphError, Result};
use crate::model::{
    inverse_attributes, ExpressId, ModelDump, ModelId, Record, SchemaVersion, TypeCode, Value,
};

struct MemoryModel {
    schema: String,
    records: BTreeMap<ExpressId, Record>,
}

impl MemoryModel {
    fn schema_version(&self) -> SchemaVersion {
        SchemaVersion::from_schema_name(&self.schema)
    }

    fn lookup(&self, model_id: ModelId, id: ExpressId) -> Result<&Record> {
        self.records
            .get(&id)
            .ok_or_else(|| IfcGraphError::not_found(model_id, id))
    }

    fn inverse_ids(&self, id: ExpressId, relation_types: &[TypeCode], via_field: &str) -> Vec<ExpressId> {
        self.records
            .values()
            .filter(|r| relation_types.contains(&r.type_code))
            .filter(|r| r.ref_ids(via_field).contains(&id))
            .map(|r| r.id)
            .collect()
    }
}

/// Thread-safe in-memory store holding any number of models.
pub struct MemoryStore {
    models: RwLock<HashMap<ModelId, MemoryModel>>,
    next_model_id: AtomicU32,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            models: RwLock::new(HashMap::new()),
            next_model_id: AtomicU32::new(0),
        }
    }

    /// Register an empty model authored in `schema` and return its id.
    pub async fn create_model(&self, schema: &str) -> ModelId {
        let model_id = self.next_model_id.fetch_add(1, Ordering::Relaxed);
        self.models.write().await.insert(
            model_id,
            MemoryModel {
                schema: schema.to_string(),
                records: BTreeMap::new(),
            },
        );
        model_id
    }

    /// Insert or replace a record without type checks.
    pub async fn insert(&self, model_id: ModelId, record: Record) -> Result<()> {
        let mut models = self.models.write().await;
        let model = models
            .get_mut(&model_id)
            .ok_or(IfcGraphError::ModelNotFound(model_id))?;
        let record = to_stored_form(record, model.schema_version());
        model.records.insert(record.id, record);
        Ok(())
    }

    pub async fn load_dump(&self, dump: ModelDump) -> Result<ModelId> {
        let model_id = self.create_model(&dump.schema).await;
        let count = dump.records.len();
        for record in dump.records {
            self.insert(model_id, record).await?;
        }
        log::debug!("Loaded {} records into memory model {}", count, model_id);
        Ok(model_id)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_record(
        &self,
        model_id: ModelId,
        id: ExpressId,
        recursive: bool,
        expand_inverse: bool,
    ) -> Result<Record> {
        let models = self.models.read().await;
        let model = models
            .get(&model_id)
            .ok_or(IfcGraphError::ModelNotFound(model_id))?;
        let mut record = model.lookup(model_id, id)?.clone();

        if recursive {
            let mut lookup = |ref_id: ExpressId| model.lookup(model_id, ref_id).cloned();
            for field in record.fields.values_mut() {
                expand_references(field, &mut lookup)?;
            }
        }

        if expand_inverse {
            for attr in inverse_attributes(record.type_code, model.schema_version()) {
                let ids = model.inverse_ids(id, attr.relation_types, attr.via_field);
                record.fields.insert(attr.name, Value::refs(ids));
            }
        }

        Ok(record)
    }

    async fn get_record_ids_of_type(
        &self,
        model_id: ModelId,
        type_code: TypeCode,
        include_subtypes: bool,
    ) -> Result<Vec<ExpressId>> {
        let models = self.models.read().await;
        let model = models
            .get(&model_id)
            .ok_or(IfcGraphError::ModelNotFound(model_id))?;
        Ok(model
            .records
            .values()
            .filter(|r| {
                r.type_code == type_code || (include_subtypes && r.type_code.is_subtype_of(type_code))
            })
            .map(|r| r.id)
            .collect())
    }

    async fn get_record_type_code(&self, model_id: ModelId, id: ExpressId) -> Result<TypeCode> {
        let models = self.models.read().await;
        let model = models
            .get(&model_id)
            .ok_or(IfcGraphError::ModelNotFound(model_id))?;
        Ok(model.lookup(model_id, id)?.type_code)
    }

    async fn get_schema_version(&self, model_id: ModelId) -> Result<String> {
        let models = self.models.read().await;
        models
            .get(&model_id)
            .map(|m| m.schema.clone())
            .ok_or(IfcGraphError::ModelNotFound(model_id))
    }

    async fn write_record(&self, model_id: ModelId, record: Record) -> Result<()> {
        let mut models = self.models.write().await;
        let model = models
            .get_mut(&model_id)
            .ok_or(IfcGraphError::ModelNotFound(model_id))?;

        if let Some(existing) = model.records.get(&record.id) {
            if existing.type_code != record.type_code {
                return Err(IfcGraphError::write_failed(
                    model_id,
                    record.id,
                    format!("stored as {}, written as {}", existing.type_code, record.type_code),
                ));
            }
        }

        let record = to_stored_form(record, model.schema_version());
        model.records.insert(record.id, record);
        Ok(())
    }
}
