//! Shared fixtures for unit tests.

use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Result;
use crate::model::{ExpressId, ModelDump, ModelId, Record, TypeCode, Value};
use crate::relations::RelationKind;
use crate::store::{MemoryStore, RecordStore};

/// Relation record of `kind` linking `relating` to `related`.
pub fn relation(id: ExpressId, kind: RelationKind, relating: ExpressId, related: &[ExpressId]) -> Record {
    Record::new(id, kind.type_code())
        .with_field(kind.relating_field(), Value::Ref(relating))
        .with_field(kind.related_field(), Value::refs(related.iter().copied()))
}

fn named(id: ExpressId, type_code: TypeCode, name: &str) -> Record {
    Record::new(id, type_code).with_field("Name", Value::String(name.to_string()))
}

/// Project #1 aggregates Site #2, which contains Wall #3.
pub async fn site_wall_model() -> (MemoryStore, ModelId) {
    let store = MemoryStore::new();
    let model = store.create_model("IFC4").await;
    for record in [
        named(1, TypeCode::PROJECT, "Project"),
        named(2, TypeCode::SITE, "Site"),
        named(3, TypeCode::WALL, "Wall"),
        relation(10, RelationKind::Aggregates, 1, &[2]),
        relation(11, RelationKind::SpatialContainment, 2, &[3]),
    ] {
        store.insert(model, record).await.unwrap();
    }
    (store, model)
}

/// Wall #3 and slab #4 with property sets, a type and a material.
///
/// - #20 pset #30 → [#3], #21 pset #32 → [#3], #22 pset #32 → [#4]
/// - #25 type #50 → [#3]
/// - #26 material #40 → [#3]; material #41 has no relation
pub async fn typed_wall_model(schema: &str) -> (MemoryStore, ModelId) {
    let store = MemoryStore::new();
    let model = store.create_model(schema).await;
    for record in [
        named(1, TypeCode::PROJECT, "Project"),
        named(3, TypeCode::WALL, "Wall-01"),
        named(4, TypeCode::SLAB, "Slab-01"),
        relation(20, RelationKind::PropertySets, 30, &[3]),
        relation(21, RelationKind::PropertySets, 32, &[3]),
        relation(22, RelationKind::PropertySets, 32, &[4]),
        relation(25, RelationKind::type_assignment(schema), 50, &[3]),
        relation(26, RelationKind::Materials, 40, &[3]),
        named(30, TypeCode::PROPERTY_SET, "Pset_WallCommon").with_field("HasProperties", Value::refs([31])),
        named(31, TypeCode::PROPERTY_SINGLE_VALUE, "IsExternal")
            .with_field("NominalValue", Value::Boolean(true)),
        named(32, TypeCode::PROPERTY_SET, "Pset_Custom").with_field("HasProperties", Value::refs([])),
        named(40, TypeCode::MATERIAL, "Concrete"),
        named(41, TypeCode::MATERIAL, "Steel"),
        named(50, TypeCode::WALL_TYPE, "Basic Wall"),
    ] {
        store.insert(model, record).await.unwrap();
    }
    (store, model)
}

/// IFC4 dump: wall #3 with pset #30 through #20.
pub fn wall_with_pset_dump() -> ModelDump {
    ModelDump {
        schema: "IFC4".to_string(),
        records: vec![
            named(3, TypeCode::WALL, "Wall-01"),
            relation(20, RelationKind::PropertySets, 30, &[3]),
            named(30, TypeCode::PROPERTY_SET, "Pset_WallCommon").with_field("HasProperties", Value::refs([31])),
            named(31, TypeCode::PROPERTY_SINGLE_VALUE, "IsExternal"),
        ],
    }
}

/// Store wrapper counting record reads and writes, and the most record
/// fetches ever in flight at once. Each fetch yields once before reaching
/// the inner store so concurrent callers overlap.
pub struct CountingStore<S> {
    inner: S,
    reads: AtomicUsize,
    writes: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn gauged<T>(&self, fetch: impl Future<Output = T>) -> T {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let out = fetch.await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        out
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for CountingStore<S> {
    async fn get_record(
        &self,
        model_id: ModelId,
        id: ExpressId,
        recursive: bool,
        expand_inverse: bool,
    ) -> Result<Record> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.gauged(self.inner.get_record(model_id, id, recursive, expand_inverse))
            .await
    }

    async fn get_record_ids_of_type(
        &self,
        model_id: ModelId,
        type_code: TypeCode,
        include_subtypes: bool,
    ) -> Result<Vec<ExpressId>> {
        self.inner
            .get_record_ids_of_type(model_id, type_code, include_subtypes)
            .await
    }

    async fn get_record_type_code(&self, model_id: ModelId, id: ExpressId) -> Result<TypeCode> {
        self.gauged(self.inner.get_record_type_code(model_id, id)).await
    }

    async fn get_schema_version(&self, model_id: ModelId) -> Result<String> {
        self.inner.get_schema_version(model_id).await
    }

    async fn write_record(&self, model_id: ModelId, record: Record) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_record(model_id, record).await
    }
}
