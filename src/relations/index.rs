//! Adjacency index from relating id to related ids.

use std::collections::HashMap;

use super::{fetch_records, RelationKind, ResolverOptions};
use crate::error::{IfcGraphError, Result};
use crate::model::{ExpressId, ModelId, Value};
use crate::store::RecordStore;

/// Relating id → related ids, compiled from one or more relation kinds.
///
/// Buckets keep store order within a kind and kind order across kinds. The
/// same member can appear twice when two relation records list it. There is
/// no way to mutate an index once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationIndex {
    buckets: HashMap<ExpressId, Vec<ExpressId>>,
}

impl RelationIndex {
    /// Scan every relation record of `kinds`, in the given order.
    ///
    /// # Errors
    ///
    /// `SchemaViolation` when a relation record lacks a single-reference
    /// relating field.
    pub async fn build<S: RecordStore + ?Sized>(
        store: &S,
        model_id: ModelId,
        kinds: &[RelationKind],
        options: &ResolverOptions,
    ) -> Result<Self> {
        let mut buckets: HashMap<ExpressId, Vec<ExpressId>> = HashMap::new();

        for kind in kinds {
            let ids = store
                .get_record_ids_of_type(model_id, kind.type_code(), true)
                .await?;
            let count = ids.len();
            let relations = fetch_records(store, model_id, ids, false, false, options).await?;

            for relation in relations {
                let relating = relation
                    .field(kind.relating_field())
                    .and_then(Value::as_ref_id)
                    .ok_or_else(|| {
                        IfcGraphError::schema_violation(format!(
                            "{} #{} has no {} reference",
                            kind,
                            relation.id,
                            kind.relating_field()
                        ))
                    })?;
                let related = relation.ref_ids(kind.related_field());
                buckets.entry(relating).or_default().extend(related);
            }

            log::debug!("Indexed {} {} records in model {}", count, kind, model_id);
        }

        Ok(Self { buckets })
    }

    /// Related ids recorded for `relating`, `None` for a leaf.
    pub fn children(&self, relating: ExpressId) -> Option<&[ExpressId]> {
        self.buckets.get(&relating).map(Vec::as_slice)
    }

    pub fn contains(&self, relating: ExpressId) -> bool {
        self.buckets.contains_key(&relating)
    }

    /// Number of distinct relating ids.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ExpressId, &[ExpressId])> {
        self.buckets.iter().map(|(k, v)| (*k, v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Record, TypeCode};
    use crate::store::MemoryStore;
    use crate::testing::{relation, site_wall_model};

    async fn build(store: &MemoryStore, model: ModelId) -> Result<RelationIndex> {
        RelationIndex::build(store, model, &RelationKind::SPATIAL, &ResolverOptions::default()).await
    }

    #[tokio::test]
    async fn test_project_site_wall_index() {
        let (store, model) = site_wall_model().await;
        let index = build(&store, model).await.unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.children(1), Some(&[2][..]));
        assert_eq!(index.children(2), Some(&[3][..]));
        assert_eq!(index.children(3), None);
    }

    #[tokio::test]
    async fn test_disjoint_kinds_do_not_mix() {
        let store = MemoryStore::new();
        let model = store.create_model("IFC4").await;
        store.insert(model, relation(50, RelationKind::Aggregates, 1, &[2, 3])).await.unwrap();
        store
            .insert(model, relation(51, RelationKind::SpatialContainment, 4, &[5]))
            .await
            .unwrap();

        let index = build(&store, model).await.unwrap();
        assert_eq!(index.children(1), Some(&[2, 3][..]));
        assert_eq!(index.children(4), Some(&[5][..]));
        assert_eq!(index.len(), 2);
    }

    #[tokio::test]
    async fn test_shared_relating_id_concatenates_in_kind_order() {
        let store = MemoryStore::new();
        let model = store.create_model("IFC4").await;
        // containment record has the lower id, aggregation still comes first
        store
            .insert(model, relation(40, RelationKind::SpatialContainment, 2, &[7, 8]))
            .await
            .unwrap();
        store.insert(model, relation(60, RelationKind::Aggregates, 2, &[5])).await.unwrap();
        store.insert(model, relation(61, RelationKind::Aggregates, 2, &[6, 7])).await.unwrap();

        let index = build(&store, model).await.unwrap();
        assert_eq!(index.children(2), Some(&[5, 6, 7, 7, 8][..]));
    }

    #[tokio::test]
    async fn test_bare_related_reference_is_normalized() {
        let store = MemoryStore::new();
        let model = store.create_model("IFC4").await;
        store
            .insert(
                model,
                Record::new(70, TypeCode::REL_AGGREGATES)
                    .with_field("RelatingObject", Value::Ref(1))
                    .with_field("RelatedObjects", Value::Ref(2)),
            )
            .await
            .unwrap();

        let index = build(&store, model).await.unwrap();
        assert_eq!(index.children(1), Some(&[2][..]));
    }

    #[tokio::test]
    async fn test_missing_relating_field_is_schema_violation() {
        let store = MemoryStore::new();
        let model = store.create_model("IFC4").await;
        store
            .insert(
                model,
                Record::new(70, TypeCode::REL_AGGREGATES).with_field("RelatedObjects", Value::refs([2])),
            )
            .await
            .unwrap();

        let err = build(&store, model).await.unwrap_err();
        assert!(matches!(err, IfcGraphError::SchemaViolation(_)));
    }

    #[tokio::test]
    async fn test_empty_model_gives_empty_index() {
        let store = MemoryStore::new();
        let model = store.create_model("IFC2X3").await;
        let index = build(&store, model).await.unwrap();
        assert!(index.is_empty());
    }
}
