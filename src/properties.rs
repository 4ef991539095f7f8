//! Model-facing facade over the relation resolver.
//!
//! `Properties` owns a shared store handle and the resolver options so
//! callers do not thread them through every query.

use std::sync::Arc;

use crate::error::Result;
use crate::model::{ExpressId, ModelId, Record, TypeCode};
use crate::relations::{
    associate, build_spatial_tree, resolve_related, IdSet, RelationKind, ResolverOptions, SpatialNode,
};
use crate::store::RecordStore;

pub struct Properties<S: RecordStore + ?Sized> {
    store: Arc<S>,
    options: ResolverOptions,
}

impl<S: RecordStore + ?Sized> Clone for Properties<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            options: self.options,
        }
    }
}

impl<S: RecordStore + ?Sized> Properties<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_options(store, ResolverOptions::default())
    }

    pub fn with_options(store: Arc<S>, options: ResolverOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// IFC entity name for a type code, `"UNKNOWN"` when not catalogued.
    pub fn get_ifc_type(&self, type_code: TypeCode) -> &'static str {
        type_code.name()
    }

    pub async fn get_item_properties(
        &self,
        model_id: ModelId,
        id: ExpressId,
        recursive: bool,
        inverse: bool,
    ) -> Result<Record> {
        self.store.get_record(model_id, id, recursive, inverse).await
    }

    /// Property sets of one element, or of the whole model when `element_id` is `None`.
    pub async fn get_property_sets(
        &self,
        model_id: ModelId,
        element_id: Option<ExpressId>,
        recursive: bool,
    ) -> Result<Vec<Record>> {
        self.related(model_id, RelationKind::PropertySets, element_id, recursive)
            .await
    }

    pub async fn set_property_sets(
        &self,
        model_id: ModelId,
        elements: impl Into<IdSet>,
        psets: impl Into<IdSet>,
    ) -> Result<bool> {
        associate(
            self.store.as_ref(),
            model_id,
            elements,
            psets,
            RelationKind::PropertySets,
            &self.options,
        )
        .await
    }

    /// Type objects assigned to an element. The inverse attribute followed
    /// depends on the model's schema.
    pub async fn get_type_properties(
        &self,
        model_id: ModelId,
        element_id: ExpressId,
        recursive: bool,
    ) -> Result<Vec<Record>> {
        let schema = self.store.get_schema_version(model_id).await?;
        self.related(model_id, RelationKind::type_assignment(&schema), Some(element_id), recursive)
            .await
    }

    pub async fn get_materials_properties(
        &self,
        model_id: ModelId,
        element_id: Option<ExpressId>,
        recursive: bool,
    ) -> Result<Vec<Record>> {
        self.related(model_id, RelationKind::Materials, element_id, recursive)
            .await
    }

    pub async fn set_materials_properties(
        &self,
        model_id: ModelId,
        elements: impl Into<IdSet>,
        materials: impl Into<IdSet>,
    ) -> Result<bool> {
        associate(
            self.store.as_ref(),
            model_id,
            elements,
            materials,
            RelationKind::Materials,
            &self.options,
        )
        .await
    }

    pub async fn get_spatial_structure(
        &self,
        model_id: ModelId,
        include_properties: bool,
    ) -> Result<SpatialNode> {
        build_spatial_tree(self.store.as_ref(), model_id, include_properties, &self.options).await
    }

    async fn related(
        &self,
        model_id: ModelId,
        kind: RelationKind,
        element_id: Option<ExpressId>,
        recursive: bool,
    ) -> Result<Vec<Record>> {
        resolve_related(self.store.as_ref(), model_id, kind, element_id, recursive, &self.options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IfcGraphError;
    use crate::model::Value;
    use crate::store::{MemoryStore, SqliteStore};
    use crate::testing::{site_wall_model, typed_wall_model, wall_with_pset_dump};
    use tempfile::TempDir;

    fn ids(records: &[Record]) -> Vec<ExpressId> {
        records.iter().map(|r| r.id).collect()
    }

    #[tokio::test]
    async fn test_type_properties_per_schema() {
        for schema in ["IFC2X3", "IFC4"] {
            let (store, model) = typed_wall_model(schema).await;
            let props = Properties::new(Arc::new(store));
            let types = props.get_type_properties(model, 3, false).await.unwrap();
            assert_eq!(ids(&types), vec![50], "schema {}", schema);
        }
    }

    #[tokio::test]
    async fn test_type_properties_unknown_model() {
        let props = Properties::new(Arc::new(MemoryStore::new()));
        let err = props.get_type_properties(42, 3, false).await.unwrap_err();
        assert!(matches!(err, IfcGraphError::ModelNotFound(42)));
    }

    #[tokio::test]
    async fn test_materials_round_trip() {
        let (store, model) = typed_wall_model("IFC4").await;
        let props = Properties::new(Arc::new(store));

        assert!(props.get_materials_properties(model, Some(4), false).await.unwrap().is_empty());
        assert!(props.set_materials_properties(model, 4, 40).await.unwrap());

        let materials = props.get_materials_properties(model, Some(4), false).await.unwrap();
        assert_eq!(ids(&materials), vec![40]);
        assert_eq!(
            materials[0].field("Name"),
            Some(&Value::String("Concrete".to_string()))
        );
    }

    #[tokio::test]
    async fn test_property_sets_global_and_element() {
        let (store, model) = typed_wall_model("IFC4").await;
        let props = Properties::with_options(Arc::new(store), ResolverOptions { fetch_concurrency: 2 });

        let all = props.get_property_sets(model, None, false).await.unwrap();
        assert_eq!(ids(&all), vec![30, 32, 32]);

        assert!(props.set_property_sets(model, vec![4], vec![30]).await.unwrap());
        let slab = props.get_property_sets(model, Some(4), false).await.unwrap();
        assert_eq!(ids(&slab), vec![30, 32]);
    }

    #[tokio::test]
    async fn test_spatial_structure_and_type_names() {
        let (store, model) = site_wall_model().await;
        let props = Properties::new(Arc::new(store));

        let tree = props.get_spatial_structure(model, true).await.unwrap();
        assert_eq!(tree.ids(), vec![1, 2, 3]);
        assert_eq!(props.get_ifc_type(TypeCode::SITE), "IFCSITE");
        assert_eq!(props.get_ifc_type(TypeCode(7)), "UNKNOWN");

        let wall = props.get_item_properties(model, 3, false, true).await.unwrap();
        assert_eq!(wall.ref_ids("ContainedInStructure"), vec![11]);
    }

    #[tokio::test]
    async fn test_facade_over_sqlite() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::open(temp_dir.path().join("models.db")).await.unwrap();
        let model = store.import_dump(wall_with_pset_dump()).await.unwrap();
        store.write_record(model, Record::new(5, TypeCode::COLUMN)).await.unwrap();
        let props = Properties::new(Arc::new(store));

        let psets = props.get_property_sets(model, Some(3), true).await.unwrap();
        assert_eq!(ids(&psets), vec![30]);
        let Some(Value::List(items)) = psets[0].field("HasProperties") else {
            panic!("expected list")
        };
        assert!(matches!(&items[0], Value::Record(p) if p.id == 31));

        assert!(props.get_property_sets(model, Some(5), false).await.unwrap().is_empty());
        assert!(props.set_property_sets(model, 5, 30).await.unwrap());

        let column = props.get_property_sets(model, Some(5), false).await.unwrap();
        assert_eq!(ids(&column), vec![30]);
        let rel = props.get_item_properties(model, 20, false, false).await.unwrap();
        assert_eq!(rel.ref_ids("RelatedObjects"), vec![3, 5]);
        let column = props.get_item_properties(model, 5, false, true).await.unwrap();
        assert_eq!(column.ref_ids("IsDefinedBy"), vec![20]);
    }
}
