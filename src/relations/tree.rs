//! Spatial containment tree rooted at the project.
//!
//! The tree follows aggregation and spatial containment relations from the
//! single project record. Containment relations are assumed acyclic; a cycle
//! in the data makes the build recurse without end.
//!
//! Sibling subtrees are built concurrently at every level, so one semaphore
//! shared by the whole build caps the store fetches in flight.

use futures_util::future::BoxFuture;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use tokio::sync::Semaphore;

use super::{RelationIndex, RelationKind, ResolverOptions};
use crate::error::{IfcGraphError, Result};
use crate::model::{ExpressId, Fields, ModelId, TypeCode};
use crate::store::RecordStore;

/// Field names owned by the node itself; merged record fields never override them.
const STRUCTURAL_FIELDS: [&str; 3] = ["expressID", "type", "children"];

/// One node of the spatial tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpatialNode {
    #[serde(rename = "expressID")]
    pub express_id: ExpressId,
    #[serde(rename = "type")]
    pub type_name: String,
    pub children: Vec<SpatialNode>,
    /// Record fields merged in when properties were requested.
    #[serde(flatten)]
    pub properties: Fields,
}

impl SpatialNode {
    fn new(express_id: ExpressId, type_code: TypeCode) -> Self {
        Self {
            express_id,
            type_name: type_code.name().to_string(),
            children: Vec::new(),
            properties: Fields::new(),
        }
    }

    /// Ids of this node and every descendant, pre-order.
    pub fn ids(&self) -> Vec<ExpressId> {
        let mut ids = vec![self.express_id];
        for child in &self.children {
            ids.extend(child.ids());
        }
        ids
    }

    pub fn find(&self, id: ExpressId) -> Option<&SpatialNode> {
        if self.express_id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Build the containment tree of a model.
///
/// # Errors
///
/// `SchemaViolation` unless exactly one project record exists; any store
/// failure aborts the build.
pub async fn build_spatial_tree<S: RecordStore + ?Sized>(
    store: &S,
    model_id: ModelId,
    include_properties: bool,
    options: &ResolverOptions,
) -> Result<SpatialNode> {
    let index = RelationIndex::build(store, model_id, &RelationKind::SPATIAL, options).await?;

    let roots = store
        .get_record_ids_of_type(model_id, TypeCode::PROJECT, false)
        .await?;
    let root_id = match roots.as_slice() {
        [id] => *id,
        _ => {
            return Err(IfcGraphError::schema_violation(format!(
                "expected exactly one IFCPROJECT in model {}, found {}",
                model_id,
                roots.len()
            )))
        }
    };

    let limiter = Semaphore::new(options.fetch_concurrency.max(1));
    let build = Build {
        store,
        model_id,
        index: &index,
        include_properties,
        limiter: &limiter,
        fan_out: options.fetch_concurrency.max(1),
    };
    let mut root = SpatialNode::new(root_id, TypeCode::PROJECT);
    root.children = build_children(build, root_id).await?;

    log::debug!(
        "Built spatial tree for model {} ({} relating ids indexed)",
        model_id,
        index.len()
    );
    Ok(root)
}

/// State shared by every level of one tree build.
struct Build<'a, S: ?Sized> {
    store: &'a S,
    model_id: ModelId,
    index: &'a RelationIndex,
    include_properties: bool,
    limiter: &'a Semaphore,
    fan_out: usize,
}

impl<S: ?Sized> Clone for Build<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized> Copy for Build<'_, S> {}

fn build_children<'a, S: RecordStore + ?Sized>(
    build: Build<'a, S>,
    parent: ExpressId,
) -> BoxFuture<'a, Result<Vec<SpatialNode>>> {
    Box::pin(async move {
        let Some(child_ids) = build.index.children(parent) else {
            return Ok(Vec::new());
        };
        stream::iter(child_ids.to_vec().into_iter().map(move |id| build_node(build, id)))
            .buffered(build.fan_out)
            .try_collect()
            .await
    })
}

async fn build_node<S: RecordStore + ?Sized>(build: Build<'_, S>, id: ExpressId) -> Result<SpatialNode> {
    // the permit covers this node's fetches only, never its subtree
    let (type_code, record) = {
        let _permit = build.limiter.acquire().await.ok();
        let type_code = build.store.get_record_type_code(build.model_id, id).await?;
        let record = if build.include_properties {
            Some(build.store.get_record(build.model_id, id, false, false).await?)
        } else {
            None
        };
        (type_code, record)
    };

    let mut node = SpatialNode::new(id, type_code);
    if let Some(record) = record {
        node.properties = record
            .fields
            .into_iter()
            .filter(|(name, _)| !STRUCTURAL_FIELDS.contains(&name.as_str()))
            .collect();
    }

    node.children = build_children(build, id).await?;
    Ok(node)
}
