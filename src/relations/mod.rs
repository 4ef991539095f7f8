//! Relationship graph resolver.
//!
//! Relation records connect a single "relating" owner or definition to one or
//! many "related" members. This module compiles them into an adjacency index,
//! rebuilds the spatial containment tree, resolves definitions attached to
//! elements and appends new associations.
//!
//! Every call rebuilds what it needs from the store; nothing is cached across
//! calls. Fetches fan out with bounded concurrency but results are always
//! reassembled in input order.

mod index;
mod mutator;
mod resolver;
mod tree;

pub use index::RelationIndex;
pub use mutator::{associate, IdSet};
pub use resolver::resolve_related;
pub use tree::{build_spatial_tree, SpatialNode};

use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::fmt;

use crate::config::Config;
use crate::error::Result;
use crate::model::{ExpressId, ModelId, Record, SchemaVersion, TypeCode};
use crate::store::RecordStore;

/// The relation kinds the resolver understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Whole/part decomposition (`IfcRelAggregates`).
    Aggregates,
    /// Elements placed in a spatial structure (`IfcRelContainedInSpatialStructure`).
    SpatialContainment,
    /// Property sets attached to objects (`IfcRelDefinesByProperties`).
    PropertySets,
    /// Materials associated with objects (`IfcRelAssociatesMaterial`).
    Materials,
    /// Type objects assigned to occurrences (`IfcRelDefinesByType`). The
    /// schema decides which inverse attribute lists these relations.
    DefinesByType(SchemaVersion),
}

impl RelationKind {
    /// The two kinds that make up the spatial tree, in merge order.
    pub const SPATIAL: [RelationKind; 2] = [RelationKind::Aggregates, RelationKind::SpatialContainment];

    /// Type-assignment kind for a model authored in `schema_name`.
    pub fn type_assignment(schema_name: &str) -> Self {
        RelationKind::DefinesByType(SchemaVersion::from_schema_name(schema_name))
    }

    pub fn type_code(self) -> TypeCode {
        match self {
            RelationKind::Aggregates => TypeCode::REL_AGGREGATES,
            RelationKind::SpatialContainment => TypeCode::REL_CONTAINED_IN_SPATIAL_STRUCTURE,
            RelationKind::PropertySets => TypeCode::REL_DEFINES_BY_PROPERTIES,
            RelationKind::Materials => TypeCode::REL_ASSOCIATES_MATERIAL,
            RelationKind::DefinesByType(_) => TypeCode::REL_DEFINES_BY_TYPE,
        }
    }

    /// Single-reference field naming the owner or shared definition.
    pub fn relating_field(self) -> &'static str {
        match self {
            RelationKind::Aggregates => "RelatingObject",
            RelationKind::SpatialContainment => "RelatingStructure",
            RelationKind::PropertySets => "RelatingPropertyDefinition",
            RelationKind::Materials => "RelatingMaterial",
            RelationKind::DefinesByType(_) => "RelatingType",
        }
    }

    /// Reference-list field naming the members.
    pub fn related_field(self) -> &'static str {
        match self {
            RelationKind::SpatialContainment => "RelatedElements",
            RelationKind::Aggregates
            | RelationKind::PropertySets
            | RelationKind::Materials
            | RelationKind::DefinesByType(_) => "RelatedObjects",
        }
    }

    /// Inverse attribute on a member record listing relations of this kind.
    pub fn child_field_key(self) -> &'static str {
        match self {
            RelationKind::Aggregates => "Decomposes",
            RelationKind::SpatialContainment => "ContainedInStructure",
            RelationKind::PropertySets => "IsDefinedBy",
            RelationKind::Materials => "HasAssociations",
            RelationKind::DefinesByType(SchemaVersion::Ifc2x3) => "IsDefinedBy",
            RelationKind::DefinesByType(SchemaVersion::Ifc4) => "IsTypedBy",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_code().name())
    }
}

/// Tuning shared by every resolver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Upper bound on store fetches in flight within one call.
    pub fetch_concurrency: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self { fetch_concurrency: 8 }
    }
}

impl From<&Config> for ResolverOptions {
    fn from(config: &Config) -> Self {
        Self {
            fetch_concurrency: config.resolver.fetch_concurrency,
        }
    }
}

/// Fetch `ids` with bounded concurrency, results in input order.
pub(crate) async fn fetch_records<S: RecordStore + ?Sized>(
    store: &S,
    model_id: ModelId,
    ids: Vec<ExpressId>,
    recursive: bool,
    expand_inverse: bool,
    options: &ResolverOptions,
) -> Result<Vec<Record>> {
    stream::iter(
        ids.into_iter()
            .map(|id| store.get_record(model_id, id, recursive, expand_inverse)),
    )
    .buffered(options.fetch_concurrency.max(1))
    .try_collect()
    .await
}
