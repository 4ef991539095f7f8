//! Schema versions and the inverse attributes each record category exposes.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Category, TypeCode};

/// Schema family of a model. Only the split that changes relation layout is modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaVersion {
    Ifc2x3,
    Ifc4,
}

impl SchemaVersion {
    /// `IFC2X3` selects the older layout; every other schema name uses the IFC4 one.
    pub fn from_schema_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("IFC2X3") {
            SchemaVersion::Ifc2x3
        } else {
            SchemaVersion::Ifc4
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVersion::Ifc2x3 => f.write_str("IFC2X3"),
            SchemaVersion::Ifc4 => f.write_str("IFC4"),
        }
    }
}

/// A derived back-reference list: relation records of `relation_types`
/// whose `via_field` references the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InverseAttribute {
    pub name: &'static str,
    pub relation_types: &'static [TypeCode],
    pub via_field: &'static str,
}

const IS_DEFINED_BY_2X3: InverseAttribute = InverseAttribute {
    name: "IsDefinedBy",
    relation_types: &[TypeCode::REL_DEFINES_BY_PROPERTIES, TypeCode::REL_DEFINES_BY_TYPE],
    via_field: "RelatedObjects",
};

const IS_DEFINED_BY: InverseAttribute = InverseAttribute {
    name: "IsDefinedBy",
    relation_types: &[TypeCode::REL_DEFINES_BY_PROPERTIES],
    via_field: "RelatedObjects",
};

const IS_TYPED_BY: InverseAttribute = InverseAttribute {
    name: "IsTypedBy",
    relation_types: &[TypeCode::REL_DEFINES_BY_TYPE],
    via_field: "RelatedObjects",
};

const HAS_ASSOCIATIONS: InverseAttribute = InverseAttribute {
    name: "HasAssociations",
    relation_types: &[TypeCode::REL_ASSOCIATES_MATERIAL],
    via_field: "RelatedObjects",
};

const IS_DECOMPOSED_BY: InverseAttribute = InverseAttribute {
    name: "IsDecomposedBy",
    relation_types: &[TypeCode::REL_AGGREGATES],
    via_field: "RelatingObject",
};

const DECOMPOSES: InverseAttribute = InverseAttribute {
    name: "Decomposes",
    relation_types: &[TypeCode::REL_AGGREGATES],
    via_field: "RelatedObjects",
};

const CONTAINED_IN_STRUCTURE: InverseAttribute = InverseAttribute {
    name: "ContainedInStructure",
    relation_types: &[TypeCode::REL_CONTAINED_IN_SPATIAL_STRUCTURE],
    via_field: "RelatedElements",
};

const CONTAINS_ELEMENTS: InverseAttribute = InverseAttribute {
    name: "ContainsElements",
    relation_types: &[TypeCode::REL_CONTAINED_IN_SPATIAL_STRUCTURE],
    via_field: "RelatingStructure",
};

static PROJECT_2X3: &[InverseAttribute] = &[IS_DEFINED_BY_2X3, HAS_ASSOCIATIONS, IS_DECOMPOSED_BY];
static PROJECT_4: &[InverseAttribute] = &[IS_DEFINED_BY, IS_TYPED_BY, HAS_ASSOCIATIONS, IS_DECOMPOSED_BY];

static SPATIAL_2X3: &[InverseAttribute] = &[
    IS_DEFINED_BY_2X3,
    HAS_ASSOCIATIONS,
    IS_DECOMPOSED_BY,
    DECOMPOSES,
    CONTAINS_ELEMENTS,
];
static SPATIAL_4: &[InverseAttribute] = &[
    IS_DEFINED_BY,
    IS_TYPED_BY,
    HAS_ASSOCIATIONS,
    IS_DECOMPOSED_BY,
    DECOMPOSES,
    CONTAINS_ELEMENTS,
];

static ELEMENT_2X3: &[InverseAttribute] = &[
    IS_DEFINED_BY_2X3,
    HAS_ASSOCIATIONS,
    IS_DECOMPOSED_BY,
    DECOMPOSES,
    CONTAINED_IN_STRUCTURE,
];
static ELEMENT_4: &[InverseAttribute] = &[
    IS_DEFINED_BY,
    IS_TYPED_BY,
    HAS_ASSOCIATIONS,
    IS_DECOMPOSED_BY,
    DECOMPOSES,
    CONTAINED_IN_STRUCTURE,
];

static TYPE_OBJECT: &[InverseAttribute] = &[HAS_ASSOCIATIONS];

/// Inverse attributes carried by records of `type_code` under `schema`.
pub fn inverse_attributes(type_code: TypeCode, schema: SchemaVersion) -> &'static [InverseAttribute] {
    match (type_code.category(), schema) {
        (Category::Project, SchemaVersion::Ifc2x3) => PROJECT_2X3,
        (Category::Project, SchemaVersion::Ifc4) => PROJECT_4,
        (Category::SpatialElement, SchemaVersion::Ifc2x3) => SPATIAL_2X3,
        (Category::SpatialElement, SchemaVersion::Ifc4) => SPATIAL_4,
        (Category::Element, SchemaVersion::Ifc2x3) => ELEMENT_2X3,
        (Category::Element, SchemaVersion::Ifc4) => ELEMENT_4,
        (Category::TypeObject, _) => TYPE_OBJECT,
        (Category::PropertyDefinition, _) | (Category::Material, _) | (Category::Relationship, _) => &[],
    }
}
