//! Entity type codes and the small slice of the class hierarchy the resolver needs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric entity type code as used by IFC toolkits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeCode(pub u32);

impl TypeCode {
    pub const PROJECT: TypeCode = TypeCode(103090709);
    pub const SITE: TypeCode = TypeCode(4097777520);
    pub const BUILDING: TypeCode = TypeCode(4031249490);
    pub const BUILDING_STOREY: TypeCode = TypeCode(3124254112);
    pub const SPACE: TypeCode = TypeCode(3856911033);
    pub const WALL: TypeCode = TypeCode(2391406946);
    pub const WALL_STANDARD_CASE: TypeCode = TypeCode(3512223829);
    pub const SLAB: TypeCode = TypeCode(1529196076);
    pub const DOOR: TypeCode = TypeCode(395920057);
    pub const WINDOW: TypeCode = TypeCode(3304561284);
    pub const COLUMN: TypeCode = TypeCode(843113511);
    pub const BEAM: TypeCode = TypeCode(753842376);
    pub const MEMBER: TypeCode = TypeCode(1073191201);
    pub const PLATE: TypeCode = TypeCode(3171933400);
    pub const ROOF: TypeCode = TypeCode(2016517767);
    pub const STAIR: TypeCode = TypeCode(331165859);
    pub const STAIR_FLIGHT: TypeCode = TypeCode(4252922144);
    pub const RAILING: TypeCode = TypeCode(2262370178);
    pub const COVERING: TypeCode = TypeCode(1973544240);
    pub const FOOTING: TypeCode = TypeCode(900683007);
    pub const BUILDING_ELEMENT_PROXY: TypeCode = TypeCode(1095909175);
    pub const FURNISHING_ELEMENT: TypeCode = TypeCode(263784265);
    pub const OPENING_ELEMENT: TypeCode = TypeCode(3588315303);
    pub const WALL_TYPE: TypeCode = TypeCode(1898987631);
    pub const COLUMN_TYPE: TypeCode = TypeCode(300633059);
    pub const BEAM_TYPE: TypeCode = TypeCode(819618141);
    pub const SLAB_TYPE: TypeCode = TypeCode(2533589738);
    pub const PROPERTY_SET: TypeCode = TypeCode(1451395588);
    pub const PROPERTY_SINGLE_VALUE: TypeCode = TypeCode(3650150729);
    pub const ELEMENT_QUANTITY: TypeCode = TypeCode(1883228015);
    pub const MATERIAL: TypeCode = TypeCode(1838606355);
    pub const MATERIAL_LAYER: TypeCode = TypeCode(248100487);
    pub const MATERIAL_LAYER_SET: TypeCode = TypeCode(3303938423);
    pub const MATERIAL_LAYER_SET_USAGE: TypeCode = TypeCode(1303795690);
    pub const MATERIAL_LIST: TypeCode = TypeCode(2199411900);
    pub const REL_AGGREGATES: TypeCode = TypeCode(160246688);
    pub const REL_CONTAINED_IN_SPATIAL_STRUCTURE: TypeCode = TypeCode(3242617779);
    pub const REL_DEFINES_BY_PROPERTIES: TypeCode = TypeCode(4186316022);
    pub const REL_ASSOCIATES_MATERIAL: TypeCode = TypeCode(2655215786);
    pub const REL_DEFINES_BY_TYPE: TypeCode = TypeCode(781010003);
    pub const REL_VOIDS_ELEMENT: TypeCode = TypeCode(1401173127);
    pub const REL_FILLS_ELEMENT: TypeCode = TypeCode(3940055652);

    fn entry(self) -> Option<&'static EntityInfo> {
        ENTITIES.iter().find(|e| e.code == self)
    }

    /// Upper-case entity name, `"UNKNOWN"` for codes outside the table.
    pub fn name(self) -> &'static str {
        self.entry().map(|e| e.name).unwrap_or("UNKNOWN")
    }

    pub fn from_name(name: &str) -> Option<TypeCode> {
        ENTITIES
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.code)
    }

    /// Codes outside the table are treated as elements: relationship,
    /// property and material entities are all catalogued.
    pub fn category(self) -> Category {
        self.entry().map(|e| e.category).unwrap_or(Category::Element)
    }

    pub fn supertype(self) -> Option<TypeCode> {
        self.entry().and_then(|e| e.supertype)
    }

    /// `self` followed by every known code inheriting from it.
    pub fn with_subtypes(self) -> Vec<TypeCode> {
        let mut codes = vec![self];
        codes.extend(
            ENTITIES
                .iter()
                .map(|e| e.code)
                .filter(|code| *code != self && code.is_subtype_of(self)),
        );
        codes
    }

    /// True when `self` equals `other` or inherits from it.
    pub fn is_subtype_of(self, other: TypeCode) -> bool {
        let mut current = Some(self);
        while let Some(code) = current {
            if code == other {
                return true;
            }
            current = code.supertype();
        }
        false
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Coarse grouping that decides which inverse attributes a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Project,
    SpatialElement,
    Element,
    TypeObject,
    PropertyDefinition,
    Material,
    Relationship,
}

struct EntityInfo {
    code: TypeCode,
    name: &'static str,
    category: Category,
    supertype: Option<TypeCode>,
}

const fn entity(code: TypeCode, name: &'static str, category: Category) -> EntityInfo {
    EntityInfo {
        code,
        name,
        category,
        supertype: None,
    }
}

static ENTITIES: &[EntityInfo] = &[
    entity(TypeCode::PROJECT, "IFCPROJECT", Category::Project),
    entity(TypeCode::SITE, "IFCSITE", Category::SpatialElement),
    entity(TypeCode::BUILDING, "IFCBUILDING", Category::SpatialElement),
    entity(TypeCode::BUILDING_STOREY, "IFCBUILDINGSTOREY", Category::SpatialElement),
    entity(TypeCode::SPACE, "IFCSPACE", Category::SpatialElement),
    entity(TypeCode::WALL, "IFCWALL", Category::Element),
    EntityInfo {
        code: TypeCode::WALL_STANDARD_CASE,
        name: "IFCWALLSTANDARDCASE",
        category: Category::Element,
        supertype: Some(TypeCode::WALL),
    },
    entity(TypeCode::SLAB, "IFCSLAB", Category::Element),
    entity(TypeCode::DOOR, "IFCDOOR", Category::Element),
    entity(TypeCode::WINDOW, "IFCWINDOW", Category::Element),
    entity(TypeCode::COLUMN, "IFCCOLUMN", Category::Element),
    entity(TypeCode::BEAM, "IFCBEAM", Category::Element),
    entity(TypeCode::MEMBER, "IFCMEMBER", Category::Element),
    entity(TypeCode::PLATE, "IFCPLATE", Category::Element),
    entity(TypeCode::ROOF, "IFCROOF", Category::Element),
    entity(TypeCode::STAIR, "IFCSTAIR", Category::Element),
    entity(TypeCode::STAIR_FLIGHT, "IFCSTAIRFLIGHT", Category::Element),
    entity(TypeCode::RAILING, "IFCRAILING", Category::Element),
    entity(TypeCode::COVERING, "IFCCOVERING", Category::Element),
    entity(TypeCode::FOOTING, "IFCFOOTING", Category::Element),
    entity(
        TypeCode::BUILDING_ELEMENT_PROXY,
        "IFCBUILDINGELEMENTPROXY",
        Category::Element,
    ),
    entity(TypeCode::FURNISHING_ELEMENT, "IFCFURNISHINGELEMENT", Category::Element),
    entity(TypeCode::OPENING_ELEMENT, "IFCOPENINGELEMENT", Category::Element),
    entity(TypeCode::WALL_TYPE, "IFCWALLTYPE", Category::TypeObject),
    entity(TypeCode::COLUMN_TYPE, "IFCCOLUMNTYPE", Category::TypeObject),
    entity(TypeCode::BEAM_TYPE, "IFCBEAMTYPE", Category::TypeObject),
    entity(TypeCode::SLAB_TYPE, "IFCSLABTYPE", Category::TypeObject),
    entity(TypeCode::PROPERTY_SET, "IFCPROPERTYSET", Category::PropertyDefinition),
    entity(
        TypeCode::PROPERTY_SINGLE_VALUE,
        "IFCPROPERTYSINGLEVALUE",
        Category::PropertyDefinition,
    ),
    entity(TypeCode::ELEMENT_QUANTITY, "IFCELEMENTQUANTITY", Category::PropertyDefinition),
    entity(TypeCode::MATERIAL, "IFCMATERIAL", Category::Material),
    entity(TypeCode::MATERIAL_LAYER, "IFCMATERIALLAYER", Category::Material),
    entity(TypeCode::MATERIAL_LAYER_SET, "IFCMATERIALLAYERSET", Category::Material),
    entity(
        TypeCode::MATERIAL_LAYER_SET_USAGE,
        "IFCMATERIALLAYERSETUSAGE",
        Category::Material,
    ),
    entity(TypeCode::MATERIAL_LIST, "IFCMATERIALLIST", Category::Material),
    entity(TypeCode::REL_AGGREGATES, "IFCRELAGGREGATES", Category::Relationship),
    entity(
        TypeCode::REL_CONTAINED_IN_SPATIAL_STRUCTURE,
        "IFCRELCONTAINEDINSPATIALSTRUCTURE",
        Category::Relationship,
    ),
    entity(
        TypeCode::REL_DEFINES_BY_PROPERTIES,
        "IFCRELDEFINESBYPROPERTIES",
        Category::Relationship,
    ),
    entity(
        TypeCode::REL_ASSOCIATES_MATERIAL,
        "IFCRELASSOCIATESMATERIAL",
        Category::Relationship,
    ),
    entity(TypeCode::REL_DEFINES_BY_TYPE, "IFCRELDEFINESBYTYPE", Category::Relationship),
    entity(TypeCode::REL_VOIDS_ELEMENT, "IFCRELVOIDSELEMENT", Category::Relationship),
    entity(TypeCode::REL_FILLS_ELEMENT, "IFCRELFILLSELEMENT", Category::Relationship),
];
