//! Typed records and their field values.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::{ExpressId, TypeCode};
use crate::error::{IfcGraphError, Result};

/// A single field value on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(String),
    Enum(String),
    Ref(ExpressId),
    List(Vec<Value>),
    Record(Box<Record>),
}

impl Value {
    /// Id of a single reference. An expanded record counts as a reference to itself.
    pub fn as_ref_id(&self) -> Option<ExpressId> {
        match self {
            Value::Ref(id) => Some(*id),
            Value::Record(record) => Some(record.id),
            _ => None,
        }
    }

    /// All referenced ids, a bare reference normalized into a one-element list.
    pub fn ref_ids(&self) -> Vec<ExpressId> {
        match self {
            Value::List(items) => items.iter().filter_map(Value::as_ref_id).collect(),
            other => other.as_ref_id().into_iter().collect(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn refs(ids: impl IntoIterator<Item = ExpressId>) -> Value {
        Value::List(ids.into_iter().map(Value::Ref).collect())
    }
}

/// Insertion-ordered field map, serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Vec<(String, Value)>);

impl Fields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.0.iter_mut().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replaces the value in place when the name exists, appends otherwise.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        let name = name.into();
        match self.get_mut(&name) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.0.push((name, value));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let pos = self.0.iter().position(|(n, _)| n == name)?;
        Some(self.0.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.0.iter_mut().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (name, value) in iter {
            fields.insert(name, value);
        }
        fields
    }
}

impl IntoIterator for Fields {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Fields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = Fields;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Fields, A::Error> {
                let mut fields = Fields::new();
                while let Some((name, value)) = access.next_entry::<String, Value>()? {
                    fields.insert(name, value);
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

/// An identified, typed entity of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "expressID")]
    pub id: ExpressId,
    #[serde(rename = "type")]
    pub type_code: TypeCode,
    #[serde(default)]
    pub fields: Fields,
}

impl Record {
    pub fn new(id: ExpressId, type_code: TypeCode) -> Self {
        Self {
            id,
            type_code,
            fields: Fields::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name, value);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Referenced ids under `name`; empty when the field is absent or not a reference.
    pub fn ref_ids(&self, name: &str) -> Vec<ExpressId> {
        self.field(name).map(Value::ref_ids).unwrap_or_default()
    }

    /// Append a reference to a list-valued field, turning a bare reference or
    /// a missing/null field into a list first.
    pub fn push_ref(&mut self, name: &str, id: ExpressId) -> Result<()> {
        let record_id = self.id;
        match self.fields.get_mut(name) {
            None => {
                self.fields.insert(name, Value::refs([id]));
            }
            Some(slot) => match slot {
                Value::List(items) => items.push(Value::Ref(id)),
                Value::Null => *slot = Value::refs([id]),
                Value::Ref(_) | Value::Record(_) => {
                    let existing = std::mem::replace(slot, Value::Null);
                    *slot = Value::List(vec![existing, Value::Ref(id)]);
                }
                _ => {
                    return Err(IfcGraphError::schema_violation(format!(
                        "field {} of record #{} does not hold references",
                        name, record_id
                    )))
                }
            },
        }
        Ok(())
    }
}
