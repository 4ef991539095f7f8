//! Appending elements to existing relation records.

use std::collections::HashSet;

use super::{fetch_records, RelationKind, ResolverOptions};
use crate::error::{IfcGraphError, Result};
use crate::model::{ExpressId, ModelId, Record, Value};
use crate::store::RecordStore;

/// Ordered set of ids: duplicates dropped, first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSet(Vec<ExpressId>);

impl IdSet {
    pub fn as_slice(&self) -> &[ExpressId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ExpressId> for IdSet {
    fn from_iter<I: IntoIterator<Item = ExpressId>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        IdSet(iter.into_iter().filter(|id| seen.insert(*id)).collect())
    }
}

impl From<ExpressId> for IdSet {
    fn from(id: ExpressId) -> Self {
        IdSet(vec![id])
    }
}

impl From<Vec<ExpressId>> for IdSet {
    fn from(ids: Vec<ExpressId>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<&[ExpressId]> for IdSet {
    fn from(ids: &[ExpressId]) -> Self {
        ids.iter().copied().collect()
    }
}

impl<const N: usize> From<[ExpressId; N]> for IdSet {
    fn from(ids: [ExpressId; N]) -> Self {
        ids.into_iter().collect()
    }
}

/// Link `elements` to the relation records of `kind` whose relating
/// reference is one of `definitions`.
///
/// Elements without the kind's inverse attribute are dropped; when none
/// remain nothing is written and `false` is returned. The scan over relation
/// records keeps the first record per definition and stops once every
/// definition has one. Definitions without a relation record are skipped;
/// no relation record is ever created. Each touched relation record is
/// written once per element, each surviving element once.
///
/// Callers must serialize mutations per model.
pub async fn associate<S: RecordStore + ?Sized>(
    store: &S,
    model_id: ModelId,
    elements: impl Into<IdSet>,
    definitions: impl Into<IdSet>,
    kind: RelationKind,
    options: &ResolverOptions,
) -> Result<bool> {
    let elements: IdSet = elements.into();
    let definitions: IdSet = definitions.into();
    if elements.is_empty() || definitions.is_empty() {
        return Err(IfcGraphError::InvalidInput(
            "associate needs at least one element and one definition".to_string(),
        ));
    }

    let key = kind.child_field_key();
    let fetched = fetch_records(store, model_id, elements.0, false, true, options).await?;
    let mut targets: Vec<Record> = Vec::with_capacity(fetched.len());
    for element in fetched {
        if element.fields.contains(key) {
            targets.push(element);
        } else {
            log::debug!("#{} ({}) has no {}, skipped", element.id, element.type_code, key);
        }
    }
    if targets.is_empty() {
        return Ok(false);
    }

    let wanted: HashSet<ExpressId> = definitions.0.iter().copied().collect();
    let mut matched: HashSet<ExpressId> = HashSet::new();
    let mut relations: Vec<Record> = Vec::new();
    for relation_id in store
        .get_record_ids_of_type(model_id, kind.type_code(), false)
        .await?
    {
        if matched.len() == wanted.len() {
            break;
        }
        let relation = store.get_record(model_id, relation_id, false, false).await?;
        let Some(relating) = relation.field(kind.relating_field()).and_then(Value::as_ref_id) else {
            continue;
        };
        if wanted.contains(&relating) && matched.insert(relating) {
            relations.push(relation);
        }
    }
    for id in definitions.0.iter().filter(|id| !matched.contains(id)) {
        log::warn!("No {} relation for definition #{} in model {}", kind, id, model_id);
    }

    for element in &mut targets {
        for relation in &mut relations {
            relation.push_ref(kind.related_field(), element.id)?;
            element.push_ref(key, relation.id)?;
            store.write_record(model_id, relation.clone()).await?;
        }
        store.write_record(model_id, element.clone()).await?;
    }

    log::debug!(
        "Associated {} elements with {} {} relations in model {}",
        targets.len(),
        relations.len(),
        kind,
        model_id
    );
    Ok(true)
}
