//! Definitions associated with elements through a relation kind.

use super::{fetch_records, RelationKind, ResolverOptions};
use crate::error::Result;
use crate::model::{ExpressId, ModelId, Record};
use crate::store::RecordStore;

/// Resolve the definition records reached through `kind`.
///
/// With `element_id` the element's inverse attribute for `kind` selects the
/// relation records; without it every relation record of `kind` is used.
/// Relation records without a relating reference are skipped. Output keeps
/// relation order, then reference order within each relation.
pub async fn resolve_related<S: RecordStore + ?Sized>(
    store: &S,
    model_id: ModelId,
    kind: RelationKind,
    element_id: Option<ExpressId>,
    recursive: bool,
    options: &ResolverOptions,
) -> Result<Vec<Record>> {
    let relation_ids = match element_id {
        None => {
            store
                .get_record_ids_of_type(model_id, kind.type_code(), false)
                .await?
        }
        Some(id) => {
            let element = store.get_record(model_id, id, false, true).await?;
            element.ref_ids(kind.child_field_key())
        }
    };
    if relation_ids.is_empty() {
        return Ok(Vec::new());
    }

    let relations = fetch_records(store, model_id, relation_ids, false, false, options).await?;

    let mut definition_ids = Vec::new();
    for relation in &relations {
        let ids = relation.ref_ids(kind.relating_field());
        if ids.is_empty() {
            log::debug!(
                "Skipping #{} ({}): no {}",
                relation.id,
                relation.type_code,
                kind.relating_field()
            );
            continue;
        }
        definition_ids.extend(ids);
    }

    log::debug!(
        "Resolving {} definitions via {} in model {}",
        definition_ids.len(),
        kind,
        model_id
    );
    fetch_records(store, model_id, definition_ids, recursive, false, options).await
}
