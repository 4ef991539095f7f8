//! SQLite-backed record store.
//!
//! Records live in `records` as JSON field blobs; every outgoing reference is
//! mirrored into `record_refs` so inverse attributes resolve with one indexed
//! query instead of decoding each relation record.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::{expand_references, to_stored_form, RecordStore};
use crate::db::{migrate, Db};
use crate::error::{IfcGraphError, Result};
use crate::model::{
    inverse_attributes, ExpressId, Fields, InverseAttribute, ModelDump, ModelId, Record,
    SchemaVersion, TypeCode, Value,
};

/// Persistent store on top of [`Db`].
pub struct SqliteStore {
    db: Db,
}

impl SqliteStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Open the database at `db_path` and apply pending migrations.
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db = Db::new(db_path);
        db.with_connection(migrate::run_migrations).await?;
        Ok(Self::new(db))
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Load a whole model in one transaction and return its new id.
    pub async fn import_dump(&self, dump: ModelDump) -> Result<ModelId> {
        let model_id = self
            .db
            .with_transaction(move |tx| {
                let schema = SchemaVersion::from_schema_name(&dump.schema);
                tx.execute(
                    "INSERT INTO models (schema_name) VALUES (?1)",
                    params![dump.schema],
                )?;
                let model_id = ModelId::try_from(tx.last_insert_rowid()).map_err(|_| {
                    IfcGraphError::InvalidInput("model id space exhausted".to_string())
                })?;
                for record in dump.records {
                    store_record(tx, model_id, &to_stored_form(record, schema))?;
                }
                Ok(model_id)
            })
            .await?;
        log::info!("Imported model {} into {}", model_id, self.db.path().display());
        Ok(model_id)
    }

    /// All models with their schema names.
    pub async fn list_models(&self) -> Result<Vec<(ModelId, String)>> {
        self.db
            .with_connection(|conn| {
                let mut stmt =
                    conn.prepare("SELECT model_id, schema_name FROM models ORDER BY model_id")?;
                let models = stmt
                    .query_map([], |row| Ok((row.get::<_, ModelId>(0)?, row.get::<_, String>(1)?)))?
                    .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
                Ok(models)
            })
            .await
    }

    /// Record count per type code, most frequent first.
    pub async fn type_counts(&self, model_id: ModelId) -> Result<Vec<(TypeCode, i64)>> {
        self.db
            .with_connection(move |conn| {
                load_schema(conn, model_id)?;
                let mut stmt = conn.prepare(
                    "SELECT type_code, COUNT(*) AS n FROM records WHERE model_id = ?1 \
                     GROUP BY type_code ORDER BY n DESC, type_code",
                )?;
                let counts = stmt
                    .query_map(params![model_id], |row| {
                        Ok((TypeCode(row.get::<_, u32>(0)?), row.get::<_, i64>(1)?))
                    })?
                    .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
                Ok(counts)
            })
            .await
    }
}

fn load_schema(conn: &Connection, model_id: ModelId) -> Result<String> {
    conn.query_row(
        "SELECT schema_name FROM models WHERE model_id = ?1",
        params![model_id],
        |row| row.get::<_, String>(0),
    )
    .optional()?
    .ok_or(IfcGraphError::ModelNotFound(model_id))
}

fn load_type_code(conn: &Connection, model_id: ModelId, id: ExpressId) -> Result<Option<TypeCode>> {
    let code = conn
        .query_row(
            "SELECT type_code FROM records WHERE model_id = ?1 AND express_id = ?2",
            params![model_id, id],
            |row| row.get::<_, u32>(0),
        )
        .optional()?;
    Ok(code.map(TypeCode))
}

fn load_record(conn: &Connection, model_id: ModelId, id: ExpressId) -> Result<Record> {
    let row = conn
        .query_row(
            "SELECT type_code, fields_json FROM records WHERE model_id = ?1 AND express_id = ?2",
            params![model_id, id],
            |row| Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;
    let (type_code, fields_json) = row.ok_or_else(|| IfcGraphError::not_found(model_id, id))?;
    let fields: Fields = serde_json::from_str(&fields_json)?;
    Ok(Record {
        id,
        type_code: TypeCode(type_code),
        fields,
    })
}

fn store_record(conn: &Connection, model_id: ModelId, record: &Record) -> Result<()> {
    let fields_json = serde_json::to_string(&record.fields)?;
    conn.execute(
        r#"
        INSERT INTO records (model_id, express_id, type_code, fields_json)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(model_id, express_id) DO UPDATE SET
            type_code = excluded.type_code,
            fields_json = excluded.fields_json
        "#,
        params![model_id, record.id, record.type_code.0, fields_json],
    )?;

    conn.execute(
        "DELETE FROM record_refs WHERE model_id = ?1 AND source_id = ?2",
        params![model_id, record.id],
    )?;
    let mut stmt = conn.prepare_cached(
        "INSERT INTO record_refs (model_id, source_id, field, position, target_id) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (name, value) in record.fields.iter() {
        for (position, target) in value.ref_ids().into_iter().enumerate() {
            stmt.execute(params![model_id, record.id, name, position as i64, target])?;
        }
    }
    Ok(())
}

fn inverse_ids(
    conn: &Connection,
    model_id: ModelId,
    id: ExpressId,
    attr: &InverseAttribute,
) -> Result<Vec<ExpressId>> {
    let placeholders = attr
        .relation_types
        .iter()
        .map(|_| "?")
        .collect::<Vec<_>>()
        .join(",");
    let query = format!(
        "SELECT DISTINCT r.source_id FROM record_refs r \
         JOIN records s ON s.model_id = r.model_id AND s.express_id = r.source_id \
         WHERE r.model_id = ? AND r.target_id = ? AND r.field = ? AND s.type_code IN ({}) \
         ORDER BY r.source_id",
        placeholders
    );
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![
        Box::new(model_id),
        Box::new(id),
        Box::new(attr.via_field.to_string()),
    ];
    for code in attr.relation_types {
        params.push(Box::new(code.0));
    }
    let mut stmt = conn.prepare(&query)?;
    let ids = stmt
        .query_map(rusqlite::params_from_iter(params), |row| row.get::<_, ExpressId>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(ids)
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn get_record(
        &self,
        model_id: ModelId,
        id: ExpressId,
        recursive: bool,
        expand_inverse: bool,
    ) -> Result<Record> {
        self.db
            .with_connection(move |conn| {
                let schema = SchemaVersion::from_schema_name(&load_schema(conn, model_id)?);
                let mut record = load_record(conn, model_id, id)?;

                if recursive {
                    let mut lookup = |ref_id: ExpressId| load_record(conn, model_id, ref_id);
                    for field in record.fields.values_mut() {
                        expand_references(field, &mut lookup)?;
                    }
                }

                if expand_inverse {
                    for attr in inverse_attributes(record.type_code, schema) {
                        let ids = inverse_ids(conn, model_id, id, attr)?;
                        record.fields.insert(attr.name, Value::refs(ids));
                    }
                }

                Ok(record)
            })
            .await
    }

    async fn get_record_ids_of_type(
        &self,
        model_id: ModelId,
        type_code: TypeCode,
        include_subtypes: bool,
    ) -> Result<Vec<ExpressId>> {
        self.db
            .with_connection(move |conn| {
                load_schema(conn, model_id)?;
                let codes = if include_subtypes {
                    type_code.with_subtypes()
                } else {
                    vec![type_code]
                };
                let placeholders = codes.iter().map(|_| "?").collect::<Vec<_>>().join(",");
                let query = format!(
                    "SELECT express_id FROM records WHERE model_id = ? AND type_code IN ({}) \
                     ORDER BY express_id",
                    placeholders
                );
                let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(model_id)];
                for code in &codes {
                    params.push(Box::new(code.0));
                }
                let mut stmt = conn.prepare(&query)?;
                let ids = stmt
                    .query_map(rusqlite::params_from_iter(params), |row| row.get::<_, ExpressId>(0))?
                    .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
                Ok(ids)
            })
            .await
    }

    async fn get_record_type_code(&self, model_id: ModelId, id: ExpressId) -> Result<TypeCode> {
        self.db
            .with_connection(move |conn| {
                load_schema(conn, model_id)?;
                load_type_code(conn, model_id, id)?
                    .ok_or_else(|| IfcGraphError::not_found(model_id, id))
            })
            .await
    }

    async fn get_schema_version(&self, model_id: ModelId) -> Result<String> {
        self.db
            .with_connection(move |conn| load_schema(conn, model_id))
            .await
    }

    async fn write_record(&self, model_id: ModelId, record: Record) -> Result<()> {
        self.db
            .with_transaction(move |tx| {
                let schema = SchemaVersion::from_schema_name(&load_schema(tx, model_id)?);
                if let Some(existing) = load_type_code(tx, model_id, record.id)? {
                    if existing != record.type_code {
                        return Err(IfcGraphError::write_failed(
                            model_id,
                            record.id,
                            format!("stored as {}, written as {}", existing, record.type_code),
                        ));
                    }
                }
                store_record(tx, model_id, &to_stored_form(record, schema))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::wall_with_pset_dump;
    use tempfile::TempDir;

    async fn open_store(temp_dir: &TempDir) -> SqliteStore {
        SqliteStore::open(temp_dir.path().join("model.db")).await.unwrap()
    }

    #[tokio::test]
    async fn test_import_and_fetch() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir).await;
        let model = store.import_dump(wall_with_pset_dump()).await.unwrap();

        assert_eq!(store.get_schema_version(model).await.unwrap(), "IFC4");
        assert_eq!(
            store.get_record_type_code(model, 3).await.unwrap(),
            TypeCode::WALL
        );
        let pset = store.get_record(model, 30, false, false).await.unwrap();
        assert_eq!(pset.ref_ids("HasProperties"), vec![31]);
        assert_eq!(store.list_models().await.unwrap(), vec![(model, "IFC4".to_string())]);
    }

    #[tokio::test]
    async fn test_missing_record_and_model() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir).await;
        let model = store.import_dump(wall_with_pset_dump()).await.unwrap();

        let err = store.get_record(model, 404, false, false).await.unwrap_err();
        assert!(matches!(err, IfcGraphError::NotFound { express_id: 404, .. }));
        let err = store
            .get_record_ids_of_type(model + 10, TypeCode::WALL, false)
            .await
            .unwrap_err();
        assert!(matches!(err, IfcGraphError::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn test_ids_in_store_order_with_subtypes() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir).await;
        let model = store.import_dump(wall_with_pset_dump()).await.unwrap();
        store
            .write_record(model, Record::new(2, TypeCode::WALL_STANDARD_CASE))
            .await
            .unwrap();

        assert_eq!(
            store.get_record_ids_of_type(model, TypeCode::WALL, true).await.unwrap(),
            vec![2, 3]
        );
        assert_eq!(
            store.get_record_ids_of_type(model, TypeCode::WALL, false).await.unwrap(),
            vec![3]
        );
    }

    #[tokio::test]
    async fn test_inverse_and_recursive_expansion() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir).await;
        let model = store.import_dump(wall_with_pset_dump()).await.unwrap();

        let wall = store.get_record(model, 3, false, true).await.unwrap();
        assert_eq!(wall.ref_ids("IsDefinedBy"), vec![20]);
        assert_eq!(wall.field("HasAssociations"), Some(&Value::refs([])));

        let pset = store.get_record(model, 30, true, false).await.unwrap();
        let Some(Value::List(props)) = pset.field("HasProperties") else {
            panic!("expected list")
        };
        assert!(matches!(&props[0], Value::Record(p) if p.id == 31));
    }

    #[tokio::test]
    async fn test_write_rebuilds_references() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir).await;
        let model = store.import_dump(wall_with_pset_dump()).await.unwrap();

        let mut rel = store.get_record(model, 20, false, false).await.unwrap();
        rel.fields.insert("RelatedObjects", Value::refs([]));
        store.write_record(model, rel).await.unwrap();

        let wall = store.get_record(model, 3, false, true).await.unwrap();
        assert!(wall.ref_ids("IsDefinedBy").is_empty());

        let err = store
            .write_record(model, Record::new(20, TypeCode::WALL))
            .await
            .unwrap_err();
        assert!(matches!(err, IfcGraphError::WriteFailed { .. }));
    }
}
