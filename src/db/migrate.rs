//! Schema migrations for the record store.
//!
//! The SQL lives in `migrations/` and is compiled into the binary, so a
//! store opens the same way from any working directory.

use rusqlite::{params, Connection};

use crate::error::{IfcGraphError, Result};

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

/// Every migration this build knows, in version order.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "001_records",
        sql: include_str!("../../migrations/001_records.sql"),
    },
    Migration {
        version: 2,
        name: "002_record_refs",
        sql: include_str!("../../migrations/002_record_refs.sql"),
    },
];

fn ensure_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Names of the applied migrations, oldest first.
pub fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY version")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(names)
}

fn latest_applied_version(conn: &Connection) -> Result<Option<u32>> {
    let version = conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
        row.get::<_, Option<u32>>(0)
    })?;
    Ok(version)
}

/// Bring the record store schema up to date.
///
/// Each pending migration runs in its own transaction together with its
/// bookkeeping row.
///
/// # Errors
///
/// `Config` when the database was migrated by a newer build; a model store
/// with tables this build does not know cannot be read safely.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    ensure_migrations_table(conn)?;

    let known = MIGRATIONS.last().map(|m| m.version).unwrap_or(0);
    if let Some(latest) = latest_applied_version(conn)? {
        if latest > known {
            return Err(IfcGraphError::Config(format!(
                "record store schema is at version {}, this build supports up to {}",
                latest, known
            )));
        }
    }

    let applied = get_applied_migrations(conn)?;
    let mut ran = 0;
    for migration in MIGRATIONS {
        if applied.iter().any(|name| name == migration.name) {
            continue;
        }

        log::info!("Applying migration {} (version {})", migration.name, migration.version);
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;
        ran += 1;
    }

    log::debug!("Record store schema at version {} ({} migrations applied now)", known, ran);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(conn: &Connection, kind: &str) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type = ?1 ORDER BY name")
            .unwrap()
            .query_map([kind], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            .unwrap()
    }

    #[test]
    fn test_embedded_migrations_are_ordered() {
        let versions: Vec<u32> = MIGRATIONS.iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![1, 2]);
        for migration in MIGRATIONS {
            assert!(migration.name.starts_with(&format!("{:03}_", migration.version)));
            assert!(!migration.sql.trim().is_empty());
        }
    }

    #[test]
    fn test_full_migration_schema() {
        let temp_dir = TempDir::new().unwrap();
        let mut conn = Connection::open(temp_dir.path().join("test.db")).unwrap();

        run_migrations(&mut conn).unwrap();

        let tables = names(&conn, "table");
        for table in ["models", "records", "record_refs", "schema_migrations"] {
            assert!(tables.contains(&table.to_string()), "missing table {}", table);
        }
        let indexes = names(&conn, "index");
        assert!(indexes.contains(&"idx_records_type".to_string()));
        assert!(indexes.contains(&"idx_record_refs_target".to_string()));

        assert_eq!(
            get_applied_migrations(&conn).unwrap(),
            vec!["001_records".to_string(), "002_record_refs".to_string()]
        );
    }

    #[test]
    fn test_rerun_applies_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut conn = Connection::open(temp_dir.path().join("test.db")).unwrap();

        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[test]
    fn test_pending_migration_is_applied_on_partial_schema() {
        let temp_dir = TempDir::new().unwrap();
        let mut conn = Connection::open(temp_dir.path().join("test.db")).unwrap();
        ensure_migrations_table(&conn).unwrap();
        conn.execute_batch(MIGRATIONS[0].sql).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![1, "001_records"],
        )
        .unwrap();

        run_migrations(&mut conn).unwrap();
        assert!(names(&conn, "table").contains(&"record_refs".to_string()));
        assert_eq!(get_applied_migrations(&conn).unwrap().len(), 2);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut conn = Connection::open(temp_dir.path().join("test.db")).unwrap();
        run_migrations(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![99, "099_future"],
        )
        .unwrap();

        let err = run_migrations(&mut conn).unwrap_err();
        assert!(matches!(err, IfcGraphError::Config(_)));
    }
}
