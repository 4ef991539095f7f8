use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ifcgraph::db::migrate;
use ifcgraph::error::IfcGraphError;
use ifcgraph::{Config, ExpressId, ModelDump, ModelId, Properties, ResolverOptions, SqliteStore};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "ifcgraph")]
#[command(version, about = "Query and edit relationships of building models stored in SQLite")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run migrations and verify the database schema (default)
    Verify,
    /// Import a JSON model dump, printing the new model id
    Import {
        /// Path to a dump of the form {"schema": ..., "records": [...]}
        dump: PathBuf,
    },
    /// Print the spatial containment tree
    Tree {
        #[arg(long)]
        model: ModelId,
        /// Merge each node's record fields into the tree
        #[arg(long)]
        properties: bool,
    },
    /// Print a single record
    Item {
        #[arg(long)]
        model: ModelId,
        #[arg(long)]
        id: ExpressId,
        #[arg(long)]
        recursive: bool,
        /// Include inverse attributes such as IsDefinedBy
        #[arg(long)]
        inverse: bool,
    },
    /// Print property sets of an element, or of the whole model
    Psets {
        #[arg(long)]
        model: ModelId,
        #[arg(long)]
        element: Option<ExpressId>,
        #[arg(long)]
        recursive: bool,
    },
    /// Print materials of an element, or of the whole model
    Materials {
        #[arg(long)]
        model: ModelId,
        #[arg(long)]
        element: Option<ExpressId>,
        #[arg(long)]
        recursive: bool,
    },
    /// Print the type objects assigned to an element
    TypeProps {
        #[arg(long)]
        model: ModelId,
        #[arg(long)]
        element: ExpressId,
        #[arg(long)]
        recursive: bool,
    },
    /// Attach property sets to elements through their existing relations
    AssignPset(AssignArgs),
    /// Attach materials to elements through their existing relations
    AssignMaterial(AssignArgs),
}

#[derive(clap::Args, Debug)]
struct AssignArgs {
    #[arg(long)]
    model: ModelId,
    /// Comma-separated element ids
    #[arg(long, value_delimiter = ',', required = true)]
    element: Vec<ExpressId>,
    /// Comma-separated definition ids
    #[arg(long, value_delimiter = ',', required = true)]
    definition: Vec<ExpressId>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.store.log_level.as_str()),
    )
    .init();

    let store = Arc::new(
        SqliteStore::open(config.db_path())
            .await
            .with_context(|| format!("Failed to open store at {}", config.db_path().display()))?,
    );
    let props = Properties::with_options(Arc::clone(&store), ResolverOptions::from(&config));

    match cli.command.unwrap_or(Command::Verify) {
        Command::Verify => verify_database_schema(&store).await?,
        Command::Import { dump } => {
            let json = std::fs::read_to_string(&dump)
                .with_context(|| format!("Failed to read dump {}", dump.display()))?;
            let dump = ModelDump::from_json(&json)?;
            let model_id = store.import_dump(dump).await?;
            print_json(&serde_json::json!({ "model": model_id }))?;
        }
        Command::Tree { model, properties } => {
            print_json(&props.get_spatial_structure(model, properties).await?)?;
        }
        Command::Item {
            model,
            id,
            recursive,
            inverse,
        } => {
            print_json(&props.get_item_properties(model, id, recursive, inverse).await?)?;
        }
        Command::Psets {
            model,
            element,
            recursive,
        } => {
            print_json(&props.get_property_sets(model, element, recursive).await?)?;
        }
        Command::Materials {
            model,
            element,
            recursive,
        } => {
            print_json(&props.get_materials_properties(model, element, recursive).await?)?;
        }
        Command::TypeProps {
            model,
            element,
            recursive,
        } => {
            print_json(&props.get_type_properties(model, element, recursive).await?)?;
        }
        Command::AssignPset(args) => {
            let ok = props
                .set_property_sets(args.model, args.element, args.definition)
                .await?;
            print_json(&serde_json::json!({ "associated": ok }))?;
        }
        Command::AssignMaterial(args) => {
            let ok = props
                .set_materials_properties(args.model, args.element, args.definition)
                .await?;
            print_json(&serde_json::json!({ "associated": ok }))?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Verify that all expected database objects exist
async fn verify_database_schema(store: &SqliteStore) -> Result<()> {
    log::info!("Starting ifcgraph v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Database path: {}", store.db().path().display());

    store
        .db()
        .with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
            let tables: Vec<String> = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

            for table in ["models", "records", "record_refs", "schema_migrations"] {
                if !tables.iter().any(|t| t == table) {
                    return Err(IfcGraphError::Config(format!("Missing table: {}", table)));
                }
                log::debug!("✓ Table exists: {}", table);
            }

            let applied = migrate::get_applied_migrations(conn)?;
            log::debug!("✓ {} migrations applied", applied.len());

            let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
            if journal_mode.to_uppercase() != "WAL" {
                return Err(IfcGraphError::Config(format!("Journal mode is not WAL: {}", journal_mode)));
            }

            let foreign_keys: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
            if foreign_keys != 1 {
                return Err(IfcGraphError::Config("Foreign keys not enabled".to_string()));
            }

            let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
            if integrity != "ok" {
                return Err(IfcGraphError::Config(format!(
                    "Database integrity check failed: {}",
                    integrity
                )));
            }
            log::info!("✓ Database integrity: OK");
            Ok(())
        })
        .await?;

    for (model_id, schema) in store.list_models().await? {
        log::info!("Model {}: {}", model_id, schema);
    }
    log::info!("✓ Database schema verification complete");
    Ok(())
}
