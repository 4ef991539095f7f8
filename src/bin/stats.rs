use anyhow::{Context, Result};
use clap::Parser;
use ifcgraph::{Config, ModelId, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "stats")]
#[command(about = "Print per-type record counts of stored models")]
struct Args {
    /// Only report this model (all models by default)
    #[arg(long)]
    model: Option<ModelId>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load().context("Failed to load configuration")?;
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.store.log_level.as_str()),
    )
    .init();

    let store = SqliteStore::open(config.db_path()).await?;
    let models = store.list_models().await?;

    println!("\n=== ifcgraph Model Statistics ===\n");

    if models.is_empty() {
        println!("No models imported yet.");
        println!("\nRun `ifcgraph import <dump.json>` to load one.");
        return Ok(());
    }

    for (model_id, schema) in models {
        if args.model.is_some_and(|wanted| wanted != model_id) {
            continue;
        }
        let counts = store.type_counts(model_id).await?;
        let total: i64 = counts.iter().map(|(_, count)| count).sum();

        println!("Model {} ({}), {} records:\n", model_id, schema, total);
        println!("{:-<60}", "");
        println!("{:<36} {:>12} {:>10}", "Type", "Code", "Count");
        println!("{:-<60}", "");
        for (type_code, count) in &counts {
            println!("{:<36} {:>12} {:>10}", type_code.name(), type_code.0, count);
        }
        println!("{:-<60}\n", "");
    }

    Ok(())
}
