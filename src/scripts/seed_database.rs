use anyhow::{Context, Result};
use log::LevelFilter;
use validation_registry::config::AppConfig;
use validation_registry::seed;
use validation_registry::store::PostgresStore;

/// Load the reference vocabularies into PostgreSQL, and the sample records
/// unless `--vocabulary-only` is given.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("sqlx", LevelFilter::Warn)
        .init();

    let vocabulary_only = std::env::args().any(|arg| arg == "--vocabulary-only");

    let config = AppConfig::load()?;
    let database_url = config.database_url()?;
    let store = PostgresStore::with_max_connections(
        &database_url,
        config.database.max_connections.unwrap_or(5),
    )
    .await
    .context("connecting to PostgreSQL")?;

    log::info!("Running database migrations...");
    store.migrate().await?;

    seed::load_vocabularies(&store).await?;
    if !vocabulary_only {
        seed::load_sample_data(&store).await?;
    }

    log::info!("Seeding complete");
    Ok(())
}
