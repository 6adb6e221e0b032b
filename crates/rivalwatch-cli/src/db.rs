//! `db` subcommands. These need a reachable Postgres; there is no
//! in-memory fallback here.

use anyhow::Context;
use rivalwatch_core::{load_competitors, AppConfig};
use rivalwatch_db::{PoolConfig, Store};
use rivalwatch_visual::prune_screenshots;

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set for db commands")?;
    let pool = rivalwatch_db::connect_pool(database_url, PoolConfig::from_app_config(config))
        .await
        .context("failed to connect to database")?;
    Ok(pool)
}

pub(crate) async fn run_db_ping(config: &AppConfig) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    rivalwatch_db::ping(&pool).await?;
    println!("database ok");
    Ok(())
}

pub(crate) async fn run_db_migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let applied = rivalwatch_db::run_migrations(&pool).await?;
    println!("migrations applied: {applied}");
    Ok(())
}

/// Upsert every competitor in the competitor file.
///
/// # Errors
///
/// Returns an error if the file is invalid or the database is unavailable.
pub(crate) async fn run_db_seed(config: &AppConfig) -> anyhow::Result<()> {
    let file = load_competitors(&config.competitors_path)?;
    let store = Store::try_connect(config)
        .await
        .context("seeding needs a database")?;
    let seeded = store.seed_competitors(&file.competitors).await?;
    println!("seeded {seeded} competitors");
    Ok(())
}

/// Delete summaries, comparisons and screenshots older than `days` days.
///
/// # Errors
///
/// Returns an error if the database is unavailable or a delete fails.
pub(crate) async fn run_db_prune(config: &AppConfig, days: u32) -> anyhow::Result<()> {
    let store = Store::try_connect(config)
        .await
        .context("pruning needs a database")?;
    let counts = store.prune_older_than(days).await?;
    println!(
        "pruned {} summaries and {} comparisons older than {days} days",
        counts.summaries, counts.comparisons
    );

    match prune_screenshots(&config.screenshots_dir, days) {
        Ok(removed) => println!("removed {removed} screenshots"),
        Err(e) => tracing::warn!(
            dir = %config.screenshots_dir.display(),
            error = %e,
            "failed to prune screenshots"
        ),
    }
    Ok(())
}
