use std::time::Duration;

use rivalwatch_core::{AppConfig, DateRange};
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

pub mod comparisons;
pub mod memory;
pub mod seed;
pub mod store;
pub mod summaries;

pub use comparisons::{list_comparisons, upsert_comparison, ComparisonRow};
pub use memory::MemoryStore;
pub use seed::{list_seeded_competitors, seed_competitors, CompetitorRow};
pub use store::{PgStore, Store};
pub use summaries::{
    latest_per_competitor, list_summaries, query_trend, upsert_summary, SummaryRow,
};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Default and upper bound for list queries.
pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 500;

// Workspace-root `migrations/`.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    /// No database is configured or reachable; results are not persisted.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid row: {0}")]
    InvalidRow(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Filter for [`Store::list_summaries`].
#[derive(Debug, Clone, Default)]
pub struct SummaryFilter {
    pub competitor: Option<String>,
    pub range: Option<DateRange>,
    /// Clamped to `1..=MAX_LIST_LIMIT`; `None` means [`DEFAULT_LIST_LIMIT`].
    pub limit: Option<i64>,
}

impl SummaryFilter {
    #[must_use]
    pub fn effective_limit(&self) -> i64 {
        clamp_limit(self.limit)
    }
}

/// Rows removed by a retention pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PruneCounts {
    pub summaries: u64,
    pub comparisons: u64,
}

#[must_use]
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

/// Build a Postgres pool sized by `config`.
///
/// # Errors
///
/// Returns [`sqlx::Error`] when no connection can be opened within the
/// acquire timeout.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Apply pending migrations from `migrations/` and report how many ran.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if a migration fails or a
/// previously applied one was edited.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    let applied = applied_versions(pool).await;
    let pending = MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration() && !applied.contains(&m.version))
        .count();
    MIGRATOR.run(pool).await?;
    Ok(pending)
}

// Empty on a fresh database, where `_sqlx_migrations` does not exist yet.
async fn applied_versions(pool: &PgPool) -> Vec<i64> {
    sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations WHERE success")
        .fetch_all(pool)
        .await
        .unwrap_or_default()
}

/// Round-trip a trivial query.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the database cannot be reached.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
