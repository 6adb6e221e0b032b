//! Backend-agnostic persistence facade.

use chrono::{Days, NaiveDate, Utc};
use rivalwatch_core::{
    AppConfig, CompetitorConfig, DateRange, ScreenshotComparison, SummaryRecord, TrendAnalysis,
};
use sqlx::PgPool;

use crate::memory::MemoryStore;
use crate::{
    comparisons, connect_pool, ping, run_migrations, seed, summaries, DbError, PoolConfig,
    PruneCounts, SummaryFilter,
};

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Where run results go.
///
/// [`Store::Memory`] keeps results for the life of the process only; callers
/// check [`Store::is_persistent`] to tell users their results are unsaved.
#[derive(Debug, Clone)]
pub enum Store {
    Postgres(PgStore),
    Memory(MemoryStore),
}

impl Store {
    /// Connect to Postgres and apply migrations, or fall back to memory.
    ///
    /// Never fails: a missing `DATABASE_URL`, an unreachable server or a
    /// failed migration each log a warning and yield [`Store::Memory`].
    pub async fn connect(config: &AppConfig) -> Self {
        match Self::try_connect(config).await {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(error = %e, "results will not be saved; using in-memory store");
                Store::Memory(MemoryStore::new())
            }
        }
    }

    /// Like [`Store::connect`] but reports why Postgres is unavailable.
    ///
    /// # Errors
    ///
    /// - [`DbError::Unavailable`]: `DATABASE_URL` is not set.
    /// - [`DbError::Sqlx`]: the pool cannot connect.
    /// - [`DbError::Migration`]: migrations fail.
    pub async fn try_connect(config: &AppConfig) -> Result<Self, DbError> {
        let database_url = config
            .database_url
            .as_deref()
            .ok_or_else(|| DbError::Unavailable("DATABASE_URL is not set".to_string()))?;
        let pool = connect_pool(database_url, PoolConfig::from_app_config(config)).await?;
        let applied = run_migrations(&pool).await?;
        tracing::info!(applied, "connected to postgres");
        Ok(Store::Postgres(PgStore::new(pool)))
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Store::Memory(MemoryStore::new())
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Store::Postgres(_))
    }

    #[must_use]
    pub fn backend(&self) -> &'static str {
        match self {
            Store::Postgres(_) => "postgres",
            Store::Memory(_) => "memory",
        }
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if the Postgres ping fails. The memory store always answers.
    pub async fn ping(&self) -> Result<(), DbError> {
        match self {
            Store::Postgres(pg) => Ok(ping(&pg.pool).await?),
            Store::Memory(_) => Ok(()),
        }
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if the Postgres upsert fails.
    pub async fn upsert_summary(&self, record: &SummaryRecord) -> Result<(), DbError> {
        match self {
            Store::Postgres(pg) => summaries::upsert_summary(&pg.pool, record).await.map(drop),
            Store::Memory(mem) => {
                mem.upsert_summary(record).await;
                Ok(())
            }
        }
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if the Postgres upsert fails.
    pub async fn upsert_comparison(&self, comparison: &ScreenshotComparison) -> Result<(), DbError> {
        match self {
            Store::Postgres(pg) => comparisons::upsert_comparison(&pg.pool, comparison)
                .await
                .map(drop),
            Store::Memory(mem) => {
                mem.upsert_comparison(comparison).await;
                Ok(())
            }
        }
    }

    /// Summaries for one competitor within `range`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] on Postgres query or decode failure.
    pub async fn query_trend(
        &self,
        competitor: &str,
        range: DateRange,
    ) -> Result<Vec<SummaryRecord>, DbError> {
        match self {
            Store::Postgres(pg) => summaries::query_trend(&pg.pool, competitor, range).await,
            Store::Memory(mem) => Ok(mem.query_trend(competitor, range).await),
        }
    }

    /// # Errors
    ///
    /// Returns [`DbError`] on Postgres query or decode failure.
    pub async fn trend_analysis(
        &self,
        competitor: &str,
        range: DateRange,
    ) -> Result<TrendAnalysis, DbError> {
        let records = self.query_trend(competitor, range).await?;
        Ok(TrendAnalysis::from_records(competitor, range, &records))
    }

    /// # Errors
    ///
    /// Returns [`DbError`] on Postgres query or decode failure.
    pub async fn list_summaries(
        &self,
        filter: &SummaryFilter,
    ) -> Result<Vec<SummaryRecord>, DbError> {
        match self {
            Store::Postgres(pg) => summaries::list_summaries(&pg.pool, filter).await,
            Store::Memory(mem) => Ok(mem.list_summaries(filter).await),
        }
    }

    /// # Errors
    ///
    /// Returns [`DbError`] on Postgres query or decode failure.
    pub async fn latest_per_competitor(
        &self,
        per_competitor: i64,
    ) -> Result<Vec<SummaryRecord>, DbError> {
        match self {
            Store::Postgres(pg) => summaries::latest_per_competitor(&pg.pool, per_competitor).await,
            Store::Memory(mem) => Ok(mem.latest_per_competitor(per_competitor).await),
        }
    }

    /// # Errors
    ///
    /// Returns [`DbError`] on Postgres query failure.
    pub async fn list_comparisons(
        &self,
        competitor: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<ScreenshotComparison>, DbError> {
        match self {
            Store::Postgres(pg) => comparisons::list_comparisons(&pg.pool, competitor, limit).await,
            Store::Memory(mem) => Ok(mem.list_comparisons(competitor, limit).await),
        }
    }

    /// Delete summaries dated before `cutoff` and comparisons captured before
    /// its start.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a Postgres delete fails.
    pub async fn prune_before(&self, cutoff: NaiveDate) -> Result<PruneCounts, DbError> {
        match self {
            Store::Postgres(pg) => {
                let summaries = summaries::delete_summaries_before(&pg.pool, cutoff).await?;
                let comparisons = comparisons::delete_comparisons_before(
                    &pg.pool,
                    cutoff.and_time(chrono::NaiveTime::MIN).and_utc(),
                )
                .await?;
                Ok(PruneCounts {
                    summaries,
                    comparisons,
                })
            }
            Store::Memory(mem) => Ok(mem.prune_before(cutoff).await),
        }
    }

    /// Delete rows dated more than `keep_days` days before today.
    ///
    /// # Errors
    ///
    /// See [`Store::prune_before`].
    pub async fn prune_older_than(&self, keep_days: u32) -> Result<PruneCounts, DbError> {
        let cutoff = Utc::now()
            .date_naive()
            .checked_sub_days(Days::new(u64::from(keep_days)))
            .unwrap_or(NaiveDate::MIN);
        self.prune_before(cutoff).await
    }

    /// # Errors
    ///
    /// Returns [`DbError`] if the Postgres transaction fails.
    pub async fn seed_competitors(&self, competitors: &[CompetitorConfig]) -> Result<usize, DbError> {
        match self {
            Store::Postgres(pg) => seed::seed_competitors(&pg.pool, competitors).await,
            Store::Memory(mem) => Ok(mem.seed_competitors(competitors).await),
        }
    }
}
