//! Database operations for the `screenshot_comparisons` table.

use chrono::{DateTime, Utc};
use rivalwatch_core::ScreenshotComparison;
use sqlx::PgPool;

use crate::{clamp_limit, DbError};

/// A row from the `screenshot_comparisons` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ComparisonRow {
    pub id: i64,
    pub competitor: String,
    pub captured_at: DateTime<Utc>,
    pub before_path: String,
    pub after_path: String,
    pub diff_path: String,
    pub difference_score: f64,
    pub changed_ratio: f64,
    pub similarity: f64,
    pub significant: bool,
    pub threshold: f64,
    pub created_at: DateTime<Utc>,
}

impl From<ComparisonRow> for ScreenshotComparison {
    fn from(row: ComparisonRow) -> Self {
        Self {
            competitor: row.competitor,
            captured_at: row.captured_at,
            before_path: row.before_path,
            after_path: row.after_path,
            diff_path: row.diff_path,
            difference_score: row.difference_score,
            changed_ratio: row.changed_ratio,
            similarity: row.similarity,
            significant: row.significant,
            threshold: row.threshold,
        }
    }
}

/// Insert or replace the comparison for `(competitor, captured_at)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_comparison(
    pool: &PgPool,
    comparison: &ScreenshotComparison,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO screenshot_comparisons \
             (competitor, captured_at, before_path, after_path, diff_path, \
              difference_score, changed_ratio, similarity, significant, threshold) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (competitor, captured_at) DO UPDATE SET \
             before_path = EXCLUDED.before_path, \
             after_path = EXCLUDED.after_path, \
             diff_path = EXCLUDED.diff_path, \
             difference_score = EXCLUDED.difference_score, \
             changed_ratio = EXCLUDED.changed_ratio, \
             similarity = EXCLUDED.similarity, \
             significant = EXCLUDED.significant, \
             threshold = EXCLUDED.threshold \
         RETURNING id",
    )
    .bind(&comparison.competitor)
    .bind(comparison.captured_at)
    .bind(&comparison.before_path)
    .bind(&comparison.after_path)
    .bind(&comparison.diff_path)
    .bind(comparison.difference_score)
    .bind(comparison.changed_ratio)
    .bind(comparison.similarity)
    .bind(comparison.significant)
    .bind(comparison.threshold)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Most recent comparisons, optionally for one competitor.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_comparisons(
    pool: &PgPool,
    competitor: Option<&str>,
    limit: Option<i64>,
) -> Result<Vec<ScreenshotComparison>, DbError> {
    let rows = sqlx::query_as::<_, ComparisonRow>(
        "SELECT id, competitor, captured_at, before_path, after_path, diff_path, \
                difference_score, changed_ratio, similarity, significant, threshold, \
                created_at \
         FROM screenshot_comparisons \
         WHERE ($1::TEXT IS NULL OR competitor = $1) \
         ORDER BY captured_at DESC, competitor ASC \
         LIMIT $2",
    )
    .bind(competitor)
    .bind(clamp_limit(limit))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ScreenshotComparison::from).collect())
}

/// Delete comparisons captured before `cutoff`. Returns the number removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_comparisons_before(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM screenshot_comparisons WHERE captured_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
