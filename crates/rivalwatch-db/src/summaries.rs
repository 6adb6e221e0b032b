//! Database operations for the `summaries` table.

use chrono::{DateTime, NaiveDate, Utc};
use rivalwatch_core::{Confidence, DateRange, SourceMethod, SummaryRecord};
use serde_json::Value;
use sqlx::PgPool;

use crate::{DbError, SummaryFilter};

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `summaries` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SummaryRow {
    pub id: i64,
    pub competitor: String,
    pub captured_on: NaiveDate,
    pub bullets: Value,
    pub insight: String,
    pub impact_score: i16,
    pub confidence: String,
    pub source: String,
    pub categories: Value,
    pub placeholder: bool,
    pub content_hash: Option<String>,
    pub raw_content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SummaryRow> for SummaryRecord {
    type Error = DbError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        let invalid = |what: &str| DbError::InvalidRow(format!("summaries.id={}: {what}", row.id));

        let impact_score = u8::try_from(row.impact_score)
            .ok()
            .filter(|score| *score <= 100)
            .ok_or_else(|| invalid("impact_score out of range"))?;
        let source = SourceMethod::parse(&row.source).ok_or_else(|| invalid("unknown source"))?;
        let bullets: Vec<String> =
            serde_json::from_value(row.bullets.clone()).map_err(|e| invalid(&e.to_string()))?;
        let categories: Vec<String> =
            serde_json::from_value(row.categories.clone()).map_err(|e| invalid(&e.to_string()))?;

        Ok(SummaryRecord {
            competitor: row.competitor,
            captured_on: row.captured_on,
            bullets,
            insight: row.insight,
            impact_score,
            confidence: Confidence::parse_lenient(&row.confidence),
            source,
            categories,
            placeholder: row.placeholder,
            content_hash: row.content_hash,
            raw_content: row.raw_content,
        })
    }
}

fn into_records(rows: Vec<SummaryRow>) -> Result<Vec<SummaryRecord>, DbError> {
    rows.into_iter().map(SummaryRecord::try_from).collect()
}

const SUMMARY_COLUMNS: &str = "id, competitor, captured_on, bullets, insight, impact_score, \
     confidence, source, categories, placeholder, content_hash, raw_content, created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert or replace the summary for `(competitor, captured_on)`.
///
/// A second run on the same day overwrites the earlier record.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_summary(pool: &PgPool, record: &SummaryRecord) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO summaries \
             (competitor, captured_on, bullets, insight, impact_score, confidence, source, \
              categories, placeholder, content_hash, raw_content) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT (competitor, captured_on) DO UPDATE SET \
             bullets = EXCLUDED.bullets, \
             insight = EXCLUDED.insight, \
             impact_score = EXCLUDED.impact_score, \
             confidence = EXCLUDED.confidence, \
             source = EXCLUDED.source, \
             categories = EXCLUDED.categories, \
             placeholder = EXCLUDED.placeholder, \
             content_hash = EXCLUDED.content_hash, \
             raw_content = EXCLUDED.raw_content, \
             updated_at = NOW() \
         RETURNING id",
    )
    .bind(&record.competitor)
    .bind(record.captured_on)
    .bind(Value::from(record.bullets.clone()))
    .bind(&record.insight)
    .bind(i16::from(record.impact_score))
    .bind(record.confidence.as_str())
    .bind(record.source.as_str())
    .bind(Value::from(record.categories.clone()))
    .bind(record.placeholder)
    .bind(&record.content_hash)
    .bind(&record.raw_content)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Summaries for one competitor within `range`, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure or [`DbError::InvalidRow`] if a
/// stored row cannot be decoded.
pub async fn query_trend(
    pool: &PgPool,
    competitor: &str,
    range: DateRange,
) -> Result<Vec<SummaryRecord>, DbError> {
    let rows = sqlx::query_as::<_, SummaryRow>(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM summaries \
         WHERE competitor = $1 AND captured_on BETWEEN $2 AND $3 \
         ORDER BY captured_on ASC"
    ))
    .bind(competitor)
    .bind(range.from)
    .bind(range.to)
    .fetch_all(pool)
    .await?;

    into_records(rows)
}

/// Summaries matching `filter`, newest first, then by competitor name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure or [`DbError::InvalidRow`] if a
/// stored row cannot be decoded.
pub async fn list_summaries(
    pool: &PgPool,
    filter: &SummaryFilter,
) -> Result<Vec<SummaryRecord>, DbError> {
    let rows = sqlx::query_as::<_, SummaryRow>(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM summaries \
         WHERE ($1::TEXT IS NULL OR competitor = $1) \
           AND ($2::DATE IS NULL OR captured_on >= $2) \
           AND ($3::DATE IS NULL OR captured_on <= $3) \
         ORDER BY captured_on DESC, competitor ASC \
         LIMIT $4"
    ))
    .bind(filter.competitor.as_deref())
    .bind(filter.range.map(|r| r.from))
    .bind(filter.range.map(|r| r.to))
    .bind(filter.effective_limit())
    .fetch_all(pool)
    .await?;

    into_records(rows)
}

/// The `per_competitor` most recent summaries of every competitor, ranked by
/// impact (highest first), then competitor name, then date (newest first).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure or [`DbError::InvalidRow`] if a
/// stored row cannot be decoded.
pub async fn latest_per_competitor(
    pool: &PgPool,
    per_competitor: i64,
) -> Result<Vec<SummaryRecord>, DbError> {
    let rows = sqlx::query_as::<_, SummaryRow>(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM ( \
             SELECT *, ROW_NUMBER() OVER ( \
                 PARTITION BY competitor ORDER BY captured_on DESC \
             ) AS rn \
             FROM summaries \
         ) ranked \
         WHERE rn <= $1 \
         ORDER BY impact_score DESC, competitor ASC, captured_on DESC"
    ))
    .bind(per_competitor.max(1))
    .fetch_all(pool)
    .await?;

    into_records(rows)
}

/// Delete summaries captured before `cutoff`. Returns the number removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_summaries_before(pool: &PgPool, cutoff: NaiveDate) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM summaries WHERE captured_on < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
