use chrono::{DateTime, Utc};
use rivalwatch_core::CompetitorConfig;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `competitors` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompetitorRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub url: String,
    pub category: String,
    pub platform: String,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert competitors from config into the database.
///
/// Returns the number of competitors processed (inserted or updated).
/// All upserts run inside a single transaction; if any operation fails
/// the entire batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_competitors(
    pool: &PgPool,
    competitors: &[CompetitorConfig],
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for competitor in competitors {
        sqlx::query(
            "INSERT INTO competitors (name, slug, url, category, platform, description, homepage) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (name) DO UPDATE SET \
                 slug = EXCLUDED.slug, \
                 url = EXCLUDED.url, \
                 category = EXCLUDED.category, \
                 platform = EXCLUDED.platform, \
                 description = EXCLUDED.description, \
                 homepage = EXCLUDED.homepage, \
                 updated_at = NOW()",
        )
        .bind(&competitor.name)
        .bind(competitor.slug())
        .bind(&competitor.url)
        .bind(&competitor.category)
        .bind(competitor.effective_platform().to_string())
        .bind(&competitor.description)
        .bind(&competitor.homepage)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}

/// All seeded competitors ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_seeded_competitors(pool: &PgPool) -> Result<Vec<CompetitorRow>, DbError> {
    let rows = sqlx::query_as::<_, CompetitorRow>(
        "SELECT id, name, slug, url, category, platform, description, homepage, \
                created_at, updated_at \
         FROM competitors ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
