//! Session competitor list. Additions are kept in memory for the life of the
//! process and, when a database is configured, seeded into it.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use rivalwatch_core::{CompetitorConfig, Platform};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct CompetitorQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateCompetitorRequest {
    pub name: String,
    pub url: String,
    pub category: String,
    pub platform: Option<Platform>,
    pub description: Option<String>,
    pub homepage: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct CompetitorItem {
    name: String,
    slug: String,
    url: String,
    category: String,
    platform: Platform,
    description: Option<String>,
    homepage: Option<String>,
}

impl From<&CompetitorConfig> for CompetitorItem {
    fn from(c: &CompetitorConfig) -> Self {
        Self {
            name: c.name.clone(),
            slug: c.slug(),
            url: c.url.clone(),
            category: c.category.clone(),
            platform: c.effective_platform(),
            description: c.description.clone(),
            homepage: c.homepage.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub(super) async fn list_competitors(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CompetitorQuery>,
) -> Json<ApiResponse<Vec<CompetitorItem>>> {
    let file = state.competitors.read().await;
    let data = match query.category.as_deref() {
        Some(category) => file.by_category(category).into_iter().map(CompetitorItem::from).collect(),
        None => file.competitors.iter().map(CompetitorItem::from).collect(),
    };

    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn create_competitor(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateCompetitorRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CompetitorItem>>), ApiError> {
    let competitor = CompetitorConfig {
        name: body.name.trim().to_string(),
        url: body.url.trim().to_string(),
        category: body.category.trim().to_string(),
        platform: body.platform,
        description: body.description,
        homepage: body.homepage,
    };

    competitor
        .validate()
        .map_err(|e| ApiError::new(&req_id.0, "validation_error", e.to_string()))?;

    {
        let mut file = state.competitors.write().await;
        let slug = competitor.slug();
        if file.find(&competitor.name).is_some() || file.find(&slug).is_some() {
            return Err(ApiError::new(
                &req_id.0,
                "conflict",
                format!("competitor '{}' already exists", competitor.name),
            ));
        }
        file.push(competitor.clone())
            .map_err(|e| ApiError::new(&req_id.0, "validation_error", e.to_string()))?;
    }

    if state.store.is_persistent() {
        if let Err(e) = state
            .store
            .seed_competitors(std::slice::from_ref(&competitor))
            .await
        {
            tracing::warn!(
                competitor = %competitor.name,
                error = %e,
                "failed to seed new competitor into the database"
            );
        }
    }

    tracing::info!(competitor = %competitor.name, category = %competitor.category, "competitor added");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: CompetitorItem::from(&competitor),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}
