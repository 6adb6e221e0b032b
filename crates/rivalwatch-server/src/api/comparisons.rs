use axum::{
    extract::{Query, State},
    Extension, Json,
};
use rivalwatch_core::ScreenshotComparison;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ComparisonQuery {
    pub competitor: Option<String>,
    pub limit: Option<i64>,
}

/// Screenshot comparisons, newest first.
pub(super) async fn list_comparisons(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ComparisonQuery>,
) -> Result<Json<ApiResponse<Vec<ScreenshotComparison>>>, ApiError> {
    let data = state
        .store
        .list_comparisons(query.competitor.as_deref(), Some(normalize_limit(query.limit)))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
