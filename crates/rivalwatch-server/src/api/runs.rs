//! On-demand pipeline runs. One run at a time per process; a second request
//! while a run is in flight gets `409 conflict`.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use rivalwatch_core::CompetitorConfig;
use rivalwatch_pipeline::{RunControl, RunReport};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct RunQuery {
    /// Limit the run to one competitor; all session competitors otherwise.
    pub competitor: Option<String>,
}

pub(super) async fn create_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RunQuery>,
) -> Result<Json<ApiResponse<RunReport>>, ApiError> {
    let Ok(_guard) = state.run_lock.try_lock() else {
        return Err(ApiError::new(
            &req_id.0,
            "conflict",
            "a pipeline run is already in progress",
        ));
    };

    let competitors: Vec<CompetitorConfig> = {
        let file = state.competitors.read().await;
        match query.competitor.as_deref() {
            Some(name) => vec![file.find(name).cloned().ok_or_else(|| {
                ApiError::new(
                    &req_id.0,
                    "not_found",
                    format!("competitor '{name}' is not configured"),
                )
            })?],
            None => file.competitors.clone(),
        }
    };

    tracing::info!(
        request_id = %req_id.0,
        competitors = competitors.len(),
        "starting pipeline run"
    );
    let report = state.pipeline.run(&competitors, &RunControl::new()).await;
    tracing::info!(
        request_id = %req_id.0,
        outcomes = report.outcomes.len(),
        unsaved = report.unsaved_count(),
        "pipeline run finished"
    );

    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}
