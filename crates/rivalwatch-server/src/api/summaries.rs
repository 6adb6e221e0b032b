use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use rivalwatch_core::{Confidence, DateRange, SourceMethod, SummaryRecord, TrendAnalysis};
use rivalwatch_db::SummaryFilter;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

const DEFAULT_TREND_DAYS: u32 = 30;
const MAX_TREND_DAYS: u32 = 365;

#[derive(Debug, Deserialize)]
pub(super) struct SummaryQuery {
    pub competitor: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LeaderboardQuery {
    pub per_competitor: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TrendQuery {
    pub days: Option<u32>,
}

/// Stored summary without the captured page text.
#[derive(Debug, Serialize)]
pub(super) struct SummaryItem {
    competitor: String,
    captured_on: NaiveDate,
    bullets: Vec<String>,
    insight: String,
    impact_score: u8,
    confidence: Confidence,
    source: SourceMethod,
    categories: Vec<String>,
    placeholder: bool,
}

impl From<SummaryRecord> for SummaryItem {
    fn from(r: SummaryRecord) -> Self {
        Self {
            competitor: r.competitor,
            captured_on: r.captured_on,
            bullets: r.bullets,
            insight: r.insight,
            impact_score: r.impact_score,
            confidence: r.confidence,
            source: r.source,
            categories: r.categories,
            placeholder: r.placeholder,
        }
    }
}

pub(super) async fn list_summaries(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<ApiResponse<Vec<SummaryItem>>>, ApiError> {
    let range = match (query.from, query.to) {
        (None, None) => None,
        (from, to) => {
            let from = from.unwrap_or_else(open_start);
            let to = to.unwrap_or_else(open_end);
            Some(DateRange::new(from, to).ok_or_else(|| {
                ApiError::new(&req_id.0, "bad_request", "`from` must not be after `to`")
            })?)
        }
    };

    let filter = SummaryFilter {
        competitor: query.competitor,
        range,
        limit: Some(normalize_limit(query.limit)),
    };
    let records = state
        .store
        .list_summaries(&filter)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: records.into_iter().map(SummaryItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Latest summaries per competitor, highest impact first.
pub(super) async fn leaderboard(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<ApiResponse<Vec<SummaryItem>>>, ApiError> {
    let per_competitor = query.per_competitor.unwrap_or(1).clamp(1, 10);
    let records = state
        .store
        .latest_per_competitor(per_competitor)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: records.into_iter().map(SummaryItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn trend(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(competitor): Path<String>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<ApiResponse<TrendAnalysis>>, ApiError> {
    let days = query.days.unwrap_or(DEFAULT_TREND_DAYS);
    if !(1..=MAX_TREND_DAYS).contains(&days) {
        return Err(ApiError::new(
            &req_id.0,
            "bad_request",
            format!("days must be between 1 and {MAX_TREND_DAYS}, got {days}"),
        ));
    }

    let name = state
        .competitors
        .read()
        .await
        .find(&competitor)
        .map(|c| c.name.clone())
        .ok_or_else(|| {
            ApiError::new(
                &req_id.0,
                "not_found",
                format!("competitor '{competitor}' is not configured"),
            )
        })?;

    let range = DateRange::last_days(days, Utc::now().date_naive());
    let trend = state
        .store
        .trend_analysis(&name, range)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: trend,
        meta: ResponseMeta::new(req_id.0),
    }))
}

// Bounds for a range given only one side.
fn open_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn open_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}
