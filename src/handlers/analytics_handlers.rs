use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::error;

use crate::handlers::error_response;
use crate::models::analytics::{
    DashboardResponse, Granularity, Period, RealtimeResponse, TrendsResponse,
};
use crate::routes::AppState;
use crate::services::analytics::{
    compute_dashboard_metrics, compute_realtime_summary, compute_trends, DEFAULT_TREND_DAYS,
};

#[derive(Deserialize)]
pub struct DashboardQuery {
    period: Option<String>,
}

#[derive(Deserialize)]
pub struct TrendsQuery {
    /// Bucket width token; the wire name is `period` for historical reasons.
    period: Option<String>,
    days: Option<i64>,
}

pub async fn get_dashboard_metrics(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, (StatusCode, Json<Value>)> {
    let period = Period::parse(query.period.as_deref().unwrap_or_default());

    match compute_dashboard_metrics(state.store.as_ref(), &tracking_id, period).await {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            error!(error = %err, tracking_id = %tracking_id, "error fetching dashboard data");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch dashboard data",
            ))
        }
    }
}

pub async fn get_realtime_summary(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
) -> Result<Json<RealtimeResponse>, (StatusCode, Json<Value>)> {
    match compute_realtime_summary(state.store.as_ref(), &tracking_id).await {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            error!(error = %err, tracking_id = %tracking_id, "error fetching realtime data");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch realtime data",
            ))
        }
    }
}

pub async fn get_trends(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<TrendsResponse>, (StatusCode, Json<Value>)> {
    let granularity = Granularity::parse(query.period.as_deref().unwrap_or_default());
    let days = query.days.unwrap_or(DEFAULT_TREND_DAYS);

    match compute_trends(state.store.as_ref(), &tracking_id, granularity, days).await {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            error!(error = %err, tracking_id = %tracking_id, "error fetching trends data");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch trends data",
            ))
        }
    }
}
