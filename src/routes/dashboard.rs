//! Dashboard statistics endpoint

use crate::detections::DashboardStats;
use crate::error::ApiError;
use crate::middleware::auth::Caller;
use crate::routes::require_tenant;
use crate::{models::*, ApiState};
use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use std::sync::Arc;

/// Dashboard routes
pub fn router() -> Router<Arc<ApiState>> {
    Router::new().route("/dashboard/", get(get_dashboard_stats))
}

/// Totals, per-camera counts and the 7-day trend
#[utoipa::path(
    get,
    path = "/api/v1/ppe/dashboard/",
    responses(
        (status = 200, description = "Aggregates, in the response envelope", body = DashboardStats),
        (status = 401, description = "Not logged in", body = ErrorResponse),
        (status = 403, description = "No customer profile", body = ErrorResponse)
    ),
    tag = "detections"
)]
pub async fn get_dashboard_stats(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    let (_, customer) = require_tenant(&state, &caller).await?;
    let now = Utc::now();
    let events = state.store.events_for(customer.license_key).await?;
    Ok(Json(ApiResponse::success(DashboardStats::compute(&events, now))))
}
