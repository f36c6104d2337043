//! Module-gated features: AI report and drone dispatch

use crate::error::ApiError;
use crate::integrations::DroneDispatch;
use crate::middleware::auth::Caller;
use crate::middleware::ModuleGate;
use crate::reports::DailyDigest;
use crate::routes::{require_tenant, require_user};
use crate::tenancy::model::slugs;
use crate::{models::*, ApiState};
use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use std::sync::Arc;

/// Module-gated feature routes
pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/report/generate/", post(generate_report))
        .route("/drone/dispatch/", post(dispatch_drone))
}

/// Write today's safety report
#[utoipa::path(
    post,
    path = "/api/v1/report/generate/",
    responses(
        (status = 200, description = "Markdown report, in the response envelope", body = ReportResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse),
        (status = 403, description = "No ppe_llm subscription", body = ErrorResponse)
    ),
    tag = "features"
)]
pub async fn generate_report(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
) -> Result<Json<ApiResponse<ReportResponse>>, ApiError> {
    require_user(&caller)?;
    let now = Utc::now();
    if !ModuleGate::new(slugs::PPE_LLM).check(state.store.as_ref(), &caller, now).await {
        return Err(ApiError::SubscriptionRequired(slugs::PPE_LLM.into()));
    }

    let (_, customer) = require_tenant(&state, &caller).await?;
    let events = state.store.events_for(customer.license_key).await?;
    let digest = DailyDigest::build(&customer.name, &events, now);

    let llm_report = match &state.llm {
        Some(llm) => match llm.complete(&digest.prompt()).await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(customer = %customer.name, "Report generation via LLM failed: {}", e);
                None
            }
        },
        None => None,
    };

    let (report, source) = match llm_report {
        Some(report) => (report, "llm"),
        None => (digest.to_markdown(), "summary"),
    };

    Ok(Json(ApiResponse::success(ReportResponse {
        report,
        generated_at: now,
        event_count: digest.total,
        source: source.into(),
    })))
}

/// Launch the configured drone workflow
#[utoipa::path(
    post,
    path = "/api/v1/drone/dispatch/",
    responses(
        (status = 200, description = "Mission accepted, in the response envelope", body = DroneDispatch),
        (status = 401, description = "Not logged in", body = ErrorResponse),
        (status = 403, description = "No ppe_drone subscription", body = ErrorResponse),
        (status = 500, description = "Drone API rejected the mission", body = ErrorResponse)
    ),
    tag = "features"
)]
pub async fn dispatch_drone(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
) -> Result<Json<ApiResponse<DroneDispatch>>, ApiError> {
    let user = require_user(&caller)?;
    let now = Utc::now();
    let gate = ModuleGate::new(slugs::PPE_DRONE).allow_superuser();
    if !gate.check(state.store.as_ref(), &caller, now).await {
        return Err(ApiError::SubscriptionRequired(gate.slug().into()));
    }

    tracing::info!(user = %user.username, "Drone dispatch requested");
    let dispatch = state
        .drone
        .trigger_mission(now)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    Ok(Json(ApiResponse::success(dispatch)))
}
