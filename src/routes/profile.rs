//! Profile and module endpoints

use crate::error::ApiError;
use crate::middleware::auth::Caller;
use crate::routes::require_user;
use crate::{models::*, ApiState};
use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use std::sync::Arc;

/// Profile routes
pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/profile/", get(get_profile))
        .route("/modules/", get(list_modules))
}

/// Caller's profile
#[utoipa::path(
    get,
    path = "/api/v1/profile/",
    responses(
        (status = 200, description = "Profile with its customer, in the response envelope", body = ProfileResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse),
        (status = 404, description = "No profile attached", body = ErrorResponse)
    ),
    tag = "profile"
)]
pub async fn get_profile(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
) -> Result<Json<ApiResponse<ProfileResponse>>, ApiError> {
    let user = require_user(&caller)?;
    let profile = state
        .store
        .profile_for_user(user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("no profile for this account".into()))?;
    let customer = state
        .store
        .customer(profile.customer)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("customer {}", profile.customer)))?;

    Ok(Json(ApiResponse::success(ProfileResponse {
        user_id: user.user_id,
        username: user.username.clone(),
        role: profile.role,
        customer,
    })))
}

/// Modules the caller's tenant may use right now
#[utoipa::path(
    get,
    path = "/api/v1/modules/",
    responses(
        (status = 200, description = "Valid module slugs, in the response envelope", body = ModulesResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse)
    ),
    tag = "profile"
)]
pub async fn list_modules(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
) -> Result<Json<ApiResponse<ModulesResponse>>, ApiError> {
    let user = require_user(&caller)?;
    let modules = match state.store.customer_for_user(user.user_id).await? {
        Some(customer) => state.store.valid_module_slugs(customer.license_key, Utc::now()).await?,
        None => Vec::new(),
    };
    Ok(Json(ApiResponse::success(ModulesResponse { modules })))
}
