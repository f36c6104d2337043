//! Login, logout, landing and suspension endpoints

use crate::error::ApiError;
use crate::middleware::auth::{verify_password, Caller};
use crate::middleware::has_module_permission;
use crate::routes::require_user;
use crate::tenancy::model::slugs;
use crate::{models::*, ApiState};
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use std::sync::Arc;

/// Session routes, mounted at the root
pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/", get(index))
        .route("/login/", axum::routing::post(login))
        .route("/logout/", get(logout).post(logout))
        .route("/service-suspended/", get(service_suspended))
}

/// Landing data for the dashboard
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Feature flags for the caller, in the response envelope", body = IndexResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse)
    ),
    tag = "session"
)]
pub async fn index(State(state): State<Arc<ApiState>>, caller: Caller) -> Result<Json<ApiResponse<IndexResponse>>, ApiError> {
    let user = require_user(&caller)?;
    let now = Utc::now();
    let store = state.store.as_ref();

    let customer = state.store.customer_for_user(user.user_id).await?;
    let modules = match &customer {
        Some(c) => state.store.valid_module_slugs(c.license_key, now).await?,
        None => Vec::new(),
    };

    Ok(Json(ApiResponse::success(IndexResponse {
        username: user.username.clone(),
        customer_name: customer.map(|c| c.name),
        has_llm_permission: has_module_permission(store, &caller, slugs::PPE_LLM, now).await,
        has_drone_permission: has_module_permission(store, &caller, slugs::PPE_DRONE, now).await,
        modules,
    })))
}

/// Exchange credentials for a session token
#[utoipa::path(
    post,
    path = "/login/",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued and session cookie set", body = LoginResponse),
        (status = 401, description = "Bad credentials", body = ErrorResponse)
    ),
    tag = "session"
)]
pub async fn login(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let Some(user) = state.store.user_by_username(req.username.trim()).await? else {
        tracing::info!(username = %req.username, "Login failed: unknown user");
        return Err(ApiError::InvalidCredentials);
    };

    if let Err(e) = verify_password(&req.password, &user.password_hash) {
        tracing::info!(username = %user.username, "Login failed");
        return Err(e.into());
    }

    let token = state.tokens.issue(user.id, &user.username)?;
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        state.tokens.cookie_name,
        token,
        state.tokens.lifetime_secs()
    );
    tracing::info!(username = %user.username, "Login succeeded");

    let body = ApiResponse::success(LoginResponse {
        token,
        token_type: "Bearer".into(),
        expires_in: state.tokens.lifetime_secs(),
        username: user.username,
        is_superuser: user.is_superuser,
    });
    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Clear the session cookie
#[utoipa::path(
    post,
    path = "/logout/",
    responses((status = 200, description = "Session cookie cleared")),
    tag = "session"
)]
pub async fn logout(State(state): State<Arc<ApiState>>, caller: Caller) -> Response {
    if let Some(user) = caller.user() {
        tracing::info!(username = %user.username, "Logged out");
    }
    let cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", state.tokens.cookie_name);
    (
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::success("logged out")),
    )
        .into_response()
}

/// Shown to tenants whose account or subscriptions have lapsed
#[utoipa::path(
    get,
    path = "/service-suspended/",
    responses((status = 200, description = "Suspension notice", body = SuspendedResponse)),
    tag = "session"
)]
pub async fn service_suspended() -> Json<ApiResponse<SuspendedResponse>> {
    Json(ApiResponse::success(SuspendedResponse {
        title: "Service suspended".into(),
        message: "Your subscription has expired or your account is inactive. \
                  Please contact your administrator to renew access."
            .into(),
    }))
}
