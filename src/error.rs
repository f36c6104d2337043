//! HTTP-facing errors

use crate::detections::IngestError;
use crate::middleware::auth::AuthError;
use crate::models::ApiResponse;
use crate::tenancy::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Error returned by route handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed request
    #[error("{0}")]
    BadRequest(String),

    /// No session
    #[error("authentication required")]
    Unauthenticated,

    /// Login failed
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Account is not linked to a customer
    #[error("no customer profile is attached to this account")]
    NoProfile,

    /// Module not subscribed
    #[error("an active subscription to '{0}' is required")]
    SubscriptionRequired(String),

    /// Missing resource
    #[error("{0}")]
    NotFound(String),

    /// Collaborator failure
    #[error("{0}")]
    Upstream(String),

    /// Anything else
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::NoProfile | ApiError::SubscriptionRequired(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::NoProfile => "no_profile",
            ApiError::SubscriptionRequired(_) => "subscription_required",
            ApiError::NotFound(_) => "not_found",
            ApiError::Upstream(_) => "upstream_error",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        }
        let body: ApiResponse<()> = ApiResponse::error(self.code(), &self.to_string());
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::InvalidToken | AuthError::ExpiredToken => ApiError::Unauthenticated,
            AuthError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Invalid(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
