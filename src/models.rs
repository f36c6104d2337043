//! API Models

use crate::detections::DetectionEvent;
use crate::tenancy::{Customer, ProfileRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Standard API response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded
    pub success: bool,
    /// Payload on success
    pub data: Option<T>,
    /// Details on failure
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    /// Successful response
    pub fn success(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    /// Failed response
    pub fn error(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorResponse {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

// ============ Session ============

/// Login request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Login name
    pub username: String,
    /// Plain-text password
    pub password: String,
}

/// Issued session
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Signed session token
    pub token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: i64,
    /// Login name
    pub username: String,
    /// Platform administrator
    pub is_superuser: bool,
}

/// Dashboard landing data
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IndexResponse {
    /// Login name
    pub username: String,
    /// Tenant name, when the user has a profile
    pub customer_name: Option<String>,
    /// AI report unlocked
    pub has_llm_permission: bool,
    /// Drone dispatch unlocked
    pub has_drone_permission: bool,
    /// Usable module slugs
    pub modules: Vec<String>,
}

/// Shown to tenants whose service is suspended
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuspendedResponse {
    /// Page title
    pub title: String,
    /// Explanation for the tenant
    pub message: String,
}

// ============ Profile ============

/// Caller's profile with its customer
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    /// Account ID
    pub user_id: Uuid,
    /// Login name
    pub username: String,
    /// Display role
    pub role: ProfileRole,
    /// Owning customer
    pub customer: Customer,
}

/// Caller's currently usable modules
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ModulesResponse {
    /// Module slugs, sorted
    pub modules: Vec<String>,
}

// ============ Detections ============

/// Event as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventView {
    /// Stored event
    #[serde(flatten)]
    pub event: DetectionEvent,
    /// Public URL of the snapshot
    pub image_url: String,
    /// Readable violation summary
    pub violation: String,
}

/// Ingestion result
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventCreated {
    /// New event ID
    pub id: Uuid,
    /// Always "success"
    pub status: String,
}

// ============ Features ============

/// Generated daily report
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportResponse {
    /// Markdown body
    pub report: String,
    /// Generation time
    pub generated_at: DateTime<Utc>,
    /// Events in today's report
    pub event_count: usize,
    /// `llm` or `summary` when the LLM was unavailable
    pub source: String,
}
