//! Detection event endpoints

use crate::detections::{NewDetection, Snapshot};
use crate::error::ApiError;
use crate::middleware::auth::Caller;
use crate::routes::require_tenant;
use crate::{models::*, ApiState};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use std::sync::Arc;
use utoipa::ToSchema;

/// Largest accepted upload
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Event routes
pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/events/", get(list_events).post(create_event))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Multipart form accepted by the ingestion endpoint
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct EventUpload {
    camera_id: String,
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
    /// JSON detections payload
    detections: String,
    person_name: Option<String>,
    person_id: Option<String>,
}

/// Caller tenant's events, newest first
#[utoipa::path(
    get,
    path = "/api/v1/ppe/events/",
    responses(
        (status = 200, description = "Events, in the response envelope", body = [EventView]),
        (status = 401, description = "Not logged in", body = ErrorResponse),
        (status = 403, description = "No customer profile", body = ErrorResponse)
    ),
    tag = "detections"
)]
pub async fn list_events(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
) -> Result<Json<ApiResponse<Vec<EventView>>>, ApiError> {
    let (_, customer) = require_tenant(&state, &caller).await?;
    let media = state.ingest.media();

    let events = state
        .store
        .events_for(customer.license_key)
        .await?
        .into_iter()
        .map(|event| EventView {
            image_url: media.url(&event.image),
            violation: event.parsed_detections().violation_summary(),
            event,
        })
        .collect();

    Ok(Json(ApiResponse::success(events)))
}

/// Report a violation
///
/// The owning customer always comes from the caller's profile; a
/// `customer` form field is ignored.
#[utoipa::path(
    post,
    path = "/api/v1/ppe/events/",
    request_body(content = EventUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Event stored, in the response envelope", body = EventCreated),
        (status = 400, description = "Malformed submission", body = ErrorResponse),
        (status = 401, description = "Not logged in", body = ErrorResponse),
        (status = 403, description = "No customer profile", body = ErrorResponse)
    ),
    tag = "detections"
)]
pub async fn create_event(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<EventCreated>>), ApiError> {
    let (user, customer) = require_tenant(&state, &caller).await?;
    let now = Utc::now();
    let new = read_submission(multipart).await?;

    let (event, _delivery) = state.ingest.ingest_detection(&customer, new, now).await?;
    tracing::debug!(event = %event.id, user = %user.username, "Event ingested");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(EventCreated {
            id: event.id,
            status: "success".into(),
        })),
    ))
}

async fn read_submission(mut multipart: Multipart) -> Result<NewDetection, ApiError> {
    let mut camera_id = None;
    let mut image = None;
    let mut detections = None;
    let mut person_name = None;
    let mut person_id = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().map(String::from);
                let bytes = field.bytes().await.map_err(bad_field)?;
                image = Some(Snapshot { bytes: bytes.to_vec(), file_name });
            }
            "camera_id" => camera_id = Some(field.text().await.map_err(bad_field)?),
            "detections" => detections = Some(field.text().await.map_err(bad_field)?),
            "person_name" => person_name = Some(field.text().await.map_err(bad_field)?),
            "person_id" => person_id = Some(field.text().await.map_err(bad_field)?),
            other => tracing::debug!(field = other, "Ignoring form field"),
        }
    }

    let camera_id = camera_id.ok_or_else(|| ApiError::BadRequest("camera_id is required".into()))?;
    let image = image
        .filter(|i| !i.bytes.is_empty())
        .ok_or_else(|| ApiError::BadRequest("image is required".into()))?;
    let detections = detections.ok_or_else(|| ApiError::BadRequest("detections is required".into()))?;
    let detections = serde_json::from_str(&detections)
        .map_err(|e| ApiError::BadRequest(format!("detections is not valid JSON: {}", e)))?;

    Ok(NewDetection {
        camera_id,
        image,
        detections,
        person_name,
        person_id,
    })
}

fn bad_field(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("unreadable form field: {}", e))
}
