//! Detection events: ingestion, payload parsing and dashboard statistics

pub mod ingest;
pub mod media;
pub mod payload;
pub mod stats;

use crate::tenancy::CustomerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub use ingest::{DetectionIngest, IngestError, NewDetection, Snapshot};
pub use media::MediaStore;
pub use payload::Detections;
pub use stats::{CameraCount, DailyCount, DashboardStats};

/// Person name recorded when the face was not recognised
pub const UNKNOWN_PERSON: &str = "Unknown";

/// Person ID recorded when the face was not recognised
pub const UNKNOWN_PERSON_ID: &str = "N/A";

/// One reported violation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DetectionEvent {
    /// Event ID
    pub id: Uuid,
    /// Owning tenant, always taken from the caller's profile
    #[schema(value_type = String, format = Uuid)]
    pub customer: CustomerId,
    /// Reporting camera
    pub camera_id: String,
    /// Media path of the snapshot, relative to the media root
    pub image: String,
    /// Raw detections payload
    #[schema(value_type = Object)]
    pub detections: serde_json::Value,
    /// Ingestion time
    pub timestamp: DateTime<Utc>,
    /// Set once a supervisor has dealt with it
    pub is_resolved: bool,
    /// Recognised person, or "Unknown"
    pub person_name: String,
    /// Employee ID, or "N/A"
    pub person_id: String,
}

impl DetectionEvent {
    /// Parsed view of the raw payload
    pub fn parsed_detections(&self) -> Detections {
        Detections::parse(&self.detections)
    }

    /// Whether the face matched a known employee
    pub fn has_identified_person(&self) -> bool {
        !self.person_name.is_empty() && self.person_name != UNKNOWN_PERSON
    }
}
