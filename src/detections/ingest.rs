//! Detection ingestion

use crate::detections::{DetectionEvent, MediaStore, UNKNOWN_PERSON, UNKNOWN_PERSON_ID};
use crate::notifications::{self, Alert, Notifier};
use crate::tenancy::{Customer, StoreError, TenantStore};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Uploaded snapshot
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Raw image data
    pub bytes: Vec<u8>,
    /// Client-supplied name, used only for the extension
    pub file_name: Option<String>,
}

/// Camera submission, before a tenant is attached
#[derive(Debug, Clone)]
pub struct NewDetection {
    /// Reporting camera
    pub camera_id: String,
    /// Violation snapshot
    pub image: Snapshot,
    /// Raw detections payload
    pub detections: Value,
    /// Recognised person, if any
    pub person_name: Option<String>,
    /// Recognised employee ID, if any
    pub person_id: Option<String>,
}

/// Stores events and hands them to the notifier
pub struct DetectionIngest {
    store: Arc<dyn TenantStore>,
    media: MediaStore,
    notifier: Arc<dyn Notifier>,
    public_base_url: String,
    notification_timeout: Duration,
}

impl DetectionIngest {
    /// Build the ingest pipeline
    pub fn new(
        store: Arc<dyn TenantStore>,
        media: MediaStore,
        notifier: Arc<dyn Notifier>,
        public_base_url: &str,
        notification_timeout: Duration,
    ) -> Self {
        Self {
            store,
            media,
            notifier,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            notification_timeout,
        }
    }

    /// Snapshot storage
    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    /// Persist an event owned by `customer`, then queue its alert.
    ///
    /// The returned handle belongs to the background delivery task; the
    /// event is already stored whatever that task does.
    pub async fn ingest_detection(
        &self,
        customer: &Customer,
        new: NewDetection,
        now: DateTime<Utc>,
    ) -> Result<(DetectionEvent, JoinHandle<()>), IngestError> {
        if new.camera_id.trim().is_empty() {
            return Err(IngestError::Invalid("camera_id is required".into()));
        }

        let image = self
            .media
            .save(&new.image.bytes, new.image.file_name.as_deref(), now)
            .await?;

        let event = DetectionEvent {
            id: Uuid::new_v4(),
            customer: customer.license_key,
            camera_id: new.camera_id.trim().to_string(),
            image,
            detections: new.detections,
            timestamp: now,
            is_resolved: false,
            person_name: or_sentinel(new.person_name, UNKNOWN_PERSON),
            person_id: or_sentinel(new.person_id, UNKNOWN_PERSON_ID),
        };

        let event = self.store.insert_event(event).await?;
        tracing::info!(
            event = %event.id,
            customer = %customer.name,
            camera = %event.camera_id,
            "Detection stored"
        );

        let image_url = format!("{}{}", self.public_base_url, self.media.url(&event.image));
        let alert = Alert::from_event(&event, &customer.name, Some(image_url));
        let delivery = notifications::dispatch(self.notifier.clone(), alert, self.notification_timeout);

        Ok((event, delivery))
    }
}

fn or_sentinel(value: Option<String>, sentinel: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| sentinel.to_string())
}

/// Ingestion error
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Submission rejected before storing
    #[error("invalid submission: {0}")]
    Invalid(String),
    /// Snapshot could not be written
    #[error("failed to store snapshot: {0}")]
    Media(#[from] std::io::Error),
    /// Event could not be stored
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::NotificationReport;
    use crate::tenancy::InMemoryStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct CapturingNotifier {
        alerts: Mutex<Vec<Alert>>,
    }

    #[async_trait]
    impl Notifier for CapturingNotifier {
        async fn notify(&self, alert: Alert) -> NotificationReport {
            self.alerts.lock().push(alert);
            NotificationReport::default()
        }
    }

    struct StallingNotifier;

    #[async_trait]
    impl Notifier for StallingNotifier {
        async fn notify(&self, _alert: Alert) -> NotificationReport {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            NotificationReport::default()
        }
    }

    fn submission(person_name: Option<&str>) -> NewDetection {
        NewDetection {
            camera_id: "CAM-07".into(),
            image: Snapshot {
                bytes: b"jpeg".to_vec(),
                file_name: Some("frame.jpg".into()),
            },
            detections: json!({"items": [{"class": "no_helmet", "confidence": 0.91}]}),
            person_name: person_name.map(String::from),
            person_id: None,
        }
    }

    fn media_root() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("ppeguard-ingest-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_event_owned_by_caller_tenant_with_sentinels() {
        let store = Arc::new(InMemoryStore::new());
        let acme = store.create_customer("Acme");
        let notifier = Arc::new(CapturingNotifier::default());
        let root = media_root();
        let ingest = DetectionIngest::new(
            store.clone(),
            MediaStore::new(&root, "/media/"),
            notifier.clone(),
            "https://ppe.example.com/",
            Duration::from_secs(5),
        );

        let (event, delivery) = ingest
            .ingest_detection(&acme, submission(Some("  ")), Utc::now())
            .await
            .unwrap();
        delivery.await.unwrap();

        assert_eq!(event.customer, acme.license_key);
        assert_eq!(event.person_name, UNKNOWN_PERSON);
        assert_eq!(event.person_id, UNKNOWN_PERSON_ID);
        assert_eq!(store.events_for(acme.license_key).await.unwrap().len(), 1);

        let alerts = notifier.alerts.lock();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].customer_name, "Acme");
        assert_eq!(alerts[0].violation, "No Helmet");
        assert!(alerts[0]
            .image_url
            .as_deref()
            .unwrap()
            .starts_with("https://ppe.example.com/media/detections/"));

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn test_stalled_notifier_does_not_block_ingest() {
        let store = Arc::new(InMemoryStore::new());
        let acme = store.create_customer("Acme");
        let root = media_root();
        let ingest = DetectionIngest::new(
            store.clone(),
            MediaStore::new(&root, "/media"),
            Arc::new(StallingNotifier),
            "http://localhost:8000",
            Duration::from_millis(50),
        );

        let (event, delivery) = ingest
            .ingest_detection(&acme, submission(Some("Jane")), Utc::now())
            .await
            .unwrap();
        assert_eq!(event.person_name, "Jane");
        assert_eq!(store.events_for(acme.license_key).await.unwrap().len(), 1);

        // the timeout ends the delivery task
        delivery.await.unwrap();

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn test_blank_camera_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let acme = store.create_customer("Acme");
        let ingest = DetectionIngest::new(
            store.clone(),
            MediaStore::new(media_root(), "/media"),
            Arc::new(CapturingNotifier::default()),
            "http://localhost:8000",
            Duration::from_secs(1),
        );

        let mut new = submission(None);
        new.camera_id = " ".into();
        assert!(matches!(
            ingest.ingest_detection(&acme, new, Utc::now()).await,
            Err(IngestError::Invalid(_))
        ));
        assert!(store.events_for(acme.license_key).await.unwrap().is_empty());
    }
}
