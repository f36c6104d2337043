//! Violation alert delivery
//!
//! Alerts fan out to every configured channel after an event is stored.
//! Delivery is best effort: one attempt per channel, no retry, and a
//! failure is logged without affecting the ingest request.

use crate::detections::DetectionEvent;
use crate::integrations::{IntegrationError, SafetyAdvisor};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Advice used when the LLM is unavailable
pub const FALLBACK_ADVICE: &str = "Please verify safety compliance immediately.";

/// Alert about one stored event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Stored event
    pub event_id: Uuid,
    /// Tenant name
    pub customer_name: String,
    /// Reporting camera
    pub camera_id: String,
    /// Event time
    pub timestamp: DateTime<Utc>,
    /// Readable violation summary
    pub violation: String,
    /// Set only for recognised employees
    pub person_name: Option<String>,
    /// Employee ID of the recognised person
    pub person_id: Option<String>,
    /// Absolute snapshot URL
    pub image_url: Option<String>,
}

impl Alert {
    /// Alert for a stored event
    pub fn from_event(event: &DetectionEvent, customer_name: &str, image_url: Option<String>) -> Self {
        let identified = event.has_identified_person();
        Self {
            event_id: event.id,
            customer_name: customer_name.to_string(),
            camera_id: event.camera_id.clone(),
            timestamp: event.timestamp,
            violation: event.parsed_detections().violation_summary(),
            person_name: identified.then(|| event.person_name.clone()),
            person_id: identified.then(|| event.person_id.clone()),
            image_url,
        }
    }

    /// Message body sent to every channel
    pub fn message(&self, advice: &str) -> String {
        let mut text = format!(
            "*Safety alert* ({})\nViolation: {}\nCamera: {}\nTime: {}\n",
            self.customer_name,
            self.violation,
            self.camera_id,
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        );
        if let (Some(name), Some(id)) = (&self.person_name, &self.person_id) {
            text.push_str(&format!("Person: {} ({})\n", name, id));
        }
        text.push_str(&format!("Advice: {}", advice));
        text
    }
}

/// A destination for alert messages
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// Channel name for logs
    fn name(&self) -> &'static str;

    /// Deliver one message
    async fn send(&self, text: &str, image_url: Option<&str>) -> Result<(), IntegrationError>;
}

/// Outcome of one alert fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationReport {
    /// Channels that accepted the message
    pub delivered: Vec<&'static str>,
    /// Channels that errored
    pub failed: Vec<&'static str>,
}

/// Sends alerts for stored events
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver an alert; failures are reported, not raised
    async fn notify(&self, alert: Alert) -> NotificationReport;
}

/// Advisor plus channel fan-out
#[derive(Default)]
pub struct NotificationService {
    advisor: Option<Arc<dyn SafetyAdvisor>>,
    channels: Vec<Arc<dyn AlertChannel>>,
}

impl NotificationService {
    /// Service with no advisor and no channels
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `advisor` for the advice line
    pub fn with_advisor(mut self, advisor: Arc<dyn SafetyAdvisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    /// Add a delivery channel
    pub fn with_channel(mut self, channel: Arc<dyn AlertChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Number of configured channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    async fn advice_for(&self, alert: &Alert) -> String {
        let Some(advisor) = &self.advisor else {
            return FALLBACK_ADVICE.to_string();
        };
        match advisor.safety_advice(&alert.violation, &alert.camera_id).await {
            Ok(advice) => advice,
            Err(e) => {
                tracing::warn!(event = %alert.event_id, "Safety advice unavailable: {}", e);
                FALLBACK_ADVICE.to_string()
            }
        }
    }
}

#[async_trait]
impl Notifier for NotificationService {
    async fn notify(&self, alert: Alert) -> NotificationReport {
        let mut report = NotificationReport::default();
        if self.channels.is_empty() {
            return report;
        }

        let advice = self.advice_for(&alert).await;
        let text = alert.message(&advice);

        for channel in &self.channels {
            match channel.send(&text, alert.image_url.as_deref()).await {
                Ok(()) => {
                    tracing::info!(event = %alert.event_id, channel = channel.name(), "Alert delivered");
                    report.delivered.push(channel.name());
                }
                Err(e) => {
                    tracing::warn!(event = %alert.event_id, channel = channel.name(), "Alert delivery failed: {}", e);
                    report.failed.push(channel.name());
                }
            }
        }
        report
    }
}

/// Deliver an alert in the background, bounded by `timeout`
pub fn dispatch(notifier: Arc<dyn Notifier>, alert: Alert, timeout: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let event_id = alert.event_id;
        if tokio::time::timeout(timeout, notifier.notify(alert)).await.is_err() {
            tracing::warn!(event = %event_id, "Alert delivery timed out after {:?}", timeout);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<(String, Option<String>)>>,
        fail: bool,
    }

    #[async_trait]
    impl AlertChannel for RecordingChannel {
        fn name(&self) -> &'static str {
            if self.fail {
                "broken"
            } else {
                "recording"
            }
        }

        async fn send(&self, text: &str, image_url: Option<&str>) -> Result<(), IntegrationError> {
            if self.fail {
                return Err(IntegrationError::Rejected("down".into()));
            }
            self.sent.lock().push((text.to_string(), image_url.map(String::from)));
            Ok(())
        }
    }

    struct FixedAdvisor(Option<&'static str>);

    #[async_trait]
    impl SafetyAdvisor for FixedAdvisor {
        async fn safety_advice(&self, _violation: &str, _camera_id: &str) -> Result<String, IntegrationError> {
            self.0
                .map(String::from)
                .ok_or(IntegrationError::NotConfigured("LLM"))
        }
    }

    fn event(person_name: &str, person_id: &str) -> DetectionEvent {
        DetectionEvent {
            id: Uuid::new_v4(),
            customer: Uuid::new_v4(),
            camera_id: "CAM-01".into(),
            image: "detections/2026/01/01/a.jpg".into(),
            detections: json!({"items": [{"class": "no_helmet", "confidence": 0.9}]}),
            timestamp: Utc::now(),
            is_resolved: false,
            person_name: person_name.into(),
            person_id: person_id.into(),
        }
    }

    #[test]
    fn test_alert_hides_unknown_person() {
        let alert = Alert::from_event(&event("Unknown", "N/A"), "Acme", None);
        assert_eq!(alert.violation, "No Helmet");
        assert!(alert.person_name.is_none());
        assert!(!alert.message("x").contains("Person:"));

        let known = Alert::from_event(&event("Jane Doe", "E-42"), "Acme", None);
        assert!(known.message("x").contains("Person: Jane Doe (E-42)"));
    }

    #[tokio::test]
    async fn test_fan_out_continues_past_failures() {
        let good = Arc::new(RecordingChannel::default());
        let service = NotificationService::new()
            .with_advisor(Arc::new(FixedAdvisor(Some("Wear a helmet."))))
            .with_channel(Arc::new(RecordingChannel { fail: true, ..Default::default() }))
            .with_channel(good.clone());

        let alert = Alert::from_event(&event("Unknown", "N/A"), "Acme", Some("http://x/media/a.jpg".into()));
        let report = service.notify(alert).await;

        assert_eq!(report.delivered, vec!["recording"]);
        assert_eq!(report.failed, vec!["broken"]);
        let sent = good.sent.lock();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.ends_with("Advice: Wear a helmet."));
        assert_eq!(sent[0].1.as_deref(), Some("http://x/media/a.jpg"));
    }

    #[tokio::test]
    async fn test_advisor_failure_uses_fallback() {
        let channel = Arc::new(RecordingChannel::default());
        let service = NotificationService::new()
            .with_advisor(Arc::new(FixedAdvisor(None)))
            .with_channel(channel.clone());

        service.notify(Alert::from_event(&event("Unknown", "N/A"), "Acme", None)).await;
        assert!(channel.sent.lock()[0].0.ends_with(FALLBACK_ADVICE));
    }

    #[tokio::test]
    async fn test_dispatch_runs_in_background() {
        let channel = Arc::new(RecordingChannel::default());
        let service: Arc<dyn Notifier> = Arc::new(NotificationService::new().with_channel(channel.clone()));

        dispatch(service, Alert::from_event(&event("Unknown", "N/A"), "Acme", None), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(channel.sent.lock().len(), 1);
    }
}
