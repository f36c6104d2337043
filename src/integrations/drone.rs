//! Drone dispatch via the DJI FlightHub workflow API

use crate::config::DroneConfig;
use crate::integrations::IntegrationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use utoipa::ToSchema;

/// Workflow trigger client
pub struct DroneClient {
    client: reqwest::Client,
    config: DroneConfig,
}

/// Accepted mission
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DroneDispatch {
    /// Remote status string
    pub status: String,
    /// Remote message
    pub msg: String,
    /// Remote payload, passed through
    #[schema(value_type = Object)]
    pub data: Value,
}

#[derive(Debug, Serialize)]
struct TriggerRequest<'a> {
    workflow_uuid: &'a str,
    trigger_type: u8,
    name: String,
    params: TriggerParams<'a>,
}

#[derive(Debug, Serialize)]
struct TriggerParams<'a> {
    creator: &'a str,
    latitude: f64,
    longitude: f64,
    level: u8,
    desc: &'a str,
}

#[derive(Debug, Deserialize)]
struct TriggerResponse {
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

impl DroneClient {
    /// Client with the given request timeout
    pub fn new(config: DroneConfig, timeout: Duration) -> Result<Self, IntegrationError> {
        Ok(Self {
            client: super::http_client(timeout)?,
            config,
        })
    }

    /// Whether a user token is set
    pub fn is_configured(&self) -> bool {
        self.config.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Trigger the configured alert workflow
    pub async fn trigger_mission(&self, now: DateTime<Utc>) -> Result<DroneDispatch, IntegrationError> {
        let token = self
            .config
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(IntegrationError::NotConfigured("drone"))?;

        let body = TriggerRequest {
            workflow_uuid: &self.config.workflow_uuid,
            trigger_type: 0,
            name: format!("Alert-{}", now.format("%Y%m%d%H%M%S")),
            params: TriggerParams {
                creator: &self.config.creator,
                latitude: self.config.latitude,
                longitude: self.config.longitude,
                level: self.config.level,
                desc: &self.config.description,
            },
        };

        tracing::info!(mission = %body.name, "Triggering drone workflow");

        let response = self
            .client
            .post(&self.config.api_url)
            .header("X-User-Token", token)
            .header("x-project-uuid", &self.config.project_uuid)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let parsed: Option<TriggerResponse> = serde_json::from_str(&text).ok();

        match parsed {
            Some(reply) if status.as_u16() == 200 && reply.code == Some(0) => {
                tracing::info!(mission = %body.name, "Drone mission accepted");
                Ok(DroneDispatch {
                    status: "success".into(),
                    msg: "Drone mission started".into(),
                    data: reply.data,
                })
            }
            Some(reply) => {
                let message = reply.message.unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
                tracing::warn!(mission = %body.name, "Drone mission rejected: {}", message);
                Err(IntegrationError::Rejected(message))
            }
            None if !status.is_success() => Err(IntegrationError::Status {
                status: status.as_u16(),
                body: text,
            }),
            None => Err(IntegrationError::InvalidResponse(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, token: Option<&str>) -> DroneClient {
        DroneClient::new(
            DroneConfig {
                api_url: format!("{}/openapi/v0.1/workflow", server.uri()),
                token: token.map(String::from),
                project_uuid: "project-1".into(),
                workflow_uuid: "workflow-1".into(),
                creator: "ops".into(),
                latitude: 1.5,
                longitude: 103.8,
                ..DroneConfig::default()
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap()
    }

    #[tokio::test]
    async fn test_mission_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openapi/v0.1/workflow"))
            .and(header("X-User-Token", "tok"))
            .and(header("x-project-uuid", "project-1"))
            .and(body_partial_json(json!({
                "workflow_uuid": "workflow-1",
                "trigger_type": 0,
                "name": "Alert-20260304050607",
                "params": {"creator": "ops", "level": 5}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0, "message": "ok", "data": {"flight_id": "F1"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dispatch = client(&server, Some("tok")).trigger_mission(now()).await.unwrap();
        assert_eq!(dispatch.status, "success");
        assert_eq!(dispatch.data["flight_id"], "F1");
    }

    #[tokio::test]
    async fn test_nonzero_code_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 4001, "message": "workflow busy"
            })))
            .mount(&server)
            .await;

        let result = client(&server, Some("tok")).trigger_mission(now()).await;
        match result {
            Err(IntegrationError::Rejected(msg)) => assert_eq!(msg, "workflow busy"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let result = client(&server, Some("tok")).trigger_mission(now()).await;
        assert!(matches!(result, Err(IntegrationError::Status { status: 502, .. })));
    }

    #[tokio::test]
    async fn test_missing_token_makes_no_call() {
        let server = MockServer::start().await;
        let drone = client(&server, None);
        assert!(!drone.is_configured());
        assert!(matches!(
            drone.trigger_mission(now()).await,
            Err(IntegrationError::NotConfigured(_))
        ));
    }
}
