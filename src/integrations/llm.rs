//! LLM client (OpenAI-compatible chat completions)

use crate::config::LlmConfig;
use crate::integrations::{check_status, IntegrationError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Produces one-sentence advice for a supervisor
#[async_trait]
pub trait SafetyAdvisor: Send + Sync {
    /// Advice for one violation seen on one camera
    async fn safety_advice(&self, violation: &str, camera_id: &str) -> Result<String, IntegrationError>;
}

/// Chat completions client
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

impl LlmClient {
    /// Client with the given request timeout
    pub fn new(config: LlmConfig, timeout: Duration) -> Result<Self, IntegrationError> {
        Ok(Self {
            client: super::http_client(timeout)?,
            config,
        })
    }

    /// Send a single user prompt and return the first reply
    pub async fn complete(&self, prompt: &str) -> Result<String, IntegrationError> {
        if !self.config.enabled {
            return Err(IntegrationError::NotConfigured("LLM"));
        }

        let url = format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            stream: false,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.bearer_auth(key);
        }

        let response = check_status(request.send().await?).await?;
        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| IntegrationError::InvalidResponse(e.to_string()))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .map(|m| m.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| IntegrationError::InvalidResponse("empty completion".into()))
    }
}

#[async_trait]
impl SafetyAdvisor for LlmClient {
    async fn safety_advice(&self, violation: &str, camera_id: &str) -> Result<String, IntegrationError> {
        let prompt = format!(
            "You are a Safety Officer. A '{}' violation was detected at '{}'. \
             Give ONE short, professional sentence of advice to the supervisor. English only.",
            violation, camera_id
        );
        self.complete(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, api_key: Option<&str>) -> LlmClient {
        LlmClient::new(
            LlmConfig {
                enabled: true,
                api_base: format!("{}/v1/", server.uri()),
                api_key: api_key.map(String::from),
                model: "test-model".into(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_safety_advice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "  Stop work and issue a helmet.  "}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let advice = client(&server, Some("sk-test"))
            .safety_advice("No Helmet", "CAM-01")
            .await
            .unwrap();
        assert_eq!(advice, "Stop work and issue a helmet.");
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let result = client(&server, None).complete("hi").await;
        assert!(matches!(result, Err(IntegrationError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_http_failure_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let result = client(&server, None).complete("hi").await;
        assert!(matches!(result, Err(IntegrationError::Status { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_disabled_client_makes_no_call() {
        let llm = LlmClient::new(
            LlmConfig { enabled: false, ..LlmConfig::default() },
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(matches!(llm.complete("hi").await, Err(IntegrationError::NotConfigured(_))));
    }
}
