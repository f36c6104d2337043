//! External collaborators: LLM, drone dispatch, WhatsApp senders
//!
//! Every client is built with a request timeout so a slow third party
//! cannot hold a request open.

pub mod drone;
pub mod llm;
pub mod whatsapp;

use std::time::Duration;

pub use drone::{DroneClient, DroneDispatch};
pub use llm::{LlmClient, SafetyAdvisor};
pub use whatsapp::{CallMeBotChannel, TwilioChannel};

/// Build an HTTP client with a request timeout
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, IntegrationError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Collaborator error
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    /// Transport failure or timeout
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for logs
        body: String,
    },

    /// Remote accepted the call but refused the request
    #[error("rejected by remote: {0}")]
    Rejected(String),

    /// Response body was not understood
    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// Required settings are missing
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

/// Turn a non-2xx response into an error, keeping the body for logs
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, IntegrationError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(IntegrationError::Status { status, body })
}
