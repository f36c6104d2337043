//! WhatsApp alert channels

use crate::config::{TwilioConfig, WhatsAppConfig};
use crate::integrations::{check_status, IntegrationError};
use crate::notifications::AlertChannel;
use async_trait::async_trait;
use std::time::Duration;

/// Placeholder key shipped in sample configs
const PLACEHOLDER_KEY: &str = "WAITING_FOR_KEY";

/// CallMeBot gateway: text only, GET with query parameters
pub struct CallMeBotChannel {
    client: reqwest::Client,
    endpoint: String,
    phone: String,
    api_key: String,
}

impl CallMeBotChannel {
    /// `None` unless enabled with a phone number and a real key
    pub fn from_config(config: &WhatsAppConfig, timeout: Duration) -> Result<Option<Self>, IntegrationError> {
        if !config.enabled
            || config.phone.trim().is_empty()
            || config.api_key.trim().is_empty()
            || config.api_key == PLACEHOLDER_KEY
        {
            return Ok(None);
        }

        Ok(Some(Self {
            client: super::http_client(timeout)?,
            endpoint: config.endpoint.clone(),
            phone: config.phone.clone(),
            api_key: config.api_key.clone(),
        }))
    }
}

#[async_trait]
impl AlertChannel for CallMeBotChannel {
    fn name(&self) -> &'static str {
        "callmebot"
    }

    async fn send(&self, text: &str, image_url: Option<&str>) -> Result<(), IntegrationError> {
        let text = match image_url {
            Some(url) => format!("{}\nSnapshot: {}", text, url),
            None => text.to_string(),
        };

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("phone", self.phone.as_str()), ("text", text.as_str()), ("apikey", self.api_key.as_str())])
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Twilio Messages API, attaches the snapshot as media
pub struct TwilioChannel {
    client: reqwest::Client,
    url: String,
    account_sid: String,
    auth_token: String,
    from: String,
    to: String,
}

impl TwilioChannel {
    /// `None` unless every credential is present
    pub fn from_config(config: &TwilioConfig, timeout: Duration) -> Result<Option<Self>, IntegrationError> {
        let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        let (Some(account_sid), Some(auth_token), Some(from), Some(to)) = (
            present(&config.account_sid),
            present(&config.auth_token),
            present(&config.from_number),
            present(&config.to_number),
        ) else {
            return Ok(None);
        };

        Ok(Some(Self {
            client: super::http_client(timeout)?,
            url: format!(
                "{}/2010-04-01/Accounts/{}/Messages.json",
                config.api_base.trim_end_matches('/'),
                account_sid
            ),
            account_sid,
            auth_token,
            from: whatsapp_address(&from),
            to: whatsapp_address(&to),
        }))
    }
}

fn whatsapp_address(number: &str) -> String {
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{}", number)
    }
}

#[async_trait]
impl AlertChannel for TwilioChannel {
    fn name(&self) -> &'static str {
        "twilio"
    }

    async fn send(&self, text: &str, image_url: Option<&str>) -> Result<(), IntegrationError> {
        let mut form = vec![("To", self.to.as_str()), ("From", self.from.as_str()), ("Body", text)];
        if let Some(url) = image_url {
            form.push(("MediaUrl", url));
        }

        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn callmebot(server: &MockServer) -> CallMeBotChannel {
        CallMeBotChannel::from_config(
            &WhatsAppConfig {
                enabled: true,
                endpoint: format!("{}/whatsapp.php", server.uri()),
                phone: "+6500000000".into(),
                api_key: "123456".into(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
        .unwrap()
    }

    #[test]
    fn test_unconfigured_channels_are_skipped() {
        let timeout = Duration::from_secs(1);
        assert!(CallMeBotChannel::from_config(&WhatsAppConfig::default(), timeout).unwrap().is_none());

        let placeholder = WhatsAppConfig {
            enabled: true,
            phone: "+650000".into(),
            api_key: PLACEHOLDER_KEY.into(),
            ..WhatsAppConfig::default()
        };
        assert!(CallMeBotChannel::from_config(&placeholder, timeout).unwrap().is_none());

        let partial = TwilioConfig {
            account_sid: Some("AC1".into()),
            auth_token: Some("tok".into()),
            ..TwilioConfig::default()
        };
        assert!(TwilioChannel::from_config(&partial, timeout).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_callmebot_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/whatsapp.php"))
            .and(query_param("phone", "+6500000000"))
            .and(query_param("apikey", "123456"))
            .and(query_param("text", "hello\nSnapshot: http://host/media/a.jpg"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        callmebot(&server)
            .send("hello", Some("http://host/media/a.jpg"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_callmebot_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("APIKey is invalid"))
            .mount(&server)
            .await;

        let result = callmebot(&server).send("hello", None).await;
        assert!(matches!(result, Err(IntegrationError::Status { status: 403, .. })));
    }

    #[tokio::test]
    async fn test_twilio_posts_form_with_media() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC1/Messages.json"))
            .and(header_exists("authorization"))
            .and(body_string_contains("To=whatsapp%3A%2B6511111111"))
            .and(body_string_contains("MediaUrl="))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let twilio = TwilioChannel::from_config(
            &TwilioConfig {
                api_base: server.uri(),
                account_sid: Some("AC1".into()),
                auth_token: Some("tok".into()),
                from_number: Some("whatsapp:+14155238886".into()),
                to_number: Some("+6511111111".into()),
            },
            Duration::from_secs(5),
        )
        .unwrap()
        .unwrap();

        twilio.send("alert", Some("http://host/media/a.jpg")).await.unwrap();
    }
}
