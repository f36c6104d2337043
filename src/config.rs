//! Application configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! file, then `PPEGUARD__SECTION__KEY` environment variables.

use crate::middleware::gate::GateConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable naming the config file
pub const CONFIG_PATH_VAR: &str = "PPEGUARD_CONFIG";

/// Default config file location (optional)
pub const DEFAULT_CONFIG_PATH: &str = "config/ppeguard";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Listener and media settings
    pub server: ServerConfig,
    /// Session tokens
    pub auth: AuthConfig,
    /// Subscription gate
    pub gate: GateConfig,
    /// Outbound collaborators
    pub integrations: IntegrationsConfig,
    /// Fixtures file loaded at startup
    pub seed_path: Option<String>,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind_addr: String,
    /// Externally reachable origin, used for image links in alerts
    pub public_base_url: String,
    /// Directory holding uploaded snapshots
    pub media_root: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".into(),
            public_base_url: "http://localhost:8000".into(),
            media_root: "media".into(),
        }
    }
}

/// Session token settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret; required
    pub jwt_secret: String,
    /// Token and cookie lifetime
    pub token_lifetime_minutes: i64,
    /// Session cookie name
    pub cookie_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_lifetime_minutes: 12 * 60,
            cookie_name: "ppeguard_session".into(),
        }
    }
}

/// Collaborator endpoints and timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationsConfig {
    /// Per-request timeout for every collaborator call
    pub timeout_secs: u64,
    /// Upper bound for one whole notification fan-out
    pub notification_timeout_secs: u64,
    /// Chat completions endpoint
    pub llm: LlmConfig,
    /// Drone workflow API
    pub drone: DroneConfig,
    /// CallMeBot channel
    pub whatsapp: WhatsAppConfig,
    /// Twilio channel
    pub twilio: TwilioConfig,
}

impl IntegrationsConfig {
    /// Per-request collaborator timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Bound on one notification fan-out
    pub fn notification_timeout(&self) -> Duration {
        Duration::from_secs(self.notification_timeout_secs)
    }
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            notification_timeout_secs: 30,
            llm: LlmConfig::default(),
            drone: DroneConfig::default(),
            whatsapp: WhatsAppConfig::default(),
            twilio: TwilioConfig::default(),
        }
    }
}

/// OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Off disables advice and AI reports
    pub enabled: bool,
    /// Base URL, without `/chat/completions`
    pub api_base: String,
    /// Omitted for local servers such as Ollama
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: "https://api.openai.com/v1".into(),
            api_key: None,
            model: "llama3.2".into(),
        }
    }
}

/// DJI FlightHub workflow trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroneConfig {
    /// Workflow trigger URL
    pub api_url: String,
    /// User token; dispatch is refused without it
    pub token: Option<String>,
    /// FlightHub project
    pub project_uuid: String,
    /// Workflow to launch
    pub workflow_uuid: String,
    /// Creator ID sent with the mission
    pub creator: String,
    /// Mission target latitude
    pub latitude: f64,
    /// Mission target longitude
    pub longitude: f64,
    /// Alert level
    pub level: u8,
    /// Mission description
    pub description: String,
}

impl Default for DroneConfig {
    fn default() -> Self {
        Self {
            api_url: "https://es-flight-api-us.djigate.com/openapi/v0.1/workflow".into(),
            token: None,
            project_uuid: String::new(),
            workflow_uuid: String::new(),
            creator: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            level: 5,
            description: "Trespasser alert event from CCTV".into(),
        }
    }
}

/// CallMeBot WhatsApp gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Channel switch
    pub enabled: bool,
    /// Gateway URL
    pub endpoint: String,
    /// Recipient phone number
    pub phone: String,
    /// CallMeBot key
    pub api_key: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api.callmebot.com/whatsapp.php".into(),
            phone: String::new(),
            api_key: String::new(),
        }
    }
}

/// Twilio WhatsApp Business API; active when every credential is set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    /// API origin
    pub api_base: String,
    /// Account SID
    pub account_sid: Option<String>,
    /// Auth token
    pub auth_token: Option<String>,
    /// Sender, without the `whatsapp:` prefix
    pub from_number: Option<String>,
    /// Recipient, without the `whatsapp:` prefix
    pub to_number: Option<String>,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.twilio.com".into(),
            account_sid: None,
            auth_token: None,
            from_number: None,
            to_number: None,
        }
    }
}

impl AppConfig {
    /// Load defaults, then the optional file at `path`, then the environment
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("PPEGUARD")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let app: AppConfig = settings.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    /// Reject settings the service cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.jwt_secret must be set".into()));
        }
        if self.auth.token_lifetime_minutes <= 0 {
            return Err(ConfigError::Invalid("auth.token_lifetime_minutes must be positive".into()));
        }
        if !self.gate.suspended_path.starts_with('/') {
            return Err(ConfigError::Invalid("gate.suspended_path must be an absolute path".into()));
        }
        if self.integrations.timeout_secs == 0 {
            return Err(ConfigError::Invalid("integrations.timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Loading or merging sources failed
    #[error("configuration error: {0}")]
    Source(#[from] config::ConfigError),
    /// A value failed validation
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_need_a_secret() {
        let config = AppConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_defaults_are_otherwise_valid() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "secret".into();
        assert!(config.validate().is_ok());
        assert_eq!(config.gate.suspended_path, "/service-suspended/");
        assert!(config.gate.exempt_prefixes.contains(&"/logout/".to_string()));
        assert_eq!(config.integrations.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("ppeguard-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ppeguard.toml");
        std::fs::write(
            &path,
            r#"
                [auth]
                jwt_secret = "from-file"

                [gate]
                exempt_prefixes = ["/static/"]
                suspended_path = "/paused/"

                [integrations.llm]
                model = "gpt-4o-mini"
            "#,
        )
        .unwrap();

        let config = AppConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.auth.jwt_secret, "from-file");
        assert_eq!(config.auth.cookie_name, "ppeguard_session");
        assert_eq!(config.gate.exempt_prefixes, vec!["/static/".to_string()]);
        assert_eq!(config.gate.suspended_path, "/paused/");
        assert_eq!(config.integrations.llm.model, "gpt-4o-mini");
        assert_eq!(config.integrations.llm.api_base, "https://api.openai.com/v1");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
