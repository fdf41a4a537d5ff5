use config::{Config, ConfigError, Environment, File};
use msg_core::MessageError;
use msg_sendgrid::SendGridClient;
use msg_twilio::TwilioClient;
use serde::{Deserialize, Serialize};
use std::env;

pub use crate::rate_limiter::RateLimitConfig;

/// Application configuration
///
/// Environment resolution happens here, once, at load time; provider clients
/// are constructed from the resolved structs and never read the process
/// environment themselves.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Messaging providers configuration
    pub providers: ProvidersConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 3000)
    pub port: u16,
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
}

/// Messaging providers configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    /// Twilio SMS configuration
    pub twilio: Option<TwilioConfig>,
    /// SendGrid transactional email configuration
    pub sendgrid: Option<SendGridConfig>,
}

/// Twilio provider configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TwilioConfig {
    /// Twilio Account SID
    pub account_sid: String,
    /// Twilio Auth Token
    pub auth_token: String,
    /// Webhook signature validation (default: true)
    pub verify_signatures: bool,
    /// Public URL Twilio posts inbound SMS to; required when
    /// `verify_signatures` is on because signatures cover the URL.
    pub webhook_url: Option<String>,
}

impl TwilioConfig {
    /// Build a ready-to-use client, failing fast on missing credentials.
    pub fn client(&self) -> Result<TwilioClient, MessageError> {
        let client = TwilioClient::new(self.account_sid.clone(), self.auth_token.clone())?;
        let client = match &self.webhook_url {
            Some(url) => client.with_webhook_url(url)?,
            None => client,
        };
        Ok(if self.verify_signatures {
            client
        } else {
            client.insecure_skip_verification()
        })
    }
}

/// SendGrid provider configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SendGridConfig {
    /// SendGrid account or sub-account username
    pub username: String,
    /// SendGrid password for that account
    pub password: String,
    /// Shared secret expected in the inbound webhook's `verify` query
    /// parameter; inbound validation is off when absent.
    pub verify_token: Option<String>,
}

impl SendGridConfig {
    /// Build a ready-to-use client, failing fast on missing credentials.
    pub fn client(&self) -> Result<SendGridClient, MessageError> {
        let client = SendGridClient::new(self.username.clone(), self.password.clone())?;
        Ok(match &self.verify_token {
            Some(token) => client.with_verify_token(token.clone()),
            None => client,
        })
    }
}

/// Security configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// Enable signature verification (default: true)
    pub verify_signatures: bool,
    /// Maximum request body size in bytes (default: 1MB)
    pub max_body_size: usize,
    /// Request timeout in seconds (default: 30)
    pub request_timeout: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: json or pretty (default: json)
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            timeout_seconds: 30,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            verify_signatures: true,
            max_body_size: 1024 * 1024, // 1MB
            request_timeout: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(Config::try_from(&AppConfig::default())?)
            // Add configuration file based on environment
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local configuration file (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (prefixed with MSGKIT_)
            .add_source(Environment::with_prefix("MSGKIT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            providers: ProvidersConfig {
                twilio: None,
                sendgrid: None,
            },
            security: SecurityConfig::default(),
            logging: LoggingConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}
