//! # msgkit
//!
//! A transactional email + SMS toolkit for Rust.
//!
//! ## Features
//!
//! - **Two provider pairs**: Twilio for SMS, SendGrid for transactional email
//! - **Automatic SMS truncation**: outbound bodies are fitted into the
//!   carrier's encoding-dependent character budget before they hit the wire
//! - **Framework agnostic**: webhook processing works with Axum or any HTTP
//!   framework via the generic processor
//! - **Webhook security**: Twilio signature verification and SendGrid
//!   verify-token validation
//! - **Type safety**: strongly typed requests, responses, and errors
//! - **Rate limiting**: built-in webhook rate limiting with per-provider
//!   configuration
//! - **Comprehensive configuration**: file + environment based configuration
//! - **Observability**: structured logging via tracing
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use msgkit::prelude::*;
//! use msg_twilio::TwilioClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TwilioClient::new("account_sid", "auth_token")?;
//!
//!     // Bodies over the carrier budget are truncated automatically and the
//!     // truncation is logged.
//!     let response = client.send(SendRequest {
//!         to: "+1234567890",
//!         from: "+0987654321",
//!         text: "Hello from msgkit!",
//!     }).await?;
//!
//!     println!("Message sent with ID: {}", response.id);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! msgkit resolves configuration from files and `MSGKIT__`-prefixed
//! environment variables, once, at load time:
//!
//! ```rust,ignore
//! use msgkit::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! let twilio = config.providers.twilio.as_ref().unwrap().client()?;
//! ```

pub mod config;
pub mod rate_limiter;
pub mod telemetry;

pub use config::*;

/// Common imports for msgkit usage
pub mod prelude {
    pub use crate::config::{
        AppConfig, LoggingConfig, ProvidersConfig, SecurityConfig, SendGridConfig, ServerConfig,
        TwilioConfig,
    };
    pub use crate::rate_limiter::{
        DefaultKeyGenerator, KeyGenerator, RateLimitConfig, RateLimitResult, RateLimiter,
    };
    pub use crate::telemetry::init_tracing;
    pub use msg_core::*;
}
