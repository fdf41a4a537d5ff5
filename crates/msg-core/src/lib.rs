//! # Message Core
//!
//! Core traits and types for the msgkit email + SMS abstraction.
//!
//! This crate provides the fundamental building blocks for outbound and
//! inbound messaging:
//! - [`SmsClient`] and [`EmailClient`] traits for sending
//! - [`InboundWebhook`] trait for processing incoming provider callbacks
//! - the [`truncate`] module that fits SMS bodies into carrier budgets
//! - common types for requests, responses, and errors
//!
//! ## Example
//!
//! ```rust,ignore
//! use msg_core::{SendRequest, SmsClient};
//!
//! // Any SMS provider implements SmsClient
//! let response = client.send(SendRequest {
//!     to: "+1234567890",
//!     from: "+0987654321",
//!     text: "Hello world!"
//! }).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub mod truncate;

/// Errors that can occur while talking to a messaging provider.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// HTTP communication error
    #[error("http error: {0}")]
    Http(String),
    /// Authentication/authorization error
    #[error("authentication error: {0}")]
    Auth(String),
    /// Invalid request parameters
    #[error("invalid request: {0}")]
    Invalid(String),
    /// The provider returned an error
    #[error("provider error: {0}")]
    Provider(String),
    /// Unexpected error occurred
    #[error("unexpected: {0}")]
    Unexpected(String),
}

/// Web-specific error types for webhook processing
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("provider not found: {0}")]
    ProviderNotFound(String),
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),
    #[error("parsing failed: {0}")]
    ParseError(String),
    #[error("message processing error: {0}")]
    Message(#[from] MessageError),
}

/// HTTP status code for web responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    Ok = 200,
    BadRequest = 400,
    Unauthorized = 401,
    NotFound = 404,
    InternalServerError = 500,
}

impl HttpStatus {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// A single outbound SMS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest<'a> {
    pub to: &'a str,
    pub from: &'a str,
    pub text: &'a str,
}

/// A single outbound transactional email. Either `text` or `html` (or both)
/// must be present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRequest<'a> {
    pub to: &'a str,
    pub from: &'a str,
    pub subject: &'a str,
    pub text: Option<&'a str>,
    pub html: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResponse {
    pub id: String,
    /// Name of the backend/provider that produced the response, e.g. "twilio".
    pub provider: &'static str,
    /// Raw provider payload for debugging / audit.
    pub raw: serde_json::Value,
}

/// Normalized inbound message: an SMS reply or a parsed inbound email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundMessage {
    pub id: Option<String>,
    pub from: String,
    pub to: String,
    /// Set for inbound email; SMS replies have no subject line.
    pub subject: Option<String>,
    pub text: String,
    pub timestamp: Option<OffsetDateTime>,
    pub provider: &'static str,
    pub raw: serde_json::Value,
}

/// Generic webhook response that can be converted to any framework's response type
#[derive(Debug, Clone)]
pub struct WebhookResponse {
    pub status: HttpStatus,
    pub body: String,
    pub content_type: String,
}

impl WebhookResponse {
    pub fn success(message: InboundMessage) -> Self {
        Self {
            status: HttpStatus::Ok,
            body: serde_json::to_string(&message).unwrap_or_else(|_| "{}".to_string()),
            content_type: "application/json".to_string(),
        }
    }

    pub fn error(status: HttpStatus, message: &str) -> Self {
        Self {
            status,
            body: format!(r#"{{"error": "{}"}}"#, message.replace('"', r#"\""#)),
            content_type: "application/json".to_string(),
        }
    }
}

#[async_trait]
pub trait SmsClient: Send + Sync {
    /// Send a single text SMS.
    async fn send(&self, req: SendRequest<'_>) -> Result<SendResponse, MessageError>;
}

#[async_trait]
pub trait EmailClient: Send + Sync {
    /// Send a single transactional email.
    async fn send(&self, req: EmailRequest<'_>) -> Result<SendResponse, MessageError>;
}

/// Utility to create a pseudo id if a provider doesn't return one.
pub fn fallback_id() -> String {
    Uuid::new_v4().to_string()
}

/// Lightweight header representation to avoid tying the core to any HTTP framework.
pub type Headers = Vec<(String, String)>;

/// Case-insensitive header lookup over [`Headers`].
pub fn header_value<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Provider-agnostic inbound webhook interface.
///
/// `verify` sees the raw query string as well as headers and body because some
/// providers (SendGrid's inbound parse) carry their shared secret as a query
/// parameter rather than a signature header.
#[async_trait]
pub trait InboundWebhook: Send + Sync {
    /// Stable provider key, e.g., "twilio", "sendgrid", etc.
    fn provider(&self) -> &'static str;

    /// Parse the incoming HTTP payload (headers + raw body) into a normalized
    /// `InboundMessage`. Async because multipart bodies are decoded lazily.
    async fn parse_inbound(
        &self,
        headers: &Headers,
        body: &[u8],
    ) -> Result<InboundMessage, MessageError>;

    /// Optional request authentication (no-op by default).
    fn verify(&self, _headers: &Headers, _query: &str, _body: &[u8]) -> Result<(), MessageError> {
        Ok(())
    }
}

use std::collections::HashMap;
use std::sync::Arc;

/// Runtime registry so apps can register any combination of providers and treat them interchangeably.
#[derive(Default, Clone)]
pub struct InboundRegistry {
    map: Arc<HashMap<&'static str, Arc<dyn InboundWebhook>>>,
}

impl InboundRegistry {
    pub fn new() -> Self {
        Self {
            map: Arc::new(HashMap::new()),
        }
    }

    pub fn with(mut self, hook: Arc<dyn InboundWebhook>) -> Self {
        let mut m = (*self.map).clone();
        m.insert(hook.provider(), hook);
        self.map = Arc::new(m);
        self
    }

    pub fn get(&self, provider: &str) -> Option<Arc<dyn InboundWebhook>> {
        self.map.get(provider).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let headers: Headers = vec![("X-Twilio-Signature".to_string(), "abc".to_string())];
        assert_eq!(header_value(&headers, "x-twilio-signature"), Some("abc"));
        assert_eq!(header_value(&headers, "x-missing"), None);
    }

    #[test]
    fn webhook_error_response_escapes_quotes() {
        let response = WebhookResponse::error(HttpStatus::BadRequest, r#"bad "input""#);
        assert_eq!(response.status.as_u16(), 400);
        assert!(response.body.contains(r#"\"input\""#));
    }

    #[test]
    fn success_response_serializes_the_message() {
        let message = InboundMessage {
            id: Some("id-1".to_string()),
            from: "+15550001111".to_string(),
            to: "+15550002222".to_string(),
            subject: None,
            text: "hi".to_string(),
            timestamp: None,
            provider: "test",
            raw: serde_json::json!({}),
        };
        let response = WebhookResponse::success(message);
        assert_eq!(response.status.as_u16(), 200);
        assert_eq!(response.content_type, "application/json");
        assert!(response.body.contains("+15550001111"));
    }
}
