use msg_core::{
    Headers, HttpStatus, InboundMessage, InboundRegistry, WebhookError, WebhookResponse,
};

/// Framework-agnostic webhook processor that handles the core inbound logic
#[derive(Clone)]
pub struct WebhookProcessor {
    registry: InboundRegistry,
}

impl WebhookProcessor {
    pub fn new(registry: InboundRegistry) -> Self {
        Self { registry }
    }

    /// Process an incoming webhook request and return a framework-agnostic response.
    ///
    /// `query` is the raw query string of the request; providers that carry
    /// their verification token there (SendGrid) check it during `verify`.
    pub async fn process_webhook(
        &self,
        provider: &str,
        headers: Headers,
        query: &str,
        body: &[u8],
    ) -> WebhookResponse {
        match self
            .process_webhook_internal(provider, headers, query, body)
            .await
        {
            Ok(message) => WebhookResponse::success(message),
            Err(e) => self.error_to_response(e),
        }
    }

    async fn process_webhook_internal(
        &self,
        provider: &str,
        headers: Headers,
        query: &str,
        body: &[u8],
    ) -> Result<InboundMessage, WebhookError> {
        let hook = self
            .registry
            .get(provider)
            .ok_or_else(|| WebhookError::ProviderNotFound(provider.to_string()))?;

        hook.verify(&headers, query, body)
            .map_err(|e| WebhookError::VerificationFailed(e.to_string()))?;

        hook.parse_inbound(&headers, body)
            .await
            .map_err(|e| WebhookError::ParseError(e.to_string()))
    }

    fn error_to_response(&self, error: WebhookError) -> WebhookResponse {
        match error {
            WebhookError::ProviderNotFound(_) => {
                WebhookResponse::error(HttpStatus::NotFound, "unknown provider")
            }
            WebhookError::VerificationFailed(msg) => WebhookResponse::error(
                HttpStatus::Unauthorized,
                &format!("verification failed: {}", msg),
            ),
            WebhookError::ParseError(msg) => {
                WebhookResponse::error(HttpStatus::BadRequest, &format!("parse error: {}", msg))
            }
            WebhookError::Message(e) => WebhookResponse::error(
                HttpStatus::InternalServerError,
                &format!("message error: {}", e),
            ),
        }
    }
}

/// Helper trait for framework adapters to convert headers
pub trait HeaderConverter {
    type HeaderType;

    fn to_generic_headers(headers: &Self::HeaderType) -> Headers;
}

/// Helper trait for framework adapters to convert responses
pub trait ResponseConverter {
    type ResponseType;

    fn from_webhook_response(response: WebhookResponse) -> Self::ResponseType;
}
