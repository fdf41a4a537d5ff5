use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use msg_core::truncate;
use msg_core::{
    header_value, Headers, InboundMessage, InboundWebhook, MessageError, SendRequest,
    SendResponse, SmsClient,
};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use tracing::{debug, warn};
use url::Url;

const PROVIDER: &str = "twilio";
const SIGNATURE_HEADER: &str = "x-twilio-signature";

type HmacSha1 = Hmac<Sha1>;

/// Twilio REST client.
///
/// Outbound bodies are run through [`msg_core::truncate::truncate_for_sms`]
/// before they hit the wire, so a send never fails for being over the carrier
/// budget; a warning is logged whenever a body had to be shortened.
#[derive(Clone, Debug)]
pub struct TwilioClient {
    /// Twilio Account SID (doubles as the Basic auth username).
    account_sid: String,
    /// Twilio Auth Token; also keys inbound signature verification.
    auth_token: String,
    /// API base URL; override for testing/mocking.
    base_url: String,
    /// Public URL Twilio posts inbound messages to. Signatures are computed
    /// over this URL, so verification needs it configured.
    webhook_url: Option<Url>,
    verify_signatures: bool,
    #[cfg(feature = "reqwest")]
    http: reqwest::Client,
}

impl TwilioClient {
    pub fn new<S: Into<String>>(account_sid: S, auth_token: S) -> Result<Self, MessageError> {
        Self::with_base_url(account_sid, auth_token, "https://api.twilio.com".to_string())
    }

    pub fn with_base_url<S: Into<String>>(
        account_sid: S,
        auth_token: S,
        base_url: String,
    ) -> Result<Self, MessageError> {
        let account_sid = account_sid.into();
        let auth_token = auth_token.into();
        if account_sid.is_empty() {
            return Err(MessageError::Auth("need a Twilio account SID".into()));
        }
        if auth_token.is_empty() {
            return Err(MessageError::Auth("need a Twilio auth token".into()));
        }
        Ok(Self {
            account_sid,
            auth_token,
            base_url,
            webhook_url: None,
            verify_signatures: true,
            #[cfg(feature = "reqwest")]
            http: reqwest::Client::new(),
        })
    }

    /// Set the public URL this app receives Twilio webhooks on. Required for
    /// signature verification because the signature covers the full URL.
    pub fn with_webhook_url(mut self, webhook_url: &str) -> Result<Self, MessageError> {
        let parsed = Url::parse(webhook_url)
            .map_err(|e| MessageError::Invalid(format!("webhook url: {}", e)))?;
        self.webhook_url = Some(parsed);
        Ok(self)
    }

    /// Accept inbound webhooks without checking `X-Twilio-Signature`.
    /// Development use only.
    pub fn insecure_skip_verification(mut self) -> Self {
        self.verify_signatures = false;
        self
    }

    /// Signature Twilio would attach to a request for `url` carrying `params`:
    /// HMAC-SHA1 over the URL followed by the form parameters sorted by name,
    /// keyed with the auth token, base64-encoded.
    fn expected_signature(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<String, MessageError> {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut data = url.to_string();
        for (name, value) in sorted {
            data.push_str(name);
            data.push_str(value);
        }

        let mut mac = HmacSha1::new_from_slice(self.auth_token.as_bytes())
            .map_err(|e| MessageError::Unexpected(format!("hmac key: {}", e)))?;
        mac.update(data.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl SmsClient for TwilioClient {
    async fn send(&self, req: SendRequest<'_>) -> Result<SendResponse, MessageError> {
        if req.to.is_empty() {
            return Err(MessageError::Invalid("twilio send: need a to number".into()));
        }
        if req.from.is_empty() {
            return Err(MessageError::Invalid("twilio send: need a from number".into()));
        }
        if req.text.is_empty() {
            return Err(MessageError::Invalid("twilio send: need message text".into()));
        }

        let body = truncate::truncate_for_sms(req.text, 0);
        if body != req.text {
            warn!(
                "truncated SMS to {} from {} to {} characters",
                req.to,
                req.text.chars().count(),
                body.chars().count()
            );
        }

        #[cfg(not(feature = "reqwest"))]
        {
            let _ = body;
            return Err(MessageError::Unexpected("reqwest feature disabled".into()));
        }
        #[cfg(feature = "reqwest")]
        {
            let url = format!(
                "{}/2010-04-01/Accounts/{}/Messages.json",
                self.base_url.trim_end_matches('/'),
                self.account_sid
            );
            let form = [("To", req.to), ("From", req.from), ("Body", body.as_ref())];
            let res = self
                .http
                .post(url)
                .basic_auth(&self.account_sid, Some(&self.auth_token))
                .form(&form)
                .send()
                .await
                .map_err(|e| MessageError::Http(e.to_string()))?;

            let status = res.status();
            // Twilio answers message creation with 201; tolerate 202 as well.
            if status.as_u16() > 202 {
                let body = res.text().await.unwrap_or_default();
                let message = serde_json::from_str::<serde_json::Value>(&body)
                    .ok()
                    .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                    .unwrap_or(body);
                return Err(MessageError::Provider(format!("HTTP {}: {}", status, message)));
            }

            let raw_text = res
                .text()
                .await
                .map_err(|e| MessageError::Http(e.to_string()))?;
            let raw_json: serde_json::Value = serde_json::from_str(&raw_text)
                .unwrap_or_else(|_| serde_json::json!({ "raw": raw_text }));

            let id = raw_json
                .get("sid")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(msg_core::fallback_id);

            Ok(SendResponse {
                id,
                provider: PROVIDER,
                raw: raw_json,
            })
        }
    }
}

/// Types used to parse Twilio inbound webhooks for SMS replies.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TwilioInbound {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "Body")]
    pub body: String,
    #[serde(rename = "MessageSid")]
    pub message_sid: Option<String>,
    #[serde(rename = "AccountSid")]
    pub account_sid: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl From<TwilioInbound> for InboundMessage {
    fn from(t: TwilioInbound) -> Self {
        let raw = serde_json::to_value(&t).unwrap_or_default();
        InboundMessage {
            id: t.message_sid.clone(),
            from: t.from,
            to: t.to,
            subject: None,
            text: t.body,
            // Twilio does not timestamp inbound message webhooks.
            timestamp: None,
            provider: PROVIDER,
            raw,
        }
    }
}

#[async_trait]
impl InboundWebhook for TwilioClient {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn verify(&self, headers: &Headers, _query: &str, body: &[u8]) -> Result<(), MessageError> {
        if !self.verify_signatures {
            debug!("twilio signature verification disabled");
            return Ok(());
        }

        let url = self.webhook_url.as_ref().ok_or_else(|| {
            MessageError::Auth("signature verification needs a configured webhook url".into())
        })?;
        let signature = header_value(headers, SIGNATURE_HEADER)
            .ok_or_else(|| MessageError::Auth("missing X-Twilio-Signature header".into()))?;

        let params: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
            .map_err(|e| MessageError::Invalid(format!("form decode: {}", e)))?;
        let expected = self.expected_signature(url.as_str(), &params)?;

        if expected != signature {
            return Err(MessageError::Auth("signature mismatch".into()));
        }
        Ok(())
    }

    async fn parse_inbound(
        &self,
        _headers: &Headers,
        body: &[u8],
    ) -> Result<InboundMessage, MessageError> {
        // Twilio posts application/x-www-form-urlencoded for inbound SMS.
        let inbound: TwilioInbound = serde_urlencoded::from_bytes(body)
            .map_err(|e| MessageError::Invalid(format!("form decode: {}", e)))?;
        Ok(inbound.into())
    }
}
