use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use msg_core::{
    header_value, EmailClient, EmailRequest, Headers, InboundMessage, InboundWebhook,
    MessageError, SendResponse,
};
use tracing::debug;

const PROVIDER: &str = "sendgrid";

/// SendGrid REST client for transactional mail.
///
/// Inbound email arrives through SendGrid's parse webhook, which posts
/// `multipart/form-data`; [`InboundWebhook::parse_inbound`] flattens the
/// non-file fields into a normalized [`InboundMessage`]. Requests are
/// authenticated by a shared `verify` query parameter configured on the
/// SendGrid dashboard, not by a signature header.
#[derive(Clone, Debug)]
pub struct SendGridClient {
    username: String,
    password: String,
    /// Shared secret expected in the webhook's `verify` query parameter.
    /// Verification is a no-op until this is set.
    verify_token: Option<String>,
    /// API base URL; override for testing/mocking.
    base_url: String,
    #[cfg(feature = "reqwest")]
    http: reqwest::Client,
}

impl SendGridClient {
    pub fn new<S: Into<String>>(username: S, password: S) -> Result<Self, MessageError> {
        Self::with_base_url(username, password, "https://api.sendgrid.com".to_string())
    }

    pub fn with_base_url<S: Into<String>>(
        username: S,
        password: S,
        base_url: String,
    ) -> Result<Self, MessageError> {
        let username = username.into();
        let password = password.into();
        if username.is_empty() {
            return Err(MessageError::Auth("need a sendgrid username".into()));
        }
        if password.is_empty() {
            return Err(MessageError::Auth("need a sendgrid password".into()));
        }
        Ok(Self {
            username,
            password,
            verify_token: None,
            base_url,
            #[cfg(feature = "reqwest")]
            http: reqwest::Client::new(),
        })
    }

    /// Arm inbound validation with the token configured on the SendGrid
    /// inbound dashboard.
    pub fn with_verify_token<S: Into<String>>(mut self, token: S) -> Self {
        self.verify_token = Some(token.into());
        self
    }
}

#[async_trait]
impl EmailClient for SendGridClient {
    async fn send(&self, req: EmailRequest<'_>) -> Result<SendResponse, MessageError> {
        if req.to.is_empty() {
            return Err(MessageError::Invalid("sendgrid send: need a to address".into()));
        }
        if req.from.is_empty() {
            return Err(MessageError::Invalid("sendgrid send: need a from address".into()));
        }
        if req.text.is_none() && req.html.is_none() {
            return Err(MessageError::Invalid(
                "sendgrid send: need either text or html".into(),
            ));
        }
        if req.subject.is_empty() {
            return Err(MessageError::Invalid("sendgrid send: need a subject".into()));
        }

        #[cfg(not(feature = "reqwest"))]
        {
            return Err(MessageError::Unexpected("reqwest feature disabled".into()));
        }
        #[cfg(feature = "reqwest")]
        {
            let url = format!("{}/api/mail.send.json", self.base_url.trim_end_matches('/'));
            let mut form: Vec<(&str, &str)> = vec![
                ("api_user", self.username.as_str()),
                ("api_key", self.password.as_str()),
                ("to", req.to),
                ("from", req.from),
                ("subject", req.subject),
            ];
            if let Some(text) = req.text {
                form.push(("text", text));
            }
            if let Some(html) = req.html {
                form.push(("html", html));
            }

            let res = self
                .http
                .post(url)
                .form(&form)
                .send()
                .await
                .map_err(|e| MessageError::Http(e.to_string()))?;

            let status = res.status();
            if status.as_u16() != 200 {
                let body = res.text().await.unwrap_or_default();
                let message = serde_json::from_str::<serde_json::Value>(&body)
                    .ok()
                    .and_then(|v| {
                        v.get("errors")
                            .and_then(|e| e.as_array())
                            .and_then(|a| a.first())
                            .and_then(|e| e.as_str())
                            .map(String::from)
                            .or_else(|| {
                                v.get("message").and_then(|m| m.as_str()).map(String::from)
                            })
                    })
                    .unwrap_or_else(|| "Something went wrong!".to_string());
                return Err(MessageError::Provider(format!("HTTP {}: {}", status, message)));
            }

            let raw_text = res
                .text()
                .await
                .map_err(|e| MessageError::Http(e.to_string()))?;
            let raw_json: serde_json::Value = serde_json::from_str(&raw_text)
                .unwrap_or_else(|_| serde_json::json!({ "raw": raw_text }));

            // The mail.send endpoint acknowledges without a message id.
            Ok(SendResponse {
                id: msg_core::fallback_id(),
                provider: PROVIDER,
                raw: raw_json,
            })
        }
    }
}

fn message_from_fields(fields: HashMap<String, String>) -> InboundMessage {
    let text = fields
        .get("text")
        .cloned()
        .or_else(|| fields.get("html").cloned())
        .unwrap_or_default();
    InboundMessage {
        id: None,
        from: fields.get("from").cloned().unwrap_or_default(),
        to: fields.get("to").cloned().unwrap_or_default(),
        subject: fields.get("subject").cloned(),
        text,
        timestamp: None,
        provider: PROVIDER,
        raw: serde_json::to_value(&fields).unwrap_or_default(),
    }
}

async fn parse_multipart_fields(
    content_type: &str,
    body: &[u8],
) -> Result<HashMap<String, String>, MessageError> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| MessageError::Invalid(format!("multipart boundary: {}", e)))?;

    let body = Bytes::copy_from_slice(body);
    let stream =
        futures_util::stream::once(async move { Ok::<Bytes, std::convert::Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut fields = HashMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MessageError::Invalid(format!("multipart decode: {}", e)))?
    {
        // Attachments are dropped; only plain fields make it into the message.
        if field.file_name().is_some() {
            continue;
        }
        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        let value = field
            .text()
            .await
            .map_err(|e| MessageError::Invalid(format!("multipart field: {}", e)))?;
        fields.insert(name, value);
    }
    Ok(fields)
}

#[async_trait]
impl InboundWebhook for SendGridClient {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn verify(&self, _headers: &Headers, query: &str, _body: &[u8]) -> Result<(), MessageError> {
        let token = match &self.verify_token {
            Some(token) => token,
            None => {
                debug!("sendgrid verify token not configured; accepting request");
                return Ok(());
            }
        };

        let params: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|e| MessageError::Invalid(format!("query decode: {}", e)))?;
        let supplied = params
            .iter()
            .find(|(name, _)| name == "verify")
            .map(|(_, value)| value.as_str());

        match supplied {
            Some(value) if value == token => Ok(()),
            _ => Err(MessageError::Auth(
                "request did not pass sendgrid validation".into(),
            )),
        }
    }

    async fn parse_inbound(
        &self,
        headers: &Headers,
        body: &[u8],
    ) -> Result<InboundMessage, MessageError> {
        let content_type = header_value(headers, "content-type").unwrap_or_default();

        let fields = if content_type.contains("multipart") {
            parse_multipart_fields(content_type, body).await?
        } else {
            serde_urlencoded::from_bytes(body)
                .map_err(|e| MessageError::Invalid(format!("form decode: {}", e)))?
        };

        Ok(message_from_fields(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "xYzZY";

    fn client() -> SendGridClient {
        SendGridClient::new("user", "secret").unwrap()
    }

    fn multipart_body() -> (Headers, Vec<u8>) {
        let headers: Headers = vec![(
            "content-type".to_string(),
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )];
        let body = format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"from\"\r\n\r\n\
             sender@example.com\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"to\"\r\n\r\n\
             inbox@example.com\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"subject\"\r\n\r\n\
             Re: hello\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"text\"\r\n\r\n\
             reply body\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"attachment1\"; filename=\"a.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             ignored\r\n\
             --{b}--\r\n",
            b = BOUNDARY
        );
        (headers, body.into_bytes())
    }

    #[test]
    fn rejects_empty_credentials() {
        assert!(SendGridClient::new("", "secret").is_err());
        assert!(SendGridClient::new("user", "").is_err());
    }

    #[tokio::test]
    async fn send_requires_the_basic_fields() {
        let c = client();

        let missing_to = c
            .send(EmailRequest {
                to: "",
                from: "from@example.com",
                subject: "subject",
                text: Some("text"),
                html: None,
            })
            .await;
        assert!(matches!(missing_to, Err(MessageError::Invalid(m)) if m.contains("to")));

        let missing_body = c
            .send(EmailRequest {
                to: "to@example.com",
                from: "from@example.com",
                subject: "subject",
                text: None,
                html: None,
            })
            .await;
        assert!(matches!(missing_body, Err(MessageError::Invalid(m)) if m.contains("text")));

        let missing_subject = c
            .send(EmailRequest {
                to: "to@example.com",
                from: "from@example.com",
                subject: "",
                text: Some("text"),
                html: None,
            })
            .await;
        assert!(matches!(missing_subject, Err(MessageError::Invalid(m)) if m.contains("subject")));
    }

    #[test]
    fn verify_is_a_noop_without_a_token() {
        assert!(client().verify(&vec![], "verify=anything", b"").is_ok());
    }

    #[test]
    fn verify_accepts_a_matching_token() {
        let c = client().with_verify_token("randomness");
        assert!(c.verify(&vec![], "verify=randomness&foo=bar", b"").is_ok());
    }

    #[test]
    fn verify_rejects_a_mismatched_token() {
        let c = client().with_verify_token("randomness");
        assert!(c.verify(&vec![], "verify=something", b"").is_err());
        assert!(c.verify(&vec![], "", b"").is_err());
    }

    #[tokio::test]
    async fn parses_a_multipart_inbound_email() {
        let c = client();
        let (headers, body) = multipart_body();

        let msg = c.parse_inbound(&headers, &body).await.unwrap();
        assert_eq!(msg.from, "sender@example.com");
        assert_eq!(msg.to, "inbox@example.com");
        assert_eq!(msg.subject, Some("Re: hello".to_string()));
        assert_eq!(msg.text, "reply body");
        assert_eq!(msg.provider, "sendgrid");
        // The attachment never reaches the normalized message.
        assert!(msg.raw.get("attachment1").is_none());
    }

    #[tokio::test]
    async fn parses_an_urlencoded_inbound_email() {
        let c = client();
        let headers: Headers = vec![(
            "content-type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        )];
        let body = b"from=sender%40example.com&to=inbox%40example.com&subject=hi&text=plain";

        let msg = c.parse_inbound(&headers, body).await.unwrap();
        assert_eq!(msg.from, "sender@example.com");
        assert_eq!(msg.subject, Some("hi".to_string()));
        assert_eq!(msg.text, "plain");
    }

    #[tokio::test]
    async fn html_stands_in_for_missing_text() {
        let c = client();
        let headers: Headers = vec![(
            "content-type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        )];
        let body = b"from=a%40b.com&to=c%40d.com&subject=hi&html=%3Cp%3Ehello%3C%2Fp%3E";

        let msg = c.parse_inbound(&headers, body).await.unwrap();
        assert_eq!(msg.text, "<p>hello</p>");
    }
}
