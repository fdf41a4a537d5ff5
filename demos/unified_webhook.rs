//! Run a tiny Axum server that exposes a unified webhook endpoint for both
//! providers, with per-provider rate limiting in front of the processor.
//!
//! Register real credentials through `AppConfig` in a real deployment; this
//! demo wires placeholder clients with verification relaxed so it can be
//! poked locally:
//!
//! ```text
//! curl -X POST 'http://localhost:3000/webhooks/twilio' \
//!   -d 'From=%2B15550001111&To=%2B15550002222&Body=Hello&MessageSid=SM123'
//! ```

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{routing::post, Router};
use msg_sendgrid::SendGridClient;
use msg_twilio::TwilioClient;
use msg_web_axum::{AxumHeaderConverter, AxumResponseConverter};
use msg_web_generic::{HeaderConverter, ResponseConverter, WebhookProcessor};
use msgkit::prelude::*;

#[derive(Clone)]
struct ServerState {
    processor: WebhookProcessor,
    limiter: Arc<RateLimiter>,
}

async fn rate_limited_webhook(
    State(state): State<ServerState>,
    Path(provider): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let generic_headers = AxumHeaderConverter::to_generic_headers(&headers);

    let key_gen = DefaultKeyGenerator;
    let key = match key_gen.extract_client_ip(&generic_headers) {
        Some(ip) => key_gen.generate_key(&provider, &ip),
        None => provider.clone(),
    };
    if !state.limiter.check_rate_limit(&key).is_allowed() {
        return (StatusCode::TOO_MANY_REQUESTS, "rate limited").into_response();
    }

    let response = state
        .processor
        .process_webhook(
            &provider,
            generic_headers,
            query.as_deref().unwrap_or(""),
            &body,
        )
        .await;
    AxumResponseConverter::from_webhook_response(response)
}

#[tokio::main]
async fn main() {
    let config = AppConfig::load().unwrap_or_default();
    init_tracing(&config.logging);

    let twilio = TwilioClient::new("AC_demo", "demo_token")
        .unwrap()
        .insecure_skip_verification();
    let sendgrid = SendGridClient::new("demo_user", "demo_password").unwrap();

    let registry = InboundRegistry::new()
        .with(Arc::new(twilio))
        .with(Arc::new(sendgrid));
    let state = ServerState {
        processor: WebhookProcessor::new(registry),
        limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
    };

    let app = Router::new()
        .route("/webhooks/{provider}", post(rate_limited_webhook))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.server.port))
        .await
        .unwrap();
    println!("Listening on http://0.0.0.0:{}", config.server.port);
    axum::serve(listener, app).await.unwrap();
}
