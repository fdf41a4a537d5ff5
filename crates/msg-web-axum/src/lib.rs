use axum::{
    extract::{Path, RawQuery, State},
    http::HeaderMap,
    response::IntoResponse,
};
use bytes::Bytes;
use msg_core::{Headers, InboundRegistry};
use msg_web_generic::{HeaderConverter, ResponseConverter, WebhookProcessor};

#[derive(Clone)]
pub struct AppState {
    pub registry: InboundRegistry,
}

/// Axum-specific header converter
pub struct AxumHeaderConverter;

impl HeaderConverter for AxumHeaderConverter {
    type HeaderType = HeaderMap;

    fn to_generic_headers(headers: &Self::HeaderType) -> Headers {
        headers
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

/// Axum-specific response converter
pub struct AxumResponseConverter;

impl ResponseConverter for AxumResponseConverter {
    type ResponseType = axum::response::Response;

    fn from_webhook_response(response: msg_core::WebhookResponse) -> Self::ResponseType {
        let status = axum::http::StatusCode::from_u16(response.status.as_u16())
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);

        (
            status,
            [("content-type", response.content_type)],
            response.body,
        )
            .into_response()
    }
}

/// Unified handler: POST /webhooks/{provider}
pub async fn unified_webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let processor = WebhookProcessor::new(state.registry);
    let generic_headers = AxumHeaderConverter::to_generic_headers(&headers);
    let response = processor
        .process_webhook(&provider, generic_headers, query.as_deref().unwrap_or(""), &body)
        .await;
    AxumResponseConverter::from_webhook_response(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::{routing::post, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn unknown_provider_maps_to_404() {
        let state = AppState {
            registry: InboundRegistry::new(),
        };
        let app = Router::new()
            .route("/webhooks/{provider}", post(unified_webhook))
            .with_state(state);

        let request = Request::builder()
            .method("POST")
            .uri("/webhooks/nope")
            .body(Body::from("payload"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
