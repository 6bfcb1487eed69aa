//! Gateway middleware (§4.6): parse → route → forward → (optionally)
//! observe. The single synchronous failure boundary for the client —
//! everything past a successful forward is best-effort (§7).

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use futures_util::TryStreamExt;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::gateway::{forwarder, observer};
use crate::parsers::ProviderFamily;
use crate::path::ParsedPath;
use crate::routing::{Router, RouteDecision};
use crate::usage::{AnthropicTracker, OpenAiCompatibleTracker, UsageTracker};

#[derive(Clone)]
pub struct GatewayState {
    pub router: Arc<Router>,
}

impl GatewayState {
    pub fn new() -> Self {
        GatewayState { router: Arc::new(Router::with_default_strategies()) }
    }
}

impl Default for GatewayState {
    fn default() -> Self {
        Self::new()
    }
}

/// Which usage tracker, if any, wants to observe this request — decided
/// by provider name plus the routed rest-of-path (§4.11). A request
/// nobody wants to observe is forwarded without wiring an observer at
/// all.
fn observed_family(provider: &str, rest_path: &str) -> ProviderFamily {
    if OpenAiCompatibleTracker.should_track(provider, rest_path) {
        ProviderFamily::OpenAiCompatible
    } else if AnthropicTracker.should_track(provider, rest_path) {
        ProviderFamily::Anthropic
    } else {
        ProviderFamily::None
    }
}

/// Checks the optional client-facing bearer token (§15, ambient — bounds
/// the pipeline but is not part of the routing/forwarding/observer core).
fn check_authorization(headers: &HeaderMap) -> Result<(), Response> {
    let settings = crate::config::load();
    let Some(expected) = settings.forward_token.filter(|t| !t.is_empty()) else {
        return Ok(());
    };

    let presented = extract_request_token(headers);
    if presented.as_deref() == Some(expected.as_str()) {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, [("content-type", "text/plain")], "Unauthorized").into_response())
    }
}

/// Priority order: `X-CCR-Forward-Token`, `Authorization: Bearer`,
/// `x-api-key`, `x-goog-api-key`.
fn extract_request_token(headers: &HeaderMap) -> Option<String> {
    let header_str = |name: &str| -> Option<String> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    if let Some(token) = header_str("x-ccr-forward-token") {
        return Some(token);
    }
    if let Some(bearer) = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return Some(bearer.to_string());
    }
    if let Some(token) = header_str("x-api-key") {
        return Some(token);
    }
    header_str("x-goog-api-key")
}

/// The catch-all handler for every `/{provider}/{rest...}` request.
pub async fn handle(
    State(state): State<GatewayState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Response {
    if let Err(unauthorized) = check_authorization(&headers) {
        return unauthorized;
    }

    let parsed = ParsedPath::parse(uri.path(), uri.query().unwrap_or(""));
    let decision = state.router.route(&parsed);

    let RouteDecision::Success { ref provider, .. } = decision else {
        let RouteDecision::Failure { error } = decision else { unreachable!() };
        return GatewayError::NotFound(error).into_response();
    };

    let rest_path = parsed.rest().join("/");
    let family = observed_family(provider, &rest_path);
    let provider = provider.clone();
    let request_id = Uuid::new_v4().to_string();

    let upstream = match forwarder::forward_decision(method, &headers, body, &decision).await {
        Ok(resp) => resp,
        Err(forwarder::ForwardError::InvalidTarget(msg)) => {
            tracing::warn!(provider = %provider, error = %msg, "rejected forwarding target");
            return GatewayError::Internal.into_response();
        }
        Err(forwarder::ForwardError::Transport(err)) => {
            tracing::warn!(provider = %provider, error = %err, "upstream forwarding failed");
            return GatewayError::BadGateway.into_response();
        }
    };

    build_response(upstream, family, provider, request_id)
}

fn build_response(upstream: reqwest::Response, family: ProviderFamily, provider: String, request_id: String) -> Response {
    let status = upstream.status();
    let resp_headers = upstream.headers().clone();

    let content_type = resp_headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let streaming = observer::is_streaming_content_type(content_type);

    let body = if family == ProviderFamily::None {
        Body::from_stream(upstream.bytes_stream().map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)))
    } else {
        let encoding = observer::classify_encoding(
            resp_headers.get(axum::http::header::CONTENT_ENCODING).and_then(|v: &HeaderValue| v.to_str().ok()),
        );
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(observer::run_parser_task(rx, encoding, family, streaming, provider.clone(), request_id));
        Body::from_stream(observer::TeeStream::new(upstream.bytes_stream(), tx))
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = resp_headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body as AxumBody;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> axum::Router {
        axum::Router::new().fallback(handle).with_state(GatewayState::new())
    }

    #[tokio::test]
    async fn unknown_provider_yields_404_before_any_upstream_call() {
        let app = app();
        let response = app
            .oneshot(Request::builder().uri("/nope/anything").body(AxumBody::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).starts_with("Unknown provider: nope."));
    }

    #[test]
    fn observed_family_matches_openai_chat_completions() {
        assert_eq!(observed_family("openai", "v1/chat/completions"), ProviderFamily::OpenAiCompatible);
        assert_eq!(observed_family("openai", "v1/models"), ProviderFamily::None);
        assert_eq!(observed_family("anthropic", "v1/messages"), ProviderFamily::Anthropic);
        assert_eq!(observed_family("groq", "v1/chat/completions"), ProviderFamily::None);
    }

    #[test]
    fn authorization_passes_when_no_token_configured() {
        let headers = HeaderMap::new();
        assert!(check_authorization(&headers).is_ok());
    }
}
