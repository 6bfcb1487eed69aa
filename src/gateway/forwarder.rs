//! Forwarder transformer (§4.7): builds the outbound request from the
//! client's request plus a routed `RouteDecision`. Copies headers
//! verbatim except a fixed sanitization list, sets `Host`, merges
//! strategy-supplied headers without overriding, and replaces the URI.

use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use once_cell::sync::Lazy;
use reqwest::{Client, Response};

use crate::routing::RouteDecision;

/// Proxy/edge headers stripped regardless of case (§4.7). `HeaderName`
/// always compares case-insensitively, so this list is already lowercase.
const SANITIZED_HEADERS: &[&str] = &[
    "x-forwarded-for",
    "x-forwarded-host",
    "x-forwarded-proto",
    "x-real-ip",
    "cf-connecting-ip",
    "cf-connecting-ipv6",
    "cf-pseudo-ipv4",
    "true-client-ip",
    "cf-ray",
    "cf-ipcountry",
];

fn is_sanitized(name: &HeaderName) -> bool {
    SANITIZED_HEADERS.iter().any(|blocked| name.as_str() == *blocked)
}

/// The shared connection-pooled client (§5): HTTP/2 negotiated via ALPN
/// with HTTP/1.1 fallback (reqwest's default — we never force
/// `http2_prior_knowledge`, which would remove the fallback), no
/// automatic redirects, no cookie jar, and no response
/// auto-decompression (the `gzip`/`brotli`/`deflate` reqwest features
/// are deliberately not enabled, so `Accept-Encoding` passes through
/// and upstream bytes reach the client exactly as sent).
pub fn client() -> &'static Client {
    static CLIENT: Lazy<Client> = Lazy::new(|| {
        let settings = crate::config::load();
        Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.idle_timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("reqwest client configuration is valid")
    });
    &CLIENT
}

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Applies the transformer and issues the outbound request. `decision`
/// must be a `RouteDecision::Success`; callers are expected to have
/// already handled the failure case as a 404 (§4.6).
pub async fn forward(
    method: Method,
    inbound_headers: &HeaderMap,
    body: Body,
    scheme: &str,
    host: &str,
    target_segments: &[String],
    query: &str,
    extra_headers: &std::collections::HashMap<String, String>,
) -> Result<Response, ForwardError> {
    let uri = crate::path::build_target_uri(scheme, host, target_segments, query);
    let url = reqwest::Url::parse(&uri).map_err(|e| ForwardError::InvalidTarget(e.to_string()))?;

    let mut out_headers = HeaderMap::with_capacity(inbound_headers.len() + extra_headers.len() + 1);
    for (name, value) in inbound_headers.iter() {
        if is_sanitized(name) {
            continue;
        }
        out_headers.append(name.clone(), value.clone());
    }
    out_headers.insert(
        axum::http::header::HOST,
        HeaderValue::from_str(host).map_err(|e| ForwardError::InvalidTarget(e.to_string()))?,
    );
    for (name, value) in extra_headers {
        let Ok(header_name) = HeaderName::try_from(name.as_str()) else {
            continue;
        };
        if out_headers.contains_key(&header_name) {
            continue;
        }
        let Ok(header_value) = HeaderValue::from_str(value) else {
            continue;
        };
        out_headers.insert(header_name, header_value);
    }

    let reqwest_body = reqwest::Body::wrap_stream(body.into_data_stream());

    let response = client()
        .request(method, url)
        .headers(out_headers)
        .body(reqwest_body)
        .send()
        .await?;

    Ok(response)
}

/// Convenience overload for a routed `RouteDecision::Success`.
pub async fn forward_decision(
    method: Method,
    inbound_headers: &HeaderMap,
    body: Body,
    decision: &RouteDecision,
) -> Result<Response, ForwardError> {
    match decision {
        RouteDecision::Success { scheme, host, target_segments, query, extra_headers, .. } => {
            forward(method, inbound_headers, body, scheme, host, target_segments, query, extra_headers).await
        }
        RouteDecision::Failure { error } => Err(ForwardError::InvalidTarget(error.clone())),
    }
}
