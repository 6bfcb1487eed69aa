//! HTTP entry point: an ambient `/health` and `/providers` surface in
//! front of the gateway's catch-all `/{provider}/{rest...}` route (§15).

use std::net::SocketAddr;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::config;
use crate::gateway::{self, GatewayState};

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn providers(axum::extract::State(state): axum::extract::State<GatewayState>) -> Json<Value> {
    Json(json!({"providers": state.router.provider_names()}))
}

pub fn app() -> Router {
    let cors = CorsLayer::permissive();
    let state = GatewayState::new();
    Router::new()
        .route("/health", get(health))
        .route("/providers", get(providers))
        .fallback(gateway::handle)
        .layer(cors)
        .with_state(state)
}

pub async fn serve() {
    let settings = config::load();
    let app = app();
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .expect("configured host/port must form a valid socket address");
    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind gateway listener");
    tracing::info!(%addr, "gateway listening");
    axum::serve(listener, app).await.expect("gateway server loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_ok() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let a = app();
        let h = tokio::spawn(async move { axum::serve(listener, a).await.unwrap() });
        let url = format!("http://{}", addr);
        let r = reqwest::get(format!("{}/health", url)).await.unwrap();
        let s = r.json::<serde_json::Value>().await.unwrap();
        assert_eq!(s["status"], "ok");
        h.abort();
    }

    #[tokio::test]
    async fn providers_lists_known_names() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let a = app();
        let h = tokio::spawn(async move { axum::serve(listener, a).await.unwrap() });
        let url = format!("http://{}", addr);
        let r = reqwest::get(format!("{}/providers", url)).await.unwrap();
        let s = r.json::<serde_json::Value>().await.unwrap();
        let names = s["providers"].as_array().unwrap();
        assert!(names.iter().any(|v| v == "openai"));
        assert!(names.iter().any(|v| v == "anthropic"));
        h.abort();
    }

    #[tokio::test]
    async fn unrouted_provider_falls_through_to_404() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let a = app();
        let h = tokio::spawn(async move { axum::serve(listener, a).await.unwrap() });
        let url = format!("http://{}", addr);
        let r = reqwest::get(format!("{}/does-not-exist/x", url)).await.unwrap();
        assert_eq!(r.status(), reqwest::StatusCode::NOT_FOUND);
        h.abort();
    }
}
