//! The gateway's single synchronous failure boundary for the client.
//!
//! Parse/validation failures surface as 404, upstream transport failures as
//! 502, and anything unexpected as 500. Bodies are plain text, matching what
//! the gateway itself produces — nothing past this boundary (observer,
//! parser) is allowed to reach the client as an error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    NotFound(String),

    #[error("Bad Gateway")]
    BadGateway,

    #[error("Internal server error during request forwarding")]
    Internal,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::BadGateway => StatusCode::BAD_GATEWAY,
            GatewayError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = self.to_string();
        (status, [("content-type", "text/plain")], body).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
