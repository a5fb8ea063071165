//! Response handling and error mapping.
//!
//! # Responsibilities
//! - Map gateway failures to HTTP status codes
//! - Render every failure as the same JSON error body
//! - Turn caught handler panics into that body as well
//!
//! # Design Decisions
//! - Routing and classification errors short-circuit before any upstream call
//! - Upstream errors keep their cause for logging; clients see a short message
//! - Backend timeouts result in 504 Gateway Timeout

use std::any::Any;

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every way a request can fail inside the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no route matches '{path}'")]
    NoRouteFound { path: String },

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("request body is not valid JSON: {0}")]
    MalformedBody(String),

    #[error("upstream '{upstream}' is unreachable: {source}")]
    UpstreamUnreachable {
        upstream: String,
        #[source]
        source: BoxError,
    },

    #[error("upstream '{upstream}' did not respond within {secs}s")]
    UpstreamTimeout { upstream: String, secs: u64 },

    #[error("upstream '{upstream}' sent a bad response: {source}")]
    UpstreamBadResponse {
        upstream: String,
        #[source]
        source: BoxError,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NoRouteFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::UpstreamUnreachable { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamBadResponse { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable tag for the error body.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::NoRouteFound { .. } => "not_found",
            GatewayError::BodyTooLarge { .. } => "payload_too_large",
            GatewayError::MalformedBody(_) => "malformed_body",
            GatewayError::UpstreamUnreachable { .. } => "upstream_unreachable",
            GatewayError::UpstreamTimeout { .. } => "upstream_timeout",
            GatewayError::UpstreamBadResponse { .. } => "upstream_bad_response",
            GatewayError::Internal(_) => "internal_error",
        }
    }

    /// Message shown to clients. Upstream causes stay in the logs.
    fn public_message(&self) -> String {
        match self {
            GatewayError::UpstreamUnreachable { upstream, .. } => {
                format!("Service '{}' is unavailable", upstream)
            }
            GatewayError::UpstreamBadResponse { upstream, .. } => {
                format!("Service '{}' returned an invalid response", upstream)
            }
            GatewayError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.kind(),
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Panic handler for `CatchPanicLayer`: a panicking handler becomes a 500
/// with the standard error body instead of a dropped connection.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");

    let body = serde_json::json!({
        "error": "internal_error",
        "message": "Internal server error",
    });
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let io = || -> BoxError { Box::new(std::io::Error::from(std::io::ErrorKind::ConnectionRefused)) };

        assert_eq!(
            GatewayError::NoRouteFound { path: "/x".into() }.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::BodyTooLarge { limit: 1 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            GatewayError::UpstreamUnreachable { upstream: "u".into(), source: io() }.status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GatewayError::UpstreamTimeout { upstream: "u".into(), secs: 30 }.status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            GatewayError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn renders_json_body() {
        let response = GatewayError::NoRouteFound { path: "/api/v1/unknown".into() }.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["error"], "not_found");
        assert_eq!(value["message"], "no route matches '/api/v1/unknown'");
    }

    #[tokio::test]
    async fn hides_internal_detail() {
        let response = GatewayError::Internal("pool poisoned".into()).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["message"], "Internal server error");
    }
}
