//! Local routes: requests the gateway answers itself.
//!
//! Only local requests pass through [`prepare_local`], which parses cookies
//! and reads JSON bodies up to the configured limit. Proxy requests never
//! reach this router.

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde::Serialize;

use crate::http::response::GatewayError;
use crate::security::ClientInfo;

/// Per-request data made available to local handlers.
#[derive(Debug, Clone)]
pub struct LocalContext {
    pub cookies: CookieJar,
    /// Parsed body, present for non-empty `application/json` requests.
    pub json: Option<serde_json::Value>,
    pub client: Option<ClientInfo>,
}

#[derive(Debug, Clone, Copy)]
struct BodyLimit(usize);

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub message: &'static str,
}

pub const HEALTH: HealthStatus = HealthStatus {
    status: "ok",
    message: "API Gateway is up",
};

/// Build the local router. `max_body_bytes` caps JSON bodies.
pub fn router(max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(health).fallback(not_found))
        .route("/health", get(health).fallback(not_found))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            BodyLimit(max_body_bytes),
            prepare_local,
        ))
}

async fn health() -> Json<HealthStatus> {
    Json(HEALTH)
}

async fn not_found(request: Request) -> GatewayError {
    GatewayError::NoRouteFound {
        path: request.uri().path().to_string(),
    }
}

async fn prepare_local(
    State(limit): State<BodyLimit>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let cookies = CookieJar::from_headers(&parts.headers);
    let (json, body) = if is_json(&parts.headers) {
        let bytes = match read_limited(&parts.headers, body, limit.0).await {
            Ok(bytes) => bytes,
            Err(e) => return e.into_response(),
        };
        let json = if bytes.is_empty() {
            None
        } else {
            match serde_json::from_slice(&bytes) {
                Ok(value) => Some(value),
                Err(e) => return GatewayError::MalformedBody(e.to_string()).into_response(),
            }
        };
        (json, Body::from(bytes))
    } else {
        (None, body)
    };

    let client = parts.extensions.get::<ClientInfo>().cloned();
    parts.extensions.insert(LocalContext {
        cookies,
        json,
        client,
    });

    next.run(Request::from_parts(parts, body)).await
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim();
            mime.eq_ignore_ascii_case("application/json")
                || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
        .unwrap_or(false)
}

/// Read a whole body, refusing more than `limit` bytes. A declared
/// `Content-Length` over the limit is rejected before reading.
pub async fn read_limited(headers: &HeaderMap, body: Body, limit: usize) -> Result<Bytes, GatewayError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit as u64) {
        return Err(GatewayError::BodyTooLarge { limit });
    }

    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(GatewayError::BodyTooLarge { limit }),
        Err(e) => Err(GatewayError::MalformedBody(e.to_string())),
    }
}
