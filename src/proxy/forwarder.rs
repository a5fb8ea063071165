//! Upstream request forwarding.
//!
//! # Responsibilities
//! - Build the upstream request: same method, path, query and body
//! - Strip hop-by-hop headers, keep `Content-Type` byte-identical
//! - Enforce the upstream deadline on time spent waiting for the upstream
//! - Relay status, headers and streamed body back unchanged
//!
//! # Design Decisions
//! - Bodies stream through; the gateway never buffers a proxied upload
//! - One pooled client for all upstreams; hyper keys the pool by authority
//! - Dropping the returned future (client went away) drops the upstream call
//! - A slow client upload does not count against the upstream deadline

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{header, Request, Uri, Version},
    response::Response,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::TimeoutConfig;
use crate::http::request::request_id;
use crate::http::response::GatewayError;
use crate::observability::metrics;
use crate::proxy::progress;
use crate::routing::Upstream;
use crate::security::headers::{apply_forwarded, strip_hop_by_hop};
use crate::security::ClientInfo;

pub type UpstreamClient = Client<HttpConnector, Body>;

/// Sends requests to upstreams and relays their responses.
#[derive(Clone)]
pub struct Forwarder {
    client: UpstreamClient,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
            .build(connector);

        Self {
            client,
            timeout: Duration::from_secs(timeouts.upstream_secs),
        }
    }

    /// Forward `request` to `upstream`.
    pub async fn forward(
        &self,
        request: Request<Body>,
        upstream: &Upstream,
        client: &ClientInfo,
    ) -> Result<Response, GatewayError> {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let request_id = request_id(request.headers()).to_string();

        let upstream_request = match build_upstream_request(request, upstream, client) {
            Ok(upstream_request) => upstream_request,
            Err(err) => {
                tracing::error!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    upstream = %upstream.name,
                    error = %err,
                    "Could not build upstream request"
                );
                metrics::record_request(method.as_str(), err.status().as_u16(), &upstream.name, start);
                return Err(err);
            }
        };

        let (parts, body) = upstream_request.into_parts();
        let (body, upload) = progress::track(body);
        let upstream_request = Request::from_parts(parts, body);

        let result = tokio::select! {
            result = self.client.request(upstream_request) => Ok(result),
            _ = progress::upstream_deadline(upload, self.timeout) => Err(()),
        };

        let response = match result {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let err = if e.is_connect() {
                    GatewayError::UpstreamUnreachable {
                        upstream: upstream.name.clone(),
                        source: Box::new(e),
                    }
                } else {
                    GatewayError::UpstreamBadResponse {
                        upstream: upstream.name.clone(),
                        source: Box::new(e),
                    }
                };
                tracing::error!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    upstream = %upstream.name,
                    error = %err,
                    "Upstream request failed"
                );
                metrics::record_upstream_error(&upstream.name, err.kind());
                metrics::record_request(method.as_str(), err.status().as_u16(), &upstream.name, start);
                return Err(err);
            }
            Err(_) => {
                let err = GatewayError::UpstreamTimeout {
                    upstream: upstream.name.clone(),
                    secs: self.timeout.as_secs(),
                };
                tracing::error!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    upstream = %upstream.name,
                    error = %err,
                    "Upstream request timed out"
                );
                metrics::record_upstream_error(&upstream.name, err.kind());
                metrics::record_request(method.as_str(), err.status().as_u16(), &upstream.name, start);
                return Err(err);
            }
        };

        let status = response.status();
        tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            upstream = %upstream.name,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Forwarded"
        );
        metrics::record_request(method.as_str(), status.as_u16(), &upstream.name, start);

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Turn the inbound request into the upstream request. The body is moved,
/// never read.
pub fn build_upstream_request(
    request: Request<Body>,
    upstream: &Upstream,
    client: &ClientInfo,
) -> Result<Request<Body>, GatewayError> {
    let (parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let uri: Uri = upstream.url_for(path_and_query).parse().map_err(|e| {
        GatewayError::Internal(format!("cannot build upstream URI for '{}': {}", path_and_query, e))
    })?;

    let content_type = parts.headers.get(header::CONTENT_TYPE).cloned();
    let original_host = parts.headers.get(header::HOST).cloned().or_else(|| {
        parts
            .uri
            .authority()
            .and_then(|a| a.as_str().parse().ok())
    });

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    // The client sets Host from the upstream URI.
    headers.remove(header::HOST);
    apply_forwarded(&mut headers, client, original_host);
    if let Some(content_type) = content_type {
        headers.insert(header::CONTENT_TYPE, content_type);
    }

    let mut upstream_request = Request::new(body);
    *upstream_request.method_mut() = parts.method;
    *upstream_request.uri_mut() = uri;
    *upstream_request.version_mut() = Version::HTTP_11;
    *upstream_request.headers_mut() = headers;

    Ok(upstream_request)
}
