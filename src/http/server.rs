//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router and wire up middleware (CORS, request ID,
//!   tracing, panic recovery)
//! - Classify each request as proxy or local before any body is read
//! - Dispatch proxy requests to the route table and forwarder
//! - Dispatch local requests to the local router
//! - Serve with graceful shutdown

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::InvalidHeaderValue, HeaderValue, Method, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceExt;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowHeaders, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{CorsConfig, GatewayConfig};
use crate::http::classify::{Classifier, RouteClass};
use crate::http::local;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::panic_response;
use crate::observability::metrics;
use crate::proxy::Forwarder;
use crate::routing::router::InvalidUpstream;
use crate::routing::RouteTable;
use crate::security::ClientInfo;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Upstream(#[from] InvalidUpstream),
    #[error("invalid CORS origin: {0}")]
    CorsOrigin(#[from] InvalidHeaderValue),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into the gateway handler.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub classifier: Classifier,
    pub forwarder: Forwarder,
    /// Router for local requests; carries the JSON body layer.
    pub local: Router,
    pub trusted_hops: usize,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        let routes = Arc::new(RouteTable::from_config(&config.routes)?);
        for route in routes.routes() {
            tracing::info!(
                route = %route.name,
                upstream = %route.upstream.base_url,
                prefixes = ?route.matchers.iter().map(|m| m.prefix()).collect::<Vec<_>>(),
                "Route registered"
            );
        }

        let state = AppState {
            routes,
            classifier: Classifier::new(config.limits.api_prefix.clone()),
            forwarder: Forwarder::new(&config.timeouts),
            local: local::router(config.limits.max_body_bytes),
            trusted_hops: config.security.trusted_hops,
        };

        let router = Self::build_router(&config, state)?;
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Result<Router, ServerError> {
        let router = Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state);
        Ok(with_layers(router, &config.cors)?)
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            allowed_origin = %self.config.cors.allowed_origin,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Wrap `router` in the gateway's middleware. Listed innermost first; CORS
/// ends up outermost.
fn with_layers(router: Router, cors: &CorsConfig) -> Result<Router, InvalidHeaderValue> {
    Ok(router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(set_request_id_layer())
        .layer(cors_layer(cors)?))
}

/// CORS policy: one origin, credentials allowed. Outermost layer, so error
/// and panic responses carry the headers as well.
pub fn cors_layer(config: &CorsConfig) -> Result<CorsLayer, InvalidHeaderValue> {
    let origin = HeaderValue::from_str(&config.allowed_origin)?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .max_age(Duration::from_secs(600)))
}

/// Classify, then either forward upstream or hand to the local router.
async fn gateway_handler(State(state): State<AppState>, mut request: Request<Body>) -> Response {
    let start = Instant::now();
    let peer_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
    let client = ClientInfo::resolve(request.headers(), peer_ip, state.trusted_hops);

    let path = request.uri().path().to_string();
    let method = request.method().clone();

    tracing::debug!(
        request_id = %request_id(request.headers()),
        method = %method,
        path = %path,
        client_ip = %client.ip,
        "Request received"
    );

    match state.classifier.classify(&path) {
        RouteClass::Local => {
            request.extensions_mut().insert(client);
            let response = match state.local.oneshot(request).await {
                Ok(response) => response,
                Err(never) => match never {},
            };
            metrics::record_request(method.as_str(), response.status().as_u16(), "local", start);
            response
        }
        RouteClass::Proxy => {
            let route = match state.routes.resolve(&path) {
                Ok(route) => route,
                Err(e) => {
                    tracing::warn!(
                        request_id = %request_id(request.headers()),
                        method = %method,
                        path = %path,
                        "No route matched"
                    );
                    metrics::record_request(method.as_str(), e.status().as_u16(), "none", start);
                    return e.into_response();
                }
            };

            match state.forwarder.forward(request, &route.upstream, &client).await {
                Ok(response) => response,
                Err(e) => e.into_response(),
            }
        }
    }
}
