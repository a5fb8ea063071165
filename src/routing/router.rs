//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Resolve a request path to the route with the longest matching prefix
//! - Return an explicit `NoRouteFound` rather than a silent default
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) prefix scan over all registered prefixes
//! - Equal-length matches: the first registered route wins

use axum::http::uri::{Authority, Scheme};
use thiserror::Error;

use crate::config::RouteConfig;
use crate::http::response::GatewayError;
use crate::routing::matcher::PathPrefixMatcher;

#[derive(Debug, Error)]
#[error("route '{route}': invalid upstream '{url}'")]
pub struct InvalidUpstream {
    pub route: String,
    pub url: String,
}

/// A backend service the gateway forwards to.
#[derive(Debug, Clone)]
pub struct Upstream {
    /// Route name, used in logs, metrics and error bodies.
    pub name: String,
    /// Base URL without trailing slash, e.g. `http://127.0.0.1:3001`.
    pub base_url: String,
    pub scheme: Scheme,
    pub authority: Authority,
}

impl Upstream {
    fn parse(name: &str, raw: &str) -> Result<Self, InvalidUpstream> {
        let invalid = || InvalidUpstream {
            route: name.to_string(),
            url: raw.to_string(),
        };

        let base_url = raw.trim_end_matches('/').to_string();
        let uri: axum::http::Uri = base_url.parse().map_err(|_| invalid())?;
        let scheme = uri.scheme().cloned().ok_or_else(invalid)?;
        let authority = uri.authority().cloned().ok_or_else(invalid)?;

        Ok(Self {
            name: name.to_string(),
            base_url,
            scheme,
            authority,
        })
    }

    /// Upstream URL for an original request target. The path is appended
    /// unchanged, query string included.
    pub fn url_for(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }
}

/// A compiled route: a set of prefixes and the upstream they point to.
#[derive(Debug)]
pub struct Route {
    pub name: String,
    pub matchers: Vec<PathPrefixMatcher>,
    pub upstream: Upstream,
}

/// Immutable prefix → upstream table.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile routes from configuration, preserving registration order.
    pub fn from_config(configs: &[RouteConfig]) -> Result<Self, InvalidUpstream> {
        let routes = configs
            .iter()
            .map(|config| {
                Ok(Route {
                    name: config.name.clone(),
                    matchers: config
                        .path_prefixes
                        .iter()
                        .map(PathPrefixMatcher::new)
                        .collect(),
                    upstream: Upstream::parse(&config.name, &config.upstream)?,
                })
            })
            .collect::<Result<Vec<_>, InvalidUpstream>>()?;

        Ok(Self { routes })
    }

    /// Find the route owning `path`.
    pub fn resolve(&self, path: &str) -> Result<&Route, GatewayError> {
        let mut best: Option<(&Route, usize)> = None;

        for route in &self.routes {
            for matcher in &route.matchers {
                if !matcher.matches(path) {
                    continue;
                }
                // Strictly longer only, so earlier registrations keep ties.
                if best.map_or(true, |(_, len)| matcher.len() > len) {
                    best = Some((route, matcher.len()));
                }
            }
        }

        best.map(|(route, _)| route)
            .ok_or_else(|| GatewayError::NoRouteFound {
                path: path.to_string(),
            })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
