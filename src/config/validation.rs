//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate upstream base URLs and route prefixes
//! - Validate value ranges (timeouts > 0, limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Duplicate prefixes are legal (first registered wins) but logged

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),
    #[error("no routes configured")]
    NoRoutes,
    #[error("route #{0} has an empty name")]
    EmptyRouteName(usize),
    #[error("route '{0}' has no path prefixes")]
    NoPrefixes(String),
    #[error("route '{route}': prefix '{prefix}' is not under the API prefix '{api_prefix}'")]
    PrefixOutsideApi {
        route: String,
        prefix: String,
        api_prefix: String,
    },
    #[error("route '{route}': invalid upstream URL '{url}': {reason}")]
    Upstream {
        route: String,
        url: String,
        reason: String,
    },
    #[error("api_prefix '{0}' must start with '/'")]
    ApiPrefix(String),
    #[error("cors.allowed_origin '{0}' is not a valid origin")]
    CorsOrigin(String),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if !config.limits.api_prefix.starts_with('/') {
        errors.push(ValidationError::ApiPrefix(config.limits.api_prefix.clone()));
    }
    // Same rule the classifier applies: the bare root or anything under
    // `root/`. Prefixes outside it would never reach the route table.
    let api_root = config.limits.api_prefix.trim_end_matches('/');
    let api_dir = format!("{}/", api_root);

    if config.routes.is_empty() {
        errors.push(ValidationError::NoRoutes);
    }

    let mut seen = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        if route.name.trim().is_empty() {
            errors.push(ValidationError::EmptyRouteName(index));
        }
        if route.path_prefixes.is_empty() {
            errors.push(ValidationError::NoPrefixes(route.name.clone()));
        }
        for prefix in &route.path_prefixes {
            if !(prefix == api_root || prefix.starts_with(&api_dir)) {
                errors.push(ValidationError::PrefixOutsideApi {
                    route: route.name.clone(),
                    prefix: prefix.clone(),
                    api_prefix: config.limits.api_prefix.clone(),
                });
            }
            if !seen.insert(prefix.as_str()) {
                tracing::warn!(
                    route = %route.name,
                    prefix = %prefix,
                    "Duplicate path prefix, the earlier route keeps it"
                );
            }
        }
        if let Err(reason) = check_upstream(&route.upstream) {
            errors.push(ValidationError::Upstream {
                route: route.name.clone(),
                url: route.upstream.clone(),
                reason,
            });
        }
    }

    if !is_valid_origin(&config.cors.allowed_origin) {
        errors.push(ValidationError::CorsOrigin(config.cors.allowed_origin.clone()));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_body_bytes"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.upstream_secs"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.connect_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_upstream(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("base URL must not carry a query or fragment".to_string());
    }
    Ok(())
}

fn is_valid_origin(origin: &str) -> bool {
    match Url::parse(origin) {
        Ok(url) => url.host_str().is_some() && axum::http::HeaderValue::from_str(origin).is_ok(),
        Err(_) => false,
    }
}
