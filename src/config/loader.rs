//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{GatewayConfig, DEPARTMENT_SERVICE, USER_SERVICE};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then environment overrides,
/// then validation.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply the recognized environment variables on top of `config`.
///
/// `lookup` abstracts over the process environment so overrides can be
/// exercised without mutating global state.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("PORT") {
        let port = value
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::Env { var: "PORT", value })?;
        config.listener.set_port(port);
    }

    if let Some(origin) = lookup("CORS_ORIGIN") {
        config.cors.allowed_origin = origin;
    }

    for (var, route_name) in [
        ("USER_SERVICE_URL", USER_SERVICE),
        ("DEPARTMENT_SERVICE_URL", DEPARTMENT_SERVICE),
    ] {
        if let Some(url) = lookup(var) {
            match config.routes.iter_mut().find(|r| r.name == route_name) {
                Some(route) => route.upstream = url,
                None => tracing::warn!(var, route = route_name, "No route to override"),
            }
        }
    }

    if let Some(value) = lookup("MAX_BODY_BYTES") {
        config.limits.max_body_bytes = value.trim().parse().map_err(|_| ConfigError::Env {
            var: "MAX_BODY_BYTES",
            value,
        })?;
    }

    if let Some(value) = lookup("UPSTREAM_TIMEOUT_SECS") {
        config.timeouts.upstream_secs = value.trim().parse().map_err(|_| ConfigError::Env {
            var: "UPSTREAM_TIMEOUT_SECS",
            value,
        })?;
    }

    Ok(())
}
