//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs before anything binds or connects
//! - Reject auth settings that would lock everyone out
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::{AuthMode, GatewayConfig};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("password auth is enabled but no password is configured")]
    MissingPassword,

    #[error("TLS needs both a certificate and a private key")]
    IncompleteTls,

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("editor backend URL is invalid: {0}")]
    InvalidBackendUrl(String),

    #[error("update check interval must be greater than zero")]
    ZeroUpdateInterval,
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.auth.mode == AuthMode::Password
        && config.auth.password.as_deref().map_or(true, str::is_empty)
    {
        errors.push(ValidationError::MissingPassword);
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.as_os_str().is_empty() || tls.key_path.as_os_str().is_empty() {
            errors.push(ValidationError::IncompleteTls);
        }
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if let Some(addr) = &config.listener.redirect_address {
        check_address(&mut errors, "listener.redirect_address", addr);
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    match url::Url::parse(&config.editor.backend_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::InvalidBackendUrl(format!(
            "unsupported scheme {}",
            url.scheme()
        ))),
        Err(e) => errors.push(ValidationError::InvalidBackendUrl(e.to_string())),
    }

    if config.update.check_interval_secs == 0 {
        errors.push(ValidationError::ZeroUpdateInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
