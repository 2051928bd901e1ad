//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (sizes > 0, object cap within total budget)
//! - Validate addresses before anything binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// Shortest line limit that still fits a realistic request line.
const MIN_LINE_BYTES: usize = 64;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("listener.max_connections must be greater than zero")]
    ZeroConnections,

    #[error("cache.max_object_bytes must be greater than zero")]
    ZeroObjectSize,

    #[error("cache.max_object_bytes ({object}) exceeds cache.total_capacity_bytes ({total})")]
    ObjectExceedsCapacity { object: usize, total: usize },

    #[error("forwarding.chunk_size must be greater than zero")]
    ZeroChunkSize,

    #[error("forwarding.max_line_bytes must be at least 64")]
    LineLimitTooSmall,

    #[error("forwarding.user_agent must not contain line breaks")]
    UserAgentLineBreak,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Check a parsed configuration, collecting every violation.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroConnections);
    }

    let cache = &config.cache;
    if cache.max_object_bytes == 0 {
        errors.push(ValidationError::ZeroObjectSize);
    } else if cache.max_object_bytes > cache.total_capacity_bytes {
        errors.push(ValidationError::ObjectExceedsCapacity {
            object: cache.max_object_bytes,
            total: cache.total_capacity_bytes,
        });
    }

    let forwarding = &config.forwarding;
    if forwarding.chunk_size == 0 {
        errors.push(ValidationError::ZeroChunkSize);
    }
    if forwarding.max_line_bytes < MIN_LINE_BYTES {
        errors.push(ValidationError::LineLimitTooSmall);
    }
    if forwarding.user_agent.contains(['\r', '\n']) {
        errors.push(ValidationError::UserAgentLineBreak);
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&ProxyConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.listener.max_connections = 0;
        config.cache.max_object_bytes = 2_000_000;
        config.forwarding.chunk_size = 0;
        config.forwarding.user_agent = "evil\r\nX-Injected: 1".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::ZeroConnections));
        assert!(errors.contains(&ValidationError::ObjectExceedsCapacity {
            object: 2_000_000,
            total: 1_049_000,
        }));
        assert!(errors.contains(&ValidationError::UserAgentLineBreak));
    }

    #[test]
    fn metrics_address_only_checked_when_enabled() {
        let mut config = ProxyConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::MetricsAddress("nope".into())])
        );
    }
}
