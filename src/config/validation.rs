//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges
//! - Reject header keys without a header name
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Unknown tag/phase tokens are not errors; they fall back to defaults
//! - Header names and values are not checked against HTTP syntax

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::FilterConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid listener bind_address '{0}'")]
    BindAddress(String),

    #[error("invalid upstream address '{0}'")]
    UpstreamAddress(String),

    #[error("invalid metrics_address '{0}'")]
    MetricsAddress(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("header key '{0}' has an empty header name")]
    EmptyHeaderName(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &FilterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if let Some(upstream) = &config.upstream {
        if upstream.address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::UpstreamAddress(upstream.address.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    for key in config.headers.keys() {
        if key.split(':').next().unwrap_or_default().is_empty() {
            errors.push(ValidationError::EmptyHeaderName(key.clone()));
        }
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
    use crate::config::schema::UpstreamConfig;

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&FilterConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = FilterConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.upstream = Some(UpstreamConfig { address: "nowhere".into() });
        config.timeouts.request_secs = 0;
        config.headers.insert(":add".into(), "x".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::BindAddress("not-an-address".into()),
                ValidationError::UpstreamAddress("nowhere".into()),
                ValidationError::ZeroRequestTimeout,
                ValidationError::EmptyHeaderName(":add".into()),
            ]
        );
    }

    #[test]
    fn test_unknown_tokens_are_accepted() {
        let mut config = FilterConfig::default();
        config.headers.insert("X-A:sometimes:eventually".into(), "1".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = FilterConfig::default();
        config.observability.metrics_address = "bogus".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::MetricsAddress("bogus".into())]
        );
    }
}
