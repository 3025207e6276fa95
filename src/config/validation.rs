//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate endpoint URLs and account ids
//! - Validate value ranges (timeouts > 0, gas limit > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::RelayerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &RelayerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "evm.rpc_url", &config.evm.rpc_url);
    check_url(&mut errors, "near.rpc_url", &config.near.rpc_url);

    if config.evm.chain_id == 0 {
        errors.push(ValidationError::new("evm.chain_id", "must be non-zero"));
    }
    if config.evm.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("evm.rpc_timeout_secs", "must be non-zero"));
    }
    if config.evm.gas_limit < 21_000 {
        errors.push(ValidationError::new(
            "evm.gas_limit",
            format!("{} is below the 21000 intrinsic cost", config.evm.gas_limit),
        ));
    }

    if config.near.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("near.rpc_timeout_secs", "must be non-zero"));
    }
    if config.near.poll_base_delay_ms == 0 {
        errors.push(ValidationError::new("near.poll_base_delay_ms", "must be non-zero"));
    }
    if config.near.poll_max_delay_ms < config.near.poll_base_delay_ms {
        errors.push(ValidationError::new(
            "near.poll_max_delay_ms",
            "must not be smaller than near.poll_base_delay_ms",
        ));
    }
    check_account_id(&mut errors, "near.create_access_key_for", &config.near.create_access_key_for);

    check_account_id(&mut errors, "mpc.contract_id", &config.mpc.contract_id);
    if config.mpc.sign_gas == 0 {
        errors.push(ValidationError::new("mpc.sign_gas", "must be non-zero"));
    }
    if config.mpc.derivation_path.is_empty() {
        errors.push(ValidationError::new("mpc.derivation_path", "must not be empty"));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    match value.parse::<url::Url>() {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e))),
    }
}

// NEAR account ids: 2..=64 chars of lowercase alphanumerics separated by '.', '-' or '_'.
fn check_account_id(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    let valid_len = (2..=64).contains(&value.len());
    let valid_chars = value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_'));
    let separator = |c: char| matches!(c, '.' | '-' | '_');
    let valid_edges = !value.starts_with(separator) && !value.ends_with(separator);

    if !(valid_len && valid_chars && valid_edges) {
        errors.push(ValidationError::new(
            field,
            format!("'{}' is not a valid account id", value),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&RelayerConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = RelayerConfig::default();
        config.evm.rpc_url = "ftp://node".to_string();
        config.evm.chain_id = 0;
        config.mpc.contract_id = "Bad..Account".to_string();
        config.near.poll_max_delay_ms = 1;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "evm.rpc_url",
                "evm.chain_id",
                "near.poll_max_delay_ms",
                "mpc.contract_id",
            ]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = RelayerConfig::default();
        config.observability.metrics_address = "nowhere".to_string();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
