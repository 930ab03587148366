//! Configuration validation.
//!
//! Serde handles syntax; this module checks the semantic rules that serde
//! cannot express (URL shape, required ids when polling, placeholder keys).
//! All violations are collected rather than stopping at the first one.

use std::fmt;

use crate::config::schema::SyncConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const PLACEHOLDER_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
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

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &SyncConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let deployment = &config.deployment;

    if deployment.polling_enabled() || deployment.update_on_start {
        if deployment.config_api_url_prefix.is_empty() {
            errors.push(ValidationError::new(
                "deployment.config_api_url_prefix",
                "required when polling is enabled",
            ));
        } else if let Err(e) = url::Url::parse(&deployment.config_api_url_prefix) {
            errors.push(ValidationError::new(
                "deployment.config_api_url_prefix",
                format!("invalid URL: {}", e),
            ));
        }

        if deployment.instance_id.is_empty() {
            errors.push(ValidationError::new(
                "deployment.instance_id",
                "required when polling is enabled",
            ));
        }
    }

    if deployment.config_id.is_some() != deployment.config_version_id.is_some() {
        errors.push(ValidationError::new(
            "deployment.config_version_id",
            "config_id and config_version_id must be set together",
        ));
    }
    for (field, value) in [
        ("deployment.config_id", &deployment.config_id),
        ("deployment.config_version_id", &deployment.config_version_id),
    ] {
        if value.as_deref() == Some("") {
            errors.push(ValidationError::new(field, "must not be empty"));
        }
    }

    if deployment.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "deployment.request_timeout_secs",
            "must be greater than 0",
        ));
    }

    if config.admin.enabled {
        if config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_KEY {
            errors.push(ValidationError::new(
                "admin.api_key",
                "must be set to a real secret when the admin API is enabled",
            ));
        }
        if config.admin.bind_address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "admin.bind_address",
                format!("not a socket address: {}", config.admin.bind_address),
            ));
        }
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
