//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::deployment::{UpdatePolicy, VersionIdentifier};

/// Root configuration for the deployment synchronizer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote authority and update policy settings.
    pub deployment: DeploymentConfig,

    /// Admin API (manual update endpoint) settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Settings for talking to the remote configuration authority.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Base URL of the authority's configuration API.
    pub config_api_url_prefix: String,

    /// Identifier of this instance as known by the authority.
    pub instance_id: String,

    /// API key sent with every authority request.
    pub api_key: String,

    /// Configuration id assumed to be running at startup.
    pub config_id: Option<String>,

    /// Configuration version id assumed to be running at startup.
    pub config_version_id: Option<String>,

    /// Seconds between pull checks. 0 disables polling.
    pub poll_interval_secs: u64,

    /// Run one pull check immediately on startup.
    pub update_on_start: bool,

    /// Start/stop services as a side effect of an update.
    pub start_stop_services: bool,

    /// Delete running blocks/services absent from a new document.
    pub delete_missing: bool,

    /// Timeout for each request to the authority, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            config_api_url_prefix: String::new(),
            instance_id: String::new(),
            api_key: String::new(),
            config_id: None,
            config_version_id: None,
            poll_interval_secs: 0,
            update_on_start: false,
            start_stop_services: true,
            delete_missing: false,
            request_timeout_secs: 30,
        }
    }
}

impl DeploymentConfig {
    /// Apply policy carried by every update.
    pub fn policy(&self) -> UpdatePolicy {
        UpdatePolicy {
            start_stop_services: self.start_stop_services,
            delete_missing: self.delete_missing,
        }
    }

    /// Version seeded from settings, if both halves are present.
    pub fn initial_version(&self) -> Option<VersionIdentifier> {
        match (&self.config_id, &self.config_version_id) {
            (Some(id), Some(version)) => VersionIdentifier::new(id.clone(), version.clone()).ok(),
            _ => None,
        }
    }

    pub fn polling_enabled(&self) -> bool {
        self.poll_interval_secs > 0
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,

    /// Upper bound on a single admin request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
            request_timeout_secs: 300,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
