//! Update failure kinds.

use thiserror::Error;

use crate::deployment::applier::ApplyError;
use crate::deployment::document::PayloadError;

/// Why an update attempt did not complete. None of these change `current_version`.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The authority could not be reached or knows no deployment for this
    /// instance. The next poll retries.
    #[error("authority unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Another apply sequence holds the guard.
    #[error("another configuration update is already in progress")]
    UpdateInProgress,

    /// The fetched payload failed envelope or shape validation.
    #[error("invalid configuration payload: {0}")]
    InvalidConfigurationPayload(#[from] PayloadError),

    /// The applier raised while mutating the running system.
    #[error("applying configuration failed: {0}")]
    ApplyFailed(#[from] ApplyError),
}

impl UpdateError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpdateError::UpstreamUnavailable(_) => "upstream_unavailable",
            UpdateError::UpdateInProgress => "in_progress",
            UpdateError::InvalidConfigurationPayload(_) => "invalid_payload",
            UpdateError::ApplyFailed(_) => "apply_failed",
        }
    }
}

/// Result type for coordinator operations.
pub type UpdateResult<T> = Result<T, UpdateError>;
