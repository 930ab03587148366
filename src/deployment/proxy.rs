//! Interface to the remote configuration authority.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::deployment::version::VersionIdentifier;

/// Errors reported by an authority client.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Connection failed or the request could not be sent.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request did not complete in time.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The authority answered with a non-success status.
    #[error("authority returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// The response body could not be decoded.
    #[error("undecodable response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Client for the authority that publishes configuration versions.
///
/// `endpoint` arguments are API base URLs for the version calls and a full
/// document URL for [`RemoteConfigProxy::get_configuration`].
#[async_trait]
pub trait RemoteConfigProxy: Send + Sync {
    /// Latest version deployed to `instance_id`, or `None` when the authority
    /// has no deployment for it.
    async fn get_latest_version_id(
        &self,
        endpoint: &str,
        instance_id: &str,
        api_key: &str,
    ) -> Result<Option<VersionIdentifier>, ProxyError>;

    /// Raw payload for one version, expected to carry a `configuration_data` envelope.
    async fn get_configuration(&self, endpoint: &str, api_key: &str) -> Result<Value, ProxyError>;

    /// Tell the authority which version this instance now runs.
    async fn notify_applied(
        &self,
        endpoint: &str,
        instance_id: &str,
        version: &VersionIdentifier,
        api_key: &str,
    ) -> Result<(), ProxyError>;
}
