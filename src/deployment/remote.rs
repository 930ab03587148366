//! HTTP client for the configuration authority.
//!
//! # Wire contract
//! ```text
//! GET  {prefix}/instances/{instance_id}/configuration   → {instance_configuration_id, instance_configuration_version_id}
//!                                                          404/204 or empty ids → no deployment
//! PUT  {prefix}/instances/{instance_id}/configuration   ← same body, after a pull-path apply
//! GET  {document endpoint}                              → {"configuration_data": "<json>"}
//! ```
//! Every request carries `Authorization: Bearer {api_key}`. The request
//! timeout is the only deadline; the coordinator adds none of its own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::deployment::proxy::{ProxyError, RemoteConfigProxy};
use crate::deployment::version::{join_segments, VersionIdentifier};

#[derive(Debug, Deserialize)]
struct LatestVersionBody {
    #[serde(default)]
    instance_configuration_id: Option<String>,
    #[serde(default)]
    instance_configuration_version_id: Option<String>,
}

/// Reqwest-backed [`RemoteConfigProxy`].
#[derive(Debug, Clone)]
pub struct HttpConfigProxy {
    client: reqwest::Client,
}

impl HttpConfigProxy {
    pub fn new(timeout: Duration) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("deploy-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProxyError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    fn instance_url(endpoint: &str, instance_id: &str) -> String {
        join_segments(endpoint, &["instances", instance_id, "configuration"])
    }
}

fn send_error(url: &str, e: reqwest::Error) -> ProxyError {
    if e.is_timeout() {
        ProxyError::Timeout {
            url: url.to_string(),
        }
    } else {
        ProxyError::Transport(e.to_string())
    }
}

fn check_status(url: &str, response: &reqwest::Response) -> Result<(), ProxyError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ProxyError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl RemoteConfigProxy for HttpConfigProxy {
    async fn get_latest_version_id(
        &self,
        endpoint: &str,
        instance_id: &str,
        api_key: &str,
    ) -> Result<Option<VersionIdentifier>, ProxyError> {
        let url = Self::instance_url(endpoint, instance_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| send_error(&url, e))?;

        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::NO_CONTENT) {
            tracing::debug!(url = %url, status = %response.status(), "Authority reports no deployment");
            return Ok(None);
        }
        check_status(&url, &response)?;

        let body: LatestVersionBody = response.json().await.map_err(|e| ProxyError::Decode {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        match (body.instance_configuration_id, body.instance_configuration_version_id) {
            (Some(id), Some(version)) => Ok(VersionIdentifier::new(id, version).ok()),
            _ => Ok(None),
        }
    }

    async fn get_configuration(&self, endpoint: &str, api_key: &str) -> Result<Value, ProxyError> {
        let response = self
            .client
            .get(endpoint)
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| send_error(endpoint, e))?;
        check_status(endpoint, &response)?;

        response.json().await.map_err(|e| ProxyError::Decode {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })
    }

    async fn notify_applied(
        &self,
        endpoint: &str,
        instance_id: &str,
        version: &VersionIdentifier,
        api_key: &str,
    ) -> Result<(), ProxyError> {
        let url = Self::instance_url(endpoint, instance_id);
        let response = self
            .client
            .put(&url)
            .bearer_auth(api_key)
            .json(version)
            .send()
            .await
            .map_err(|e| send_error(&url, e))?;
        check_status(&url, &response)
    }
}
