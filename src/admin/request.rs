//! Manual update requests.
//!
//! Turns an authorized admin request into a coordinator call. The route
//! identifier is resolved to a [`RequestKind`] first; anything that is not a
//! known kind used with its verb is rejected before the coordinator is touched.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::deployment::{UpdateCoordinator, UpdateError, UpdateOutcome, UpdateTarget, VersionIdentifier};

/// Supported request identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// `PUT /config/update`: apply an explicit version.
    Update,
    /// `GET /config/refresh`: run the pull check now.
    Refresh,
}

impl RequestKind {
    pub fn from_identifier(identifier: &str) -> Result<Self, RequestError> {
        match identifier {
            "update" => Ok(RequestKind::Update),
            "refresh" => Ok(RequestKind::Refresh),
            other => Err(RequestError::UnsupportedRequest(other.to_string())),
        }
    }

    fn identifier(&self) -> &'static str {
        match self {
            RequestKind::Update => "update",
            RequestKind::Refresh => "refresh",
        }
    }
}

/// Malformed or unsupported requests. Raised before any coordinator call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("unsupported request '{0}'")]
    UnsupportedRequest(String),

    #[error("'{identifier}' does not accept {verb}")]
    WrongVerb {
        identifier: &'static str,
        verb: &'static str,
    },

    #[error("request body is missing '{0}'")]
    MissingField(&'static str),

    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

/// Body of `PUT /config/update`.
#[derive(Debug, Deserialize)]
pub struct UpdateRequestBody {
    pub url: Option<String>,
    pub instance_configuration_id: Option<String>,
    pub instance_configuration_version_id: Option<String>,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, RequestError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(RequestError::MissingField(field))
}

impl UpdateRequestBody {
    /// Parse a raw body. An empty body is treated as `{}`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RequestError> {
        let value: Value = if bytes.is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_slice(bytes).map_err(|e| RequestError::InvalidBody(e.to_string()))?
        };
        if !value.is_object() {
            return Err(RequestError::InvalidBody("expected a JSON object".to_string()));
        }
        serde_json::from_value(value).map_err(|e| RequestError::InvalidBody(e.to_string()))
    }

    /// Resolve to `{url}/{instance_configuration_id}/versions/{instance_configuration_version_id}`.
    pub fn into_target(self) -> Result<UpdateTarget, RequestError> {
        let url = required(self.url, "url")?;
        let id = required(self.instance_configuration_id, "instance_configuration_id")?;
        let version_id = required(
            self.instance_configuration_version_id,
            "instance_configuration_version_id",
        )?;
        let version = VersionIdentifier::new(id, version_id)
            .map_err(|e| RequestError::InvalidBody(e.to_string()))?;
        Ok(UpdateTarget::under_prefix(&url, version))
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Update(#[from] UpdateError),

    #[error("update task aborted: {0}")]
    Aborted(String),
}

/// Dispatches admin requests to the coordinator.
#[derive(Debug, Clone)]
pub struct UpdateRequestHandler {
    coordinator: Arc<UpdateCoordinator>,
}

impl UpdateRequestHandler {
    pub fn new(coordinator: Arc<UpdateCoordinator>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &Arc<UpdateCoordinator> {
        &self.coordinator
    }

    pub async fn on_put(&self, identifier: &str, body: &[u8]) -> Result<UpdateOutcome, HandlerError> {
        let kind = RequestKind::from_identifier(identifier)?;
        if kind != RequestKind::Update {
            return Err(RequestError::WrongVerb {
                identifier: kind.identifier(),
                verb: "PUT",
            }
            .into());
        }

        let target = UpdateRequestBody::from_slice(body)?.into_target()?;
        tracing::info!(version = %target.version, endpoint = %target.endpoint, "Manual update requested");

        // Run detached so a disconnecting client cannot cancel an apply midway.
        let coordinator = self.coordinator.clone();
        let outcome = tokio::spawn(async move { coordinator.apply_explicit(target).await })
            .await
            .map_err(|e| HandlerError::Aborted(e.to_string()))??;
        Ok(outcome)
    }

    pub async fn on_get(&self, identifier: &str) -> Result<UpdateOutcome, HandlerError> {
        let kind = RequestKind::from_identifier(identifier)?;
        if kind != RequestKind::Refresh {
            return Err(RequestError::WrongVerb {
                identifier: kind.identifier(),
                verb: "GET",
            }
            .into());
        }

        tracing::info!("Manual refresh requested");
        let coordinator = self.coordinator.clone();
        let outcome = tokio::spawn(async move { coordinator.check_and_apply_latest().await })
            .await
            .map_err(|e| HandlerError::Aborted(e.to_string()))??;
        Ok(outcome)
    }
}
