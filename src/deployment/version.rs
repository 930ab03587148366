//! Version identifiers and update targets.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected identifier halves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0} must be a non-empty string")]
pub struct InvalidVersion(pub &'static str);

/// Identifies a published configuration: `(configuration_id, configuration_version_id)`.
///
/// Equality is the only relation the authority guarantees. Versions are not
/// ordered, so any difference from the running version means "update".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawVersionIdentifier")]
pub struct VersionIdentifier {
    #[serde(rename = "instance_configuration_id")]
    configuration_id: String,
    #[serde(rename = "instance_configuration_version_id")]
    configuration_version_id: String,
}

#[derive(Deserialize)]
struct RawVersionIdentifier {
    instance_configuration_id: String,
    instance_configuration_version_id: String,
}

impl TryFrom<RawVersionIdentifier> for VersionIdentifier {
    type Error = InvalidVersion;

    fn try_from(raw: RawVersionIdentifier) -> Result<Self, Self::Error> {
        Self::new(raw.instance_configuration_id, raw.instance_configuration_version_id)
    }
}

impl VersionIdentifier {
    pub fn new(
        configuration_id: impl Into<String>,
        configuration_version_id: impl Into<String>,
    ) -> Result<Self, InvalidVersion> {
        let configuration_id = configuration_id.into();
        let configuration_version_id = configuration_version_id.into();
        if configuration_id.is_empty() {
            return Err(InvalidVersion("instance_configuration_id"));
        }
        if configuration_version_id.is_empty() {
            return Err(InvalidVersion("instance_configuration_version_id"));
        }
        Ok(Self {
            configuration_id,
            configuration_version_id,
        })
    }

    pub fn configuration_id(&self) -> &str {
        &self.configuration_id
    }

    pub fn configuration_version_id(&self) -> &str {
        &self.configuration_version_id
    }

    /// Document location under `prefix`: `{prefix}/{id}/versions/{version_id}`.
    ///
    /// Ids are percent-encoded, so `/` or `?` inside an id stays in its segment.
    pub fn document_endpoint(&self, prefix: &str) -> String {
        join_segments(
            prefix,
            &[self.configuration_id.as_str(), "versions", self.configuration_version_id.as_str()],
        )
    }
}

/// Append percent-encoded path segments to `base`, which may be relative.
pub(crate) fn join_segments(base: &str, segments: &[&str]) -> String {
    // Any hierarchical URL works here; only its encoded path is kept.
    let mut scratch = match url::Url::parse("http://localhost/") {
        Ok(url) => url,
        Err(_) => return format!("{}/{}", base.trim_end_matches('/'), segments.join("/")),
    };
    if let Ok(mut path) = scratch.path_segments_mut() {
        path.clear().extend(segments);
    }
    format!("{}{}", base.trim_end_matches('/'), scratch.path())
}

impl fmt::Display for VersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.configuration_id, self.configuration_version_id)
    }
}

/// A version to apply together with the location its document is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTarget {
    pub version: VersionIdentifier,
    pub endpoint: String,
}

impl UpdateTarget {
    /// Target whose document lives under the given API prefix.
    pub fn under_prefix(prefix: &str, version: VersionIdentifier) -> Self {
        let endpoint = version.document_endpoint(prefix);
        Self { version, endpoint }
    }
}
