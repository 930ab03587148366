//! The update coordinator.
//!
//! Both triggers end up here: the poller calls
//! [`UpdateCoordinator::check_and_apply_latest`], the admin API calls
//! [`UpdateCoordinator::apply_explicit`]. Each acquires the apply guard with
//! `try_lock` and holds it through check, fetch, validate, apply and commit,
//! so a second trigger fails fast with [`UpdateError::UpdateInProgress`]
//! instead of queueing behind a long apply. The pull path releases the guard
//! before notifying the authority.
//!
//! ```text
//! pull:  guard → latest id → same? done → fetch → validate → apply → commit → release → notify
//! push:  guard →                          fetch → validate → apply → commit → release
//! ```
//!
//! The committed version lives in an `ArcSwapOption` that is only stored
//! while the guard is held, so readers never see a half-applied version.

use std::sync::Arc;
use std::time::Instant;

use arc_swap::{ArcSwap, ArcSwapOption};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use crate::deployment::applier::{ApplyReport, ConfigurationApplier};
use crate::deployment::document::ConfigurationDocument;
use crate::deployment::error::{UpdateError, UpdateResult};
use crate::deployment::proxy::RemoteConfigProxy;
use crate::deployment::version::{UpdateTarget, VersionIdentifier};
use crate::observability::metrics;

/// Process-wide apply flags passed with every update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePolicy {
    pub start_stop_services: bool,
    pub delete_missing: bool,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self {
            start_stop_services: true,
            delete_missing: false,
        }
    }
}

/// Where and as whom the pull path talks to the authority.
#[derive(Debug, Clone, Default)]
pub struct AuthoritySettings {
    pub config_api_url_prefix: String,
    pub instance_id: String,
    pub api_key: String,
}

/// Which trigger started an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateTrigger {
    Pull,
    Push,
}

impl UpdateTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateTrigger::Pull => "pull",
            UpdateTrigger::Push => "push",
        }
    }
}

/// Result of a completed update call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// The authority's latest version is already running.
    Unchanged { version: VersionIdentifier },
    /// A document was applied and `version` committed.
    Applied {
        version: VersionIdentifier,
        report: ApplyReport,
    },
}

impl UpdateOutcome {
    pub fn version(&self) -> &VersionIdentifier {
        match self {
            UpdateOutcome::Unchanged { version } | UpdateOutcome::Applied { version, .. } => version,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied { .. })
    }
}

pub struct UpdateCoordinator {
    proxy: Arc<dyn RemoteConfigProxy>,
    applier: Arc<dyn ConfigurationApplier>,
    authority: AuthoritySettings,
    policy: ArcSwap<UpdatePolicy>,
    current: ArcSwapOption<VersionIdentifier>,
    apply_guard: Mutex<()>,
}

impl UpdateCoordinator {
    pub fn new(
        proxy: Arc<dyn RemoteConfigProxy>,
        applier: Arc<dyn ConfigurationApplier>,
        authority: AuthoritySettings,
        policy: UpdatePolicy,
    ) -> Self {
        Self {
            proxy,
            applier,
            authority,
            policy: ArcSwap::from_pointee(policy),
            current: ArcSwapOption::empty(),
            apply_guard: Mutex::new(()),
        }
    }

    /// Seed the version assumed to be running before the first update.
    pub fn with_initial_version(self, version: Option<VersionIdentifier>) -> Self {
        self.current.store(version.map(Arc::new));
        self
    }

    /// Last fully committed version.
    pub fn current_version(&self) -> Option<VersionIdentifier> {
        self.current.load_full().map(|version| (*version).clone())
    }

    pub fn policy(&self) -> UpdatePolicy {
        **self.policy.load()
    }

    /// Replace the policy used by updates that start after this call.
    pub fn set_policy(&self, policy: UpdatePolicy) {
        let previous = self.policy.swap(Arc::new(policy));
        if *previous != policy {
            tracing::info!(
                start_stop_services = policy.start_stop_services,
                delete_missing = policy.delete_missing,
                "Update policy changed"
            );
        }
    }

    /// Whether an apply sequence currently holds the guard.
    pub fn is_updating(&self) -> bool {
        self.apply_guard.try_lock().is_err()
    }

    pub fn authority(&self) -> &AuthoritySettings {
        &self.authority
    }

    /// Pull path: apply the authority's latest version if it differs from the running one.
    pub async fn check_and_apply_latest(&self) -> UpdateResult<UpdateOutcome> {
        let started = Instant::now();
        let result = self.pull().await;
        record(UpdateTrigger::Pull, &result, started);
        result
    }

    /// Push path: apply `target` unconditionally, even if it is already running.
    pub async fn apply_explicit(&self, target: UpdateTarget) -> UpdateResult<UpdateOutcome> {
        let started = Instant::now();
        let result = self.push(target).await;
        record(UpdateTrigger::Push, &result, started);
        result
    }

    async fn pull(&self) -> UpdateResult<UpdateOutcome> {
        let guard = self.acquire()?;
        let authority = &self.authority;

        let latest = self
            .proxy
            .get_latest_version_id(
                &authority.config_api_url_prefix,
                &authority.instance_id,
                &authority.api_key,
            )
            .await
            .map_err(|e| UpdateError::UpstreamUnavailable(e.to_string()))?
            .ok_or_else(|| {
                UpdateError::UpstreamUnavailable(format!(
                    "no deployment known for instance '{}'",
                    authority.instance_id
                ))
            })?;

        if self.current.load_full().as_deref() == Some(&latest) {
            tracing::debug!(version = %latest, "Configuration is up to date");
            return Ok(UpdateOutcome::Unchanged { version: latest });
        }

        let target = UpdateTarget::under_prefix(&authority.config_api_url_prefix, latest);
        let report = self.apply_sequence(&guard, &target, UpdateTrigger::Pull).await?;
        drop(guard);

        // Best effort: the update is already committed.
        if let Err(e) = self
            .proxy
            .notify_applied(
                &authority.config_api_url_prefix,
                &authority.instance_id,
                &target.version,
                &authority.api_key,
            )
            .await
        {
            metrics::record_notify_failure();
            tracing::warn!(version = %target.version, error = %e, "Failed to notify authority of applied version");
        }

        Ok(UpdateOutcome::Applied {
            version: target.version,
            report,
        })
    }

    async fn push(&self, target: UpdateTarget) -> UpdateResult<UpdateOutcome> {
        let guard = self.acquire()?;
        let report = self.apply_sequence(&guard, &target, UpdateTrigger::Push).await?;
        Ok(UpdateOutcome::Applied {
            version: target.version,
            report,
        })
    }

    fn acquire(&self) -> UpdateResult<MutexGuard<'_, ()>> {
        self.apply_guard
            .try_lock()
            .map_err(|_| UpdateError::UpdateInProgress)
    }

    /// Fetch, validate, apply, commit. Callers must hold the apply guard.
    async fn apply_sequence(
        &self,
        _guard: &MutexGuard<'_, ()>,
        target: &UpdateTarget,
        trigger: UpdateTrigger,
    ) -> UpdateResult<ApplyReport> {
        tracing::info!(
            trigger = trigger.as_str(),
            version = %target.version,
            endpoint = %target.endpoint,
            "Fetching configuration"
        );

        let payload = self
            .proxy
            .get_configuration(&target.endpoint, &self.authority.api_key)
            .await
            .map_err(|e| UpdateError::UpstreamUnavailable(e.to_string()))?;

        let document = ConfigurationDocument::from_envelope(&payload)?;
        let policy = self.policy();

        let report = self.applier.update(&document, policy).await?;

        self.current.store(Some(Arc::new(target.version.clone())));

        tracing::info!(
            trigger = trigger.as_str(),
            version = %target.version,
            updated = report.updated,
            deleted = report.deleted,
            started = report.started,
            stopped = report.stopped,
            "Configuration applied"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for UpdateCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateCoordinator")
            .field("config_api_url_prefix", &self.authority.config_api_url_prefix)
            .field("instance_id", &self.authority.instance_id)
            .field("current_version", &self.current_version())
            .field("policy", &self.policy())
            .finish()
    }
}

fn record(trigger: UpdateTrigger, result: &UpdateResult<UpdateOutcome>, started: Instant) {
    let outcome = match result {
        Ok(UpdateOutcome::Unchanged { .. }) => "unchanged",
        Ok(UpdateOutcome::Applied { .. }) => "applied",
        Err(e) => e.kind(),
    };
    if let Err(e) = result {
        tracing::warn!(trigger = trigger.as_str(), error = %e, "Configuration update failed");
    }
    metrics::record_update(trigger.as_str(), outcome, started);
}
