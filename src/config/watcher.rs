//! Hot reload of the configuration file.
//!
//! The parent directory is watched rather than the file itself, so editors
//! that save by writing a temporary file and renaming it over the original
//! keep triggering reloads. Only the update policy and the poll interval are
//! forwarded; changes to anything else are reported and otherwise ignored
//! until the next restart.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::SyncConfig;
use crate::deployment::UpdatePolicy;

/// The part of [`SyncConfig`] a running service picks up without restarting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reloadable {
    policy: UpdatePolicy,
    poll_interval_secs: u64,
}

impl Reloadable {
    fn of(config: &SyncConfig) -> Self {
        Self {
            policy: config.deployment.policy(),
            poll_interval_secs: config.deployment.poll_interval_secs,
        }
    }
}

/// Fields that only take effect after a restart and differ between `running` and `loaded`.
pub fn restart_required_changes(running: &SyncConfig, loaded: &SyncConfig) -> Vec<&'static str> {
    let (old, new) = (&running.deployment, &loaded.deployment);
    let checks = [
        ("deployment.config_api_url_prefix", old.config_api_url_prefix != new.config_api_url_prefix),
        ("deployment.instance_id", old.instance_id != new.instance_id),
        ("deployment.api_key", old.api_key != new.api_key),
        ("deployment.request_timeout_secs", old.request_timeout_secs != new.request_timeout_secs),
        ("admin.enabled", running.admin.enabled != loaded.admin.enabled),
        ("admin.api_key", running.admin.api_key != loaded.admin.api_key),
        ("admin.bind_address", running.admin.bind_address != loaded.admin.bind_address),
        ("observability.log_level", running.observability.log_level != loaded.observability.log_level),
    ];
    checks
        .into_iter()
        .filter(|(_, changed)| *changed)
        .map(|(field, _)| field)
        .collect()
}

/// Decides which reloaded configurations reach the service.
struct ReloadFilter {
    running: SyncConfig,
    forwarded: Reloadable,
}

impl ReloadFilter {
    fn new(running: SyncConfig) -> Self {
        let forwarded = Reloadable::of(&running);
        Self { running, forwarded }
    }

    /// Returns the config to forward, or `None` when nothing reloadable changed.
    fn accept(&mut self, loaded: SyncConfig) -> Option<SyncConfig> {
        let ignored = restart_required_changes(&self.running, &loaded);
        if !ignored.is_empty() {
            tracing::warn!(fields = ?ignored, "Changed settings need a restart to take effect");
        }

        let reloadable = Reloadable::of(&loaded);
        if reloadable == self.forwarded {
            tracing::debug!("Config file changed without affecting policy or poll interval");
            return None;
        }
        self.forwarded = reloadable;
        Some(loaded)
    }
}

/// Watches the configuration file and sends validated, relevant updates.
pub struct ConfigWatcher {
    path: PathBuf,
    filter: ReloadFilter,
    update_tx: mpsc::UnboundedSender<SyncConfig>,
}

impl ConfigWatcher {
    /// `running` is the configuration the service started with.
    pub fn new(path: &Path, running: SyncConfig) -> (Self, mpsc::UnboundedReceiver<SyncConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                filter: ReloadFilter::new(running),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            mut filter,
            update_tx,
        } = self;

        let file_name = path.file_name().map(OsString::from).ok_or_else(|| {
            notify::Error::generic(&format!("{} does not name a file", path.display()))
        })?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let reload_path = path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &file_name) => match load_config(&reload_path) {
                    Ok(loaded) => {
                        if let Some(config) = filter.accept(loaded) {
                            tracing::info!(
                                poll_interval_secs = config.deployment.poll_interval_secs,
                                "Reloaded configuration"
                            );
                            let _ = update_tx.send(config);
                        }
                    }
                    // Editors may briefly leave the file missing or partial.
                    Err(e) => tracing::warn!(error = %e, "Ignoring unusable config file"),
                },
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %path.display(), "Config watcher started");
        Ok(watcher)
    }
}

/// Whether `event` created or modified the watched file.
fn touches(event: &Event, file_name: &OsString) -> bool {
    (event.kind.is_modify() || event.kind.is_create())
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}
