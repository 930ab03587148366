//! Periodic pull trigger.
//!
//! # Responsibilities
//! - Call the coordinator's pull path on a fixed interval
//! - Log failures and keep ticking (no backoff, the next tick is the retry)
//! - Pick up hot-reloaded policy and interval changes

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::config::SyncConfig;
use crate::deployment::coordinator::UpdateCoordinator;
use crate::deployment::error::UpdateError;

pub struct ConfigPoller {
    coordinator: Arc<UpdateCoordinator>,
    interval: Duration,
    update_on_start: bool,
}

impl ConfigPoller {
    /// `interval` of zero disables ticking; the poller then only tracks config reloads.
    pub fn new(coordinator: Arc<UpdateCoordinator>, interval: Duration, update_on_start: bool) -> Self {
        Self {
            coordinator,
            interval,
            update_on_start,
        }
    }

    pub async fn run(
        mut self,
        mut shutdown: broadcast::Receiver<()>,
        mut config_updates: Option<mpsc::UnboundedReceiver<SyncConfig>>,
    ) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            update_on_start = self.update_on_start,
            "Config poller starting"
        );

        if self.update_on_start {
            self.poll_once().await;
        }

        let mut ticker = make_ticker(self.interval);

        loop {
            tokio::select! {
                _ = next_tick(&mut ticker) => {
                    self.poll_once().await;
                }
                update = recv_update(&mut config_updates) => {
                    match update {
                        Some(config) => {
                            let policy = config.deployment.policy();
                            tracing::info!(
                                start_stop_services = policy.start_stop_services,
                                delete_missing = policy.delete_missing,
                                "Applying reloaded update policy"
                            );
                            self.coordinator.set_policy(policy);
                            let interval = Duration::from_secs(config.deployment.poll_interval_secs);
                            if interval != self.interval {
                                tracing::info!(interval_secs = interval.as_secs(), "Poll interval changed");
                                self.interval = interval;
                                ticker = make_ticker(interval);
                            }
                        }
                        None => {
                            tracing::debug!("Config update channel closed");
                            config_updates = None;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Config poller received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn poll_once(&self) {
        match self.coordinator.check_and_apply_latest().await {
            Ok(outcome) if outcome.is_applied() => {
                tracing::info!(version = %outcome.version(), "Poll applied new configuration");
            }
            Ok(_) => {}
            Err(UpdateError::UpdateInProgress) => {
                tracing::info!("Skipping poll, an update is already running");
            }
            // Already logged by the coordinator; next tick retries.
            Err(_) => {}
        }
    }
}

fn make_ticker(period: Duration) -> Option<Interval> {
    if period.is_zero() {
        return None;
    }
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(ticker)
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn recv_update(
    updates: &mut Option<mpsc::UnboundedReceiver<SyncConfig>>,
) -> Option<SyncConfig> {
    match updates {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
