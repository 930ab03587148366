//! Startup orchestration.
//!
//! [`DeploymentService`] owns the coordinator and the tasks that trigger it.
//! `start` registers the manual update endpoint and the poller, `stop`
//! unregisters both and waits for them to finish.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::admin::UpdateRequestHandler;
use crate::config::SyncConfig;
use crate::deployment::{
    AuthoritySettings, ConfigPoller, ConfigurationApplier, RemoteConfigProxy, UpdateCoordinator,
};
use crate::http::{AdminServer, AdminState};
use crate::lifecycle::Shutdown;

pub struct DeploymentService {
    config: SyncConfig,
    coordinator: Arc<UpdateCoordinator>,
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
    admin_addr: Option<SocketAddr>,
}

impl DeploymentService {
    pub fn new(
        config: SyncConfig,
        proxy: Arc<dyn RemoteConfigProxy>,
        applier: Arc<dyn ConfigurationApplier>,
    ) -> Self {
        let deployment = &config.deployment;
        let authority = AuthoritySettings {
            config_api_url_prefix: deployment.config_api_url_prefix.clone(),
            instance_id: deployment.instance_id.clone(),
            api_key: deployment.api_key.clone(),
        };
        let coordinator = UpdateCoordinator::new(proxy, applier, authority, deployment.policy())
            .with_initial_version(deployment.initial_version());

        if let Some(version) = coordinator.current_version() {
            tracing::info!(version = %version, "Seeded running configuration version");
        }

        Self {
            config,
            coordinator: Arc::new(coordinator),
            shutdown: Shutdown::new(),
            tasks: Vec::new(),
            admin_addr: None,
        }
    }

    pub fn coordinator(&self) -> &Arc<UpdateCoordinator> {
        &self.coordinator
    }

    /// Bound admin address while running with the admin API enabled.
    pub fn admin_addr(&self) -> Option<SocketAddr> {
        self.admin_addr
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Spawn the admin server and the poller.
    ///
    /// `config_updates` carries hot-reloaded configuration to the poller.
    pub async fn start(
        &mut self,
        config_updates: Option<mpsc::UnboundedReceiver<SyncConfig>>,
    ) -> Result<(), std::io::Error> {
        if self.is_running() {
            tracing::warn!("Deployment service already started");
            return Ok(());
        }

        if self.config.admin.enabled {
            let listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            self.admin_addr = Some(listener.local_addr()?);

            let requests = Arc::new(UpdateRequestHandler::new(self.coordinator.clone()));
            let server = AdminServer::new(AdminState::new(requests, &self.config.admin.api_key), &self.config.admin);
            let shutdown = self.shutdown.subscribe();
            self.tasks.push(tokio::spawn(async move {
                if let Err(e) = server.run(listener, shutdown).await {
                    tracing::error!(error = %e, "Admin server failed");
                }
            }));
        } else {
            tracing::info!("Admin API disabled; manual updates unavailable");
        }

        let deployment = &self.config.deployment;
        if deployment.polling_enabled() || deployment.update_on_start || config_updates.is_some() {
            let poller = ConfigPoller::new(
                self.coordinator.clone(),
                Duration::from_secs(deployment.poll_interval_secs),
                deployment.update_on_start,
            );
            let shutdown = self.shutdown.subscribe();
            self.tasks.push(tokio::spawn(poller.run(shutdown, config_updates)));
        }

        tracing::info!(
            admin = ?self.admin_addr,
            poll_interval_secs = deployment.poll_interval_secs,
            "Deployment service started"
        );
        Ok(())
    }

    /// Signal every task to stop and wait for them.
    pub async fn stop(&mut self) {
        self.shutdown.trigger();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Deployment task ended abnormally");
            }
        }
        self.admin_addr = None;
        tracing::info!("Deployment service stopped");
    }
}
