//! deploy-sync daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────── deploy-sync ────────────────────────────┐
//!   │                                                                      │
//!   │  ┌──────────┐  tick   ┌───────────────────┐   fetch/notify  ┌──────┐ │
//!   │  │  poller  │────────▶│                   │────────────────▶│remote│─┼──▶ Authority
//!   │  └──────────┘         │ UpdateCoordinator │                 └──────┘ │
//!   │  ┌──────────┐  PUT    │  (one apply at a  │    update       ┌──────┐ │
//!   │  │admin API │────────▶│   time)           │────────────────▶│applier│ │
//!   │  └──────────┘         └───────────────────┘                 └──────┘ │
//!   │        ▲                                                             │
//!   │        │ Bearer auth                                                 │
//!   └────────┼─────────────────────────────────────────────────────────────┘
//!         Operator
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use deploy_sync::config::loader::load_config;
use deploy_sync::config::watcher::ConfigWatcher;
use deploy_sync::deployment::{HttpConfigProxy, RegistryApplier};
use deploy_sync::lifecycle::signals::shutdown_signal;
use deploy_sync::observability::{logging, metrics};
use deploy_sync::DeploymentService;

#[derive(Parser)]
#[command(name = "deploy-sync")]
#[command(about = "Keeps this instance's configuration in sync with the deployment authority", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "DEPLOY_SYNC_CONFIG", default_value = "deploy-sync.toml")]
    config: PathBuf,

    /// Reload the update policy and poll interval when the file changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("deploy-sync v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        config = %cli.config.display(),
        instance_id = %config.deployment.instance_id,
        poll_interval_secs = config.deployment.poll_interval_secs,
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let proxy = HttpConfigProxy::new(Duration::from_secs(config.deployment.request_timeout_secs))?;
    let applier = RegistryApplier::new();

    // Keep the watcher alive for the lifetime of the service.
    let (_watcher, config_updates) = if cli.watch {
        let (watcher, updates) = ConfigWatcher::new(&cli.config, config.clone());
        (Some(watcher.run()?), Some(updates))
    } else {
        (None, None)
    };

    let mut service = DeploymentService::new(config, Arc::new(proxy), Arc::new(applier));
    service.start(config_updates).await?;

    shutdown_signal().await;
    service.stop().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
