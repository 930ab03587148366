//! Configuration deployment synchronizer.
//!
//! Keeps a running instance's configuration in line with the version a
//! remote authority publishes, either by polling or on an authenticated
//! manual request.

pub mod admin;
pub mod config;
pub mod deployment;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::SyncConfig;
pub use deployment::{UpdateCoordinator, UpdateError, UpdateOutcome, VersionIdentifier};
pub use lifecycle::{DeploymentService, Shutdown};
