//! Configuration deployment subsystem.
//!
//! # Data Flow
//! ```text
//! poller.rs (interval)          admin API (PUT /config/update)
//!         │                               │
//!         ▼                               ▼
//!   check_and_apply_latest          apply_explicit
//!         └──────────► coordinator.rs ◄───┘
//!                        │  (one apply at a time)
//!                        ├─► proxy.rs   RemoteConfigProxy (remote.rs: HTTP)
//!                        ├─► document.rs envelope + shape validation
//!                        └─► applier.rs ConfigurationApplier (RegistryApplier)
//! ```

pub mod applier;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod poller;
pub mod proxy;
pub mod remote;
pub mod version;

pub use applier::{ApplyError, ApplyReport, ConfigurationApplier, RegistryApplier};
pub use coordinator::{AuthoritySettings, UpdateCoordinator, UpdateOutcome, UpdatePolicy, UpdateTrigger};
pub use document::{ConfigurationDocument, PayloadError};
pub use error::{UpdateError, UpdateResult};
pub use poller::ConfigPoller;
pub use proxy::{ProxyError, RemoteConfigProxy};
pub use remote::HttpConfigProxy;
pub use version::{UpdateTarget, VersionIdentifier};
