//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SyncConfig (validated, immutable)
//!
//! On file change (--watch):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → poller swaps the update policy and interval
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Only the update policy and poll interval are hot-reloadable;
//!   authority credentials and the admin listener need a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::AdminConfig;
pub use schema::DeploymentConfig;
pub use schema::ObservabilityConfig;
pub use schema::SyncConfig;
