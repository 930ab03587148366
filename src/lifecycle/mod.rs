//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Build coordinator → bind admin listener → spawn admin server → spawn poller
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → admin server drains, poller exits → join tasks
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: a listener that cannot bind aborts startup
//! - An apply already running finishes before its task observes shutdown

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::DeploymentService;
