//! HTTP protocol handling for the admin API.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (assign x-request-id)
//!     → server.rs (trace span, timeout, body limit)
//!     → admin auth middleware
//!     → admin handlers → coordinator
//! ```

pub mod request;
pub mod server;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{AdminServer, AdminState};
