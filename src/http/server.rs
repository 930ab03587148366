//! Admin HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with the admin handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Serve until the shutdown broadcast fires

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::{setup_admin_router, UpdateRequestHandler};
use crate::config::AdminConfig;
use crate::http::request::{request_id_of, MakeRequestUuidV4};

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Application state injected into admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub requests: Arc<UpdateRequestHandler>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(requests: Arc<UpdateRequestHandler>, api_key: &str) -> Self {
        Self {
            requests,
            api_key: Arc::from(api_key),
        }
    }
}

/// HTTP server exposing the admin API.
pub struct AdminServer {
    router: Router,
}

impl AdminServer {
    pub fn new(state: AdminState, config: &AdminConfig) -> Self {
        Self {
            router: Self::build_router(state, Duration::from_secs(config.request_timeout_secs)),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AdminState, request_timeout: Duration) -> Router {
        setup_admin_router(state)
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(TimeoutLayer::new(request_timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "admin_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id_of(request),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Admin server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Admin server stopped");
        Ok(())
    }
}
