//! Shared doubles and helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Notify;

use deploy_sync::deployment::{
    ApplyError, ApplyReport, AuthoritySettings, ConfigurationApplier, ConfigurationDocument,
    ProxyError, RemoteConfigProxy, UpdateCoordinator, UpdatePolicy, VersionIdentifier,
};

pub fn version(id: &str, version_id: &str) -> VersionIdentifier {
    VersionIdentifier::new(id, version_id).unwrap()
}

pub fn envelope(document: &Value) -> Value {
    json!({ "configuration_data": document.to_string() })
}

pub fn authority() -> AuthoritySettings {
    AuthoritySettings {
        config_api_url_prefix: "api_url_prefix".into(),
        instance_id: "my_instance_id".into(),
        api_key: "apikey".into(),
    }
}

pub const POLICY: UpdatePolicy = UpdatePolicy {
    start_stop_services: true,
    delete_missing: false,
};

/// Ordered log of collaborator calls shared by the doubles.
pub type Events = Arc<Mutex<Vec<String>>>;

/// Scriptable [`RemoteConfigProxy`] that records every call.
pub struct RecordingProxy {
    pub latest: Mutex<Result<Option<VersionIdentifier>, String>>,
    pub payload: Mutex<Value>,
    pub fail_notify: AtomicBool,
    pub notify_gate: Mutex<Option<Arc<Gate>>>,
    pub latest_calls: Mutex<Vec<(String, String, String)>>,
    pub fetches: Mutex<Vec<String>>,
    pub notifications: Mutex<Vec<(String, String, VersionIdentifier, String)>>,
    pub events: Events,
}

impl RecordingProxy {
    pub fn new(events: Events) -> Self {
        Self {
            latest: Mutex::new(Ok(None)),
            payload: Mutex::new(envelope(&json!({}))),
            fail_notify: AtomicBool::new(false),
            notify_gate: Mutex::new(None),
            latest_calls: Mutex::new(Vec::new()),
            fetches: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn set_latest(&self, latest: Option<VersionIdentifier>) {
        *self.latest.lock().unwrap() = Ok(latest);
    }

    pub fn set_latest_error(&self, message: &str) {
        *self.latest.lock().unwrap() = Err(message.to_string());
    }

    pub fn set_payload(&self, payload: Value) {
        *self.payload.lock().unwrap() = payload;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn notify_count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }

    /// Hold every later `notify_applied` call open until the gate is released.
    pub fn gate_notify(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::new());
        *self.notify_gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl RemoteConfigProxy for RecordingProxy {
    async fn get_latest_version_id(
        &self,
        endpoint: &str,
        instance_id: &str,
        api_key: &str,
    ) -> Result<Option<VersionIdentifier>, ProxyError> {
        self.latest_calls
            .lock()
            .unwrap()
            .push((endpoint.into(), instance_id.into(), api_key.into()));
        self.events.lock().unwrap().push("latest".into());
        self.latest
            .lock()
            .unwrap()
            .clone()
            .map_err(ProxyError::Transport)
    }

    async fn get_configuration(&self, endpoint: &str, _api_key: &str) -> Result<Value, ProxyError> {
        self.fetches.lock().unwrap().push(endpoint.into());
        self.events.lock().unwrap().push("fetch".into());
        Ok(self.payload.lock().unwrap().clone())
    }

    async fn notify_applied(
        &self,
        endpoint: &str,
        instance_id: &str,
        version: &VersionIdentifier,
        api_key: &str,
    ) -> Result<(), ProxyError> {
        self.notifications.lock().unwrap().push((
            endpoint.into(),
            instance_id.into(),
            version.clone(),
            api_key.into(),
        ));
        self.events.lock().unwrap().push("notify".into());

        let gate = self.notify_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        if self.fail_notify.load(Ordering::SeqCst) {
            return Err(ProxyError::Status {
                status: 503,
                url: endpoint.into(),
            });
        }
        Ok(())
    }
}

/// Holds an apply open until released, so tests can overlap triggers.
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

/// [`ConfigurationApplier`] that records documents and policies.
pub struct RecordingApplier {
    pub calls: Mutex<Vec<(Value, UpdatePolicy)>>,
    pub fail: AtomicBool,
    pub gate: Option<Arc<Gate>>,
    pub events: Events,
}

impl RecordingApplier {
    pub fn new(events: Events) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            gate: None,
            events,
        }
    }

    pub fn gated(events: Events) -> (Self, Arc<Gate>) {
        let gate = Arc::new(Gate::new());
        let mut applier = Self::new(events);
        applier.gate = Some(gate.clone());
        (applier, gate)
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ConfigurationApplier for RecordingApplier {
    async fn update(
        &self,
        document: &ConfigurationDocument,
        policy: UpdatePolicy,
    ) -> Result<ApplyReport, ApplyError> {
        self.calls.lock().unwrap().push((document.to_value(), policy));
        self.events.lock().unwrap().push("apply".into());

        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(ApplyError::Rejected("block 'b1' failed to start".into()));
        }
        Ok(ApplyReport::default())
    }
}

pub struct Harness {
    pub coordinator: Arc<UpdateCoordinator>,
    pub proxy: Arc<RecordingProxy>,
    pub applier: Arc<RecordingApplier>,
    pub events: Events,
}

pub fn harness(current: Option<VersionIdentifier>) -> Harness {
    let events: Events = Arc::default();
    let applier = RecordingApplier::new(events.clone());
    build_harness(current, applier, events)
}

pub fn build_harness(
    current: Option<VersionIdentifier>,
    applier: RecordingApplier,
    events: Events,
) -> Harness {
    let proxy = Arc::new(RecordingProxy::new(events.clone()));
    let applier = Arc::new(applier);
    let coordinator = Arc::new(
        UpdateCoordinator::new(proxy.clone(), applier.clone(), authority(), POLICY)
            .with_initial_version(current),
    );
    Harness {
        coordinator,
        proxy,
        applier,
        events,
    }
}

/// State of the fake authority served by [`start_mock_authority`].
#[derive(Default)]
pub struct AuthorityState {
    pub latest: Mutex<Option<Value>>,
    pub documents: Mutex<HashMap<(String, String), Value>>,
    pub notifications: Mutex<Vec<Value>>,
    pub authorizations: Mutex<Vec<String>>,
}

impl AuthorityState {
    pub fn publish(&self, id: &str, version_id: &str, payload: Value) {
        *self.latest.lock().unwrap() = Some(json!({
            "instance_configuration_id": id,
            "instance_configuration_version_id": version_id,
        }));
        self.documents
            .lock()
            .unwrap()
            .insert((id.to_string(), version_id.to_string()), payload);
    }
}

fn record_auth(state: &AuthorityState, headers: &HeaderMap) {
    let value = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.authorizations.lock().unwrap().push(value);
}

async fn latest_handler(
    State(state): State<Arc<AuthorityState>>,
    Path(_instance_id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    record_auth(&state, &headers);
    let latest = state.latest.lock().unwrap().clone();
    match latest {
        Some(body) => Json(body).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn notify_handler(
    State(state): State<Arc<AuthorityState>>,
    Path(_instance_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    record_auth(&state, &headers);
    state.notifications.lock().unwrap().push(body);
    StatusCode::OK
}

async fn document_handler(
    State(state): State<Arc<AuthorityState>>,
    Path((id, version_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> impl IntoResponse {
    record_auth(&state, &headers);
    let document = state.documents.lock().unwrap().get(&(id, version_id)).cloned();
    match document {
        Some(payload) => Json(payload).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serve a fake authority on an ephemeral port. Returns its API prefix.
pub async fn start_mock_authority(state: Arc<AuthorityState>) -> String {
    let app = Router::new()
        .route(
            "/api/instances/{instance_id}/configuration",
            get(latest_handler).put(notify_handler),
        )
        .route("/api/{id}/versions/{version_id}", get(document_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{}/api", addr)
}

/// Poll `check` until it holds or the deadline passes.
pub async fn wait_for<F: Fn() -> bool>(check: F, deadline: Duration) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
