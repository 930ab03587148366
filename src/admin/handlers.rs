use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::admin::request::HandlerError;
use crate::deployment::{UpdateError, UpdateOutcome, UpdatePolicy, VersionIdentifier};
use crate::http::server::AdminState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub instance_id: String,
    pub current_version: Option<VersionIdentifier>,
    pub policy: UpdatePolicy,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = match &self {
            HandlerError::Request(_) => StatusCode::BAD_REQUEST,
            HandlerError::Update(UpdateError::UpdateInProgress) => StatusCode::CONFLICT,
            HandlerError::Update(UpdateError::UpstreamUnavailable(_)) => StatusCode::BAD_GATEWAY,
            HandlerError::Update(UpdateError::InvalidConfigurationPayload(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            HandlerError::Update(UpdateError::ApplyFailed(_)) | HandlerError::Aborted(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let coordinator = state.requests.coordinator();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if coordinator.is_updating() { "updating" } else { "idle" },
        instance_id: coordinator.authority().instance_id.clone(),
        current_version: coordinator.current_version(),
        policy: coordinator.policy(),
    })
}

pub async fn put_config(
    State(state): State<AdminState>,
    Path(identifier): Path<String>,
    body: Bytes,
) -> Result<Json<UpdateOutcome>, HandlerError> {
    state.requests.on_put(&identifier, &body).await.map(Json)
}

pub async fn get_config(
    State(state): State<AdminState>,
    Path(identifier): Path<String>,
) -> Result<Json<UpdateOutcome>, HandlerError> {
    state.requests.on_get(&identifier).await.map(Json)
}
