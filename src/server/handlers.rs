use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use std::sync::Arc;

use crate::flow::AcquisitionState;

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

// ─── GET /api/state ──────────────────────────────────────────────

pub async fn current_state(State(state): State<Arc<AppState>>) -> Json<AcquisitionState> {
    Json(state.flow.state())
}

// ─── POST /api/locate ────────────────────────────────────────────

#[derive(Serialize)]
pub struct LocateResponse {
    pub attempt: u64,
}

pub async fn locate(State(state): State<Arc<AppState>>) -> Result<(StatusCode, Json<LocateResponse>), ApiError> {
    let (attempt, _handle) = state
        .flow
        .spawn_request()
        .ok_or_else(|| api_error(StatusCode::SERVICE_UNAVAILABLE, "Location service is shutting down"))?;

    tracing::info!(attempt, "POST /api/locate");
    Ok((StatusCode::ACCEPTED, Json(LocateResponse { attempt })))
}
