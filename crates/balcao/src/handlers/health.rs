use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use crate::server::AppState;

pub async fn livez() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

#[derive(Serialize)]
pub struct ReadyzResponse {
    /// `ok` once the gateway is connected, `degraded` otherwise.
    pub status: &'static str,
    pub gateway_connected: bool,
    /// Active conversations.
    pub sessions: usize,
}

pub async fn readyz(State(state): State<AppState>) -> Json<ReadyzResponse> {
    let gateway_connected = state.pairing.is_connected();
    let sessions = state.sessions.get();

    Json(ReadyzResponse {
        status: if gateway_connected { "ok" } else { "degraded" },
        gateway_connected,
        sessions,
    })
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
}

pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
    })
}
