use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::gateway::PairingState;
use crate::handlers;
use crate::session::SessionCount;

/// Upper bound for any HTTP request; every route answers from memory.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_CONNECTIONS: usize = 64;

// ============================================================================
// Application State
// ============================================================================

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionCount,
    pub pairing: PairingState,
}

// ============================================================================
// Server Setup
// ============================================================================

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/livez", get(handlers::livez))
        .route("/readyz", get(handlers::readyz))
        .route("/version", get(handlers::version))
        .route("/qr", get(handlers::qr))
        .route("/qr.svg", get(handlers::qr_svg))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
        .layer(ConcurrencyLimitLayer::new(MAX_CONNECTIONS))
}
