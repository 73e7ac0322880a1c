//! /media/join and /media/leave: face lifecycle.

use axum::extract::State;
use axum::http::StatusCode;

use super::{ApiError, GatewayState, Peer};

// ── /media/join ───────────────────────────────────────────────────────────────

pub async fn handle_join(
    State(state): State<GatewayState>,
    peer: Peer,
) -> Result<StatusCode, ApiError> {
    state.directory.join(&peer.0).await?;
    Ok(StatusCode::OK)
}

// ── /media/leave ──────────────────────────────────────────────────────────────

/// Always succeeds; leaving twice is harmless.
pub async fn handle_leave(State(state): State<GatewayState>, peer: Peer) -> StatusCode {
    state.directory.leave(&peer.0);
    StatusCode::OK
}
