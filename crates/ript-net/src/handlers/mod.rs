//! HTTP handlers: bridge RIPT requests into the session directory and mailboxes.

pub mod media;
pub mod session;
pub mod trunk;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use ript_core::wire::{CONTENT_TYPE_BINARY, CONTENT_TYPE_JSON};
use ript_core::{Packet, PacketType, RiptError, WireError};

pub use ript_core::wire::{PEER_HEADER, REASON_HEADER};

use crate::directory::SessionDirectory;
use crate::face::ServerFace;

#[derive(Clone)]
pub struct GatewayState {
    pub directory: SessionDirectory,
    /// How long a correlated request waits for the router.
    pub correlation_timeout: Duration,
}

impl GatewayState {
    fn face_for(&self, peer: &Peer) -> Result<Arc<ServerFace>, ApiError> {
        self.directory
            .lookup(&peer.0)
            .ok_or_else(|| ApiError(RiptError::UnknownPeer(peer.0.clone())))
    }
}

// ── Peer identity ─────────────────────────────────────────────────────────────

/// The caller's identity: the `ript-peer` header, else the remote socket address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer(pub String);

impl<S> FromRequestParts<S> for Peer
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(value) = parts.headers.get(PEER_HEADER) {
            let name = value.to_str().map(str::trim).unwrap_or_default();
            if !name.is_empty() {
                return Ok(Peer(name.to_string()));
            }
        }
        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| Peer(addr.to_string()))
            .ok_or(ApiError(RiptError::MissingParameter("peer identity")))
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ApiError(pub RiptError);

impl From<RiptError> for ApiError {
    fn from(err: RiptError) -> Self {
        ApiError(err)
    }
}

impl From<WireError> for ApiError {
    fn from(err: WireError) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        (
            status,
            [(REASON_HEADER, self.0.reason_code())],
            self.0.to_string(),
        )
            .into_response()
    }
}

/// HTTP status for a gateway-side failure.
pub fn status_for(err: &RiptError) -> StatusCode {
    match err {
        RiptError::MalformedPacket(_)
        | RiptError::MissingParameter(_)
        | RiptError::Unroutable(_) => StatusCode::BAD_REQUEST,
        RiptError::UnknownPeer(_) => StatusCode::FORBIDDEN,
        RiptError::CorrelationTimeout => StatusCode::NOT_FOUND,
        RiptError::FaceClosed(_) => StatusCode::GONE,
        RiptError::FeedFull
        | RiptError::MailboxFull(_)
        | RiptError::IntakeClosed
        | RiptError::ReceiveChanUnbound
        | RiptError::ReceiveChanAlreadyBound => StatusCode::SERVICE_UNAVAILABLE,
        RiptError::TransportFailure(_) | RiptError::UnexpectedStatus(_) => StatusCode::BAD_GATEWAY,
    }
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// A path parameter that must be present and non-blank.
fn require(params: &HashMap<String, String>, name: &'static str) -> Result<String, ApiError> {
    params
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(ApiError(RiptError::MissingParameter(name)))
}

/// Decode a JSON body that must hold an `expected` packet.
fn decode_json(body: &[u8], expected: PacketType) -> Result<Packet, ApiError> {
    Ok(Packet::from_json(body)?.expect_type(expected)?)
}

fn json_reply(packet: &Packet) -> Result<Response, ApiError> {
    let body = packet.to_json()?;
    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE_JSON)], body).into_response())
}

fn binary_reply(packet: &Packet) -> Result<Response, ApiError> {
    let body = packet.to_binary()?;
    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE_BINARY)], body).into_response())
}

// Re-export handler functions for use in router setup.
pub use media::{handle_media_pull, handle_media_push};
pub use session::{handle_join, handle_leave};
pub use trunk::{handle_calls, handle_handler_registration, handle_tg_discovery};
