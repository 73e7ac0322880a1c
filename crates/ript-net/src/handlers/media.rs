//! /providertgs/{trunkGroupId}/calls/{callId}/media: binary media plane.
//!
//! PUT forwards pushed media to the router and answers at once. GET waits for
//! the next reverse-direction packet in the face's media mailbox.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio::time::Instant;

use ript_core::{Face, Packet, PacketEvent, PacketType, WireError};

use super::{binary_reply, require, ApiError, GatewayState, Peer};
use crate::correlate::{correlate, forward};
use crate::mailbox::MailboxKind;

// ── PUT ───────────────────────────────────────────────────────────────────────

pub async fn handle_media_push(
    State(state): State<GatewayState>,
    peer: Peer,
    Path(params): Path<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let tg_id = require(&params, "trunkGroupId")?;
    let call_id = require(&params, "callId")?;
    let packet = Packet::from_binary(&body)?;
    if !matches!(packet, Packet::StreamMedia(_) | Packet::Content(_)) {
        return Err(WireError::UnexpectedType {
            expected: PacketType::StreamMedia,
            found: packet.packet_type(),
        }
        .into());
    }
    let face = state.face_for(&peer)?;
    tracing::trace!(face = %face.name(), call = %call_id, bytes = body.len(), "media push");

    let event = PacketEvent::new(face.name(), packet)
        .with_trunk_group(tg_id)
        .with_call(call_id);
    forward(&face, event, Instant::now() + state.correlation_timeout).await?;

    // Hand back an ack if the router has produced one; never wait for it.
    match face.mailboxes().try_take(MailboxKind::MediaForward) {
        Some(ack) => binary_reply(&ack),
        None => Ok(StatusCode::OK.into_response()),
    }
}

// ── GET ───────────────────────────────────────────────────────────────────────

pub async fn handle_media_pull(
    State(state): State<GatewayState>,
    peer: Peer,
    Path(params): Path<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    require(&params, "trunkGroupId")?;
    let call_id = require(&params, "callId")?;
    let face = state.face_for(&peer)?;
    tracing::trace!(face = %face.name(), call = %call_id, "media pull");

    let reply = correlate(
        &face,
        MailboxKind::MediaReverse,
        None,
        state.correlation_timeout,
    )
    .await?;
    binary_reply(&reply)
}
