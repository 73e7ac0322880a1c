//! /providertgs handlers: trunk-group discovery, handler registration, call setup.
//!
//! Each request becomes one router event and waits for exactly one reply in
//! the face's matching control mailbox. Bodies are JSON in both directions.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::Response;

use ript_core::{Face, Packet, PacketEvent, PacketType};

use super::{decode_json, json_reply, require, ApiError, GatewayState, Peer};
use crate::correlate::correlate;
use crate::mailbox::MailboxKind;

// ── /providertgs (GET) ────────────────────────────────────────────────────────

pub async fn handle_tg_discovery(
    State(state): State<GatewayState>,
    peer: Peer,
) -> Result<Response, ApiError> {
    let face = state.face_for(&peer)?;
    tracing::debug!(face = %face.name(), "trunk group discovery");

    let event = PacketEvent::new(face.name(), Packet::discovery_query());
    let reply = correlate(
        &face,
        MailboxKind::TrunkGroupDiscovery,
        Some(event),
        state.correlation_timeout,
    )
    .await?;
    json_reply(&reply)
}

// ── /providertgs/{trunkGroupId}/handlers (POST) ───────────────────────────────

pub async fn handle_handler_registration(
    State(state): State<GatewayState>,
    peer: Peer,
    Path(params): Path<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let tg_id = require(&params, "trunkGroupId")?;
    let packet = decode_json(&body, PacketType::RegisterHandler)?;
    let face = state.face_for(&peer)?;
    tracing::info!(face = %face.name(), tg = %tg_id, "handler registration");

    let event = PacketEvent::new(face.name(), packet).with_trunk_group(tg_id);
    let reply = correlate(
        &face,
        MailboxKind::HandlerRegistration,
        Some(event),
        state.correlation_timeout,
    )
    .await?;
    json_reply(&reply)
}

// ── /providertgs/{trunkGroupId}/calls (POST) ──────────────────────────────────

pub async fn handle_calls(
    State(state): State<GatewayState>,
    peer: Peer,
    Path(params): Path<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let tg_id = require(&params, "trunkGroupId")?;
    let packet = decode_json(&body, PacketType::Calls)?;
    let face = state.face_for(&peer)?;
    tracing::info!(face = %face.name(), tg = %tg_id, "call setup");

    let event = PacketEvent::new(face.name(), packet).with_trunk_group(tg_id);
    let reply = correlate(&face, MailboxKind::Calls, Some(event), state.correlation_timeout).await?;
    json_reply(&reply)
}
