//! Request/reply correlation.
//!
//! A request claims the mailbox its reply will land in, forwards its event to
//! the router, then waits for the reply until a single deadline expires. The
//! claim serializes same-kind requests on one face, so concurrent callers
//! never receive each other's replies.

use std::time::Duration;

use tokio::time::Instant;

use ript_core::{Face, Packet, PacketEvent, RiptError};

use crate::face::ServerFace;
use crate::mailbox::{Correlation, MailboxKind};

/// Forward `event` (if any) and wait for the next reply in `kind`'s mailbox.
pub async fn correlate(
    face: &ServerFace,
    kind: MailboxKind,
    event: Option<PacketEvent>,
    timeout: Duration,
) -> Result<Packet, RiptError> {
    let deadline = Instant::now() + timeout;

    let mut waiter = tokio::time::timeout_at(deadline, face.mailboxes().claim(kind))
        .await
        .map_err(|_| RiptError::CorrelationTimeout)?;

    // Control replies answer exactly one request; anything already queued
    // belongs to a caller that gave up.
    if !kind.is_media() {
        let stale = waiter.discard_stale();
        if stale > 0 {
            tracing::warn!(face = %face.name(), ?kind, stale, "discarded late replies");
        }
    }

    if let Some(event) = event {
        forward(face, event, deadline).await?;
    }

    match waiter.await_reply(deadline, face.on_close().closed()).await {
        Correlation::Reply(packet) => Ok(packet),
        Correlation::TimedOut => {
            tracing::warn!(
                face = %face.name(),
                ?kind,
                timeout_ms = timeout.as_millis() as u64,
                "no reply before deadline"
            );
            Err(RiptError::CorrelationTimeout)
        }
        Correlation::Cancelled(reason) => Err(RiptError::FaceClosed(reason)),
    }
}

/// Forward an event to the router, giving up at `deadline`.
pub async fn forward(
    face: &ServerFace,
    event: PacketEvent,
    deadline: Instant,
) -> Result<(), RiptError> {
    tokio::time::timeout_at(deadline, face.forward(event))
        .await
        .map_err(|_| RiptError::CorrelationTimeout)?
}
