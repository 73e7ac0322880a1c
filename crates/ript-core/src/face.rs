//! The Face contract: a named adapter binding one remote peer to the router.
//!
//! A Face is implemented on the gateway side (one per joined peer) and on the
//! client side (one per remote gateway). Both share the close and intake
//! primitives defined here.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::error::RiptError;
use crate::packet::{FaceName, Packet, PacketEvent};

/// Sending half of the router's shared intake queue.
pub type IntakeSender = mpsc::Sender<PacketEvent>;

/// A Face shared between the session directory, the router, and in-flight requests.
pub type SharedFace = Arc<dyn Face>;

#[async_trait]
pub trait Face: Send + Sync {
    /// Stable, non-empty identity.
    fn name(&self) -> FaceName;

    /// Hand a packet toward the peer.
    ///
    /// Safe to call concurrently. Fails with [`RiptError::FaceClosed`] once
    /// the face is closed.
    async fn send(&self, packet: Packet) -> Result<(), RiptError>;

    /// Hand a packet toward the peer only if that can happen without waiting.
    ///
    /// Faces with a local buffer fail with [`RiptError::MailboxFull`] when it
    /// has no room. Faces without one cannot send this way.
    fn try_send(&self, packet: Packet) -> Result<(), RiptError> {
        Err(RiptError::Unroutable(packet.packet_type()))
    }

    /// Bind the intake queue used to forward events to the router.
    /// Must be called exactly once.
    fn set_receive_chan(&self, intake: IntakeSender) -> Result<(), RiptError>;

    /// Close with a reason. Idempotent.
    async fn close(&self, reason: CloseReason);

    /// One-shot notification that fires when the face closes.
    fn on_close(&self) -> CloseSignal;

    /// Whether the face keeps a persistent bidirectional stream.
    fn can_stream(&self) -> bool;
}

// ── Close ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer called leave.
    PeerLeft,
    /// A newer join from the same peer replaced this face.
    Superseded,
    /// The gateway or client is shutting down.
    Shutdown,
    Local(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerLeft => f.write_str("peer left"),
            CloseReason::Superseded => f.write_str("superseded by a newer join"),
            CloseReason::Shutdown => f.write_str("shutdown"),
            CloseReason::Local(text) => f.write_str(text),
        }
    }
}

/// Owner side of a face's close notification. The first `fire` wins.
#[derive(Debug)]
pub struct CloseLatch {
    tx: watch::Sender<Option<CloseReason>>,
}

impl Default for CloseLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl CloseLatch {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Record the close reason. Returns false if the latch had already fired.
    pub fn fire(&self, reason: CloseReason) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn reason(&self) -> Option<CloseReason> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> CloseSignal {
        CloseSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Fail with `FaceClosed` if the latch has fired.
    pub fn check_open(&self) -> Result<(), RiptError> {
        match self.reason() {
            Some(reason) => Err(RiptError::FaceClosed(reason)),
            None => Ok(()),
        }
    }
}

/// Subscriber side of a close notification.
#[derive(Debug, Clone)]
pub struct CloseSignal {
    rx: watch::Receiver<Option<CloseReason>>,
}

impl CloseSignal {
    /// The close reason, if the face has already closed.
    pub fn reason(&self) -> Option<CloseReason> {
        self.rx.borrow().clone()
    }

    /// Resolve with the close reason once the face closes.
    /// Never resolves if the face is dropped without closing.
    pub async fn closed(mut self) -> CloseReason {
        let reason = self
            .rx
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|current| (*current).clone());
        match reason {
            Some(reason) => reason,
            None => std::future::pending().await,
        }
    }
}

// ── Intake binding ────────────────────────────────────────────────────────────

/// Write-once slot holding the router's intake queue.
#[derive(Debug)]
pub struct IntakeSlot {
    tx: watch::Sender<Option<IntakeSender>>,
}

impl Default for IntakeSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl IntakeSlot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn bind(&self, intake: IntakeSender) -> Result<(), RiptError> {
        let bound = self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(intake);
                true
            } else {
                false
            }
        });
        if bound {
            Ok(())
        } else {
            Err(RiptError::ReceiveChanAlreadyBound)
        }
    }

    pub fn is_bound(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn get(&self) -> Option<IntakeSender> {
        self.tx.borrow().clone()
    }

    /// Wait until the slot is bound. Callers race this against a deadline.
    pub async fn wait_bound(&self) -> IntakeSender {
        let mut rx = self.tx.subscribe();
        let bound = rx
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|current| (*current).clone());
        match bound {
            Some(intake) => intake,
            None => std::future::pending().await,
        }
    }
}
