//! ServerFace: the gateway-side Face for one joined peer.
//!
//! Inbound requests are turned into [`PacketEvent`]s and pushed onto the
//! router's intake queue. The router answers through [`Face::send`], which
//! places the reply in the matching mailbox for the waiting request.

use std::fmt;

use async_trait::async_trait;

use ript_core::{
    CloseLatch, CloseReason, CloseSignal, Face, FaceName, IntakeSender, IntakeSlot, Packet,
    PacketEvent, RiptError,
};

use crate::mailbox::{MailboxCapacity, MailboxKind, Mailboxes};

pub struct ServerFace {
    name: FaceName,
    intake: IntakeSlot,
    mailboxes: Mailboxes,
    close: CloseLatch,
}

impl ServerFace {
    pub fn new(name: impl Into<FaceName>, capacity: MailboxCapacity) -> Self {
        let name = name.into();
        tracing::debug!(face = %name, "face created");
        Self {
            name,
            intake: IntakeSlot::new(),
            mailboxes: Mailboxes::new(capacity),
            close: CloseLatch::new(),
        }
    }

    pub fn mailboxes(&self) -> &Mailboxes {
        &self.mailboxes
    }

    pub fn is_closed(&self) -> bool {
        self.close.is_closed()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close.reason()
    }

    /// Fire the close latch. Returns false if the face was already closed.
    pub fn shut(&self, reason: CloseReason) -> bool {
        let fired = self.close.fire(reason.clone());
        if fired {
            tracing::info!(face = %self.name, reason = %reason, "face closed");
        }
        fired
    }

    /// Push an inbound event to the router.
    ///
    /// Waits for the router to bind the intake if it has not yet; callers
    /// bound the wait with their correlation deadline.
    pub async fn forward(&self, event: PacketEvent) -> Result<(), RiptError> {
        self.close.check_open()?;
        let intake = match self.intake.get() {
            Some(intake) => intake,
            None => {
                tracing::debug!(face = %self.name, "waiting for router to bind intake");
                self.intake.wait_bound().await
            }
        };
        intake.send(event).await.map_err(|_| RiptError::IntakeClosed)
    }
}

impl fmt::Debug for ServerFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerFace")
            .field("name", &self.name)
            .field("closed", &self.close.reason())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Face for ServerFace {
    fn name(&self) -> FaceName {
        self.name.clone()
    }

    async fn send(&self, packet: Packet) -> Result<(), RiptError> {
        self.close.check_open()?;
        let kind = MailboxKind::for_packet(&packet);
        tracing::trace!(face = %self.name, ?kind, "reply queued");
        let closed = self.close.subscribe().closed();
        tokio::select! {
            delivered = self.mailboxes.deliver(packet) => delivered.map(|_| ()),
            reason = closed => Err(RiptError::FaceClosed(reason)),
        }
    }

    fn try_send(&self, packet: Packet) -> Result<(), RiptError> {
        self.close.check_open()?;
        self.mailboxes.try_deliver(packet).map(|_| ())
    }

    fn set_receive_chan(&self, intake: IntakeSender) -> Result<(), RiptError> {
        self.intake.bind(intake)
    }

    async fn close(&self, reason: CloseReason) {
        self.shut(reason);
    }

    fn on_close(&self) -> CloseSignal {
        self.close.subscribe()
    }

    fn can_stream(&self) -> bool {
        false
    }
}
