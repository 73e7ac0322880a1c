//! Per-face reply mailboxes.
//!
//! Each face owns one bounded mailbox per [`MailboxKind`], built once at face
//! creation. The face's `send` is the only writer; the request currently
//! holding the mailbox's [`Waiter`] is the only reader.

use std::future::Future;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio::time::Instant;

use ript_core::{CloseReason, ContentFilter, Packet, RiptError};

/// Which reply slot a packet lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MailboxKind {
    TrunkGroupDiscovery,
    HandlerRegistration,
    Calls,
    /// Acks for pushed media.
    MediaForward,
    /// Media flowing back to the peer.
    MediaReverse,
}

impl MailboxKind {
    pub const ALL: [MailboxKind; 5] = [
        MailboxKind::TrunkGroupDiscovery,
        MailboxKind::HandlerRegistration,
        MailboxKind::Calls,
        MailboxKind::MediaForward,
        MailboxKind::MediaReverse,
    ];

    fn index(self) -> usize {
        match self {
            MailboxKind::TrunkGroupDiscovery => 0,
            MailboxKind::HandlerRegistration => 1,
            MailboxKind::Calls => 2,
            MailboxKind::MediaForward => 3,
            MailboxKind::MediaReverse => 4,
        }
    }

    pub fn for_packet(packet: &Packet) -> Self {
        match packet {
            Packet::TrunkGroupDiscovery(_) => MailboxKind::TrunkGroupDiscovery,
            Packet::RegisterHandler(_) => MailboxKind::HandlerRegistration,
            Packet::Calls(_) => MailboxKind::Calls,
            Packet::StreamMediaAck(_) => MailboxKind::MediaForward,
            Packet::StreamMedia(_) => MailboxKind::MediaReverse,
            Packet::Content(content) => match content.filter {
                ContentFilter::MediaForward => MailboxKind::MediaForward,
                ContentFilter::MediaReverse => MailboxKind::MediaReverse,
            },
        }
    }

    pub fn is_media(self) -> bool {
        matches!(self, MailboxKind::MediaForward | MailboxKind::MediaReverse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxCapacity {
    pub control: usize,
    pub media: usize,
}

impl Default for MailboxCapacity {
    fn default() -> Self {
        Self {
            control: 1,
            media: 20,
        }
    }
}

impl MailboxCapacity {
    fn for_kind(&self, kind: MailboxKind) -> usize {
        let capacity = if kind.is_media() {
            self.media
        } else {
            self.control
        };
        capacity.max(1)
    }
}

struct Mailbox {
    tx: mpsc::Sender<Packet>,
    rx: Mutex<mpsc::Receiver<Packet>>,
    capacity: usize,
}

impl Mailbox {
    fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
            capacity,
        }
    }
}

/// The fixed set of mailboxes for one face.
pub struct Mailboxes {
    slots: [Mailbox; 5],
}

impl Mailboxes {
    pub fn new(capacity: MailboxCapacity) -> Self {
        Self {
            slots: MailboxKind::ALL.map(|kind| Mailbox::new(capacity.for_kind(kind))),
        }
    }

    fn slot(&self, kind: MailboxKind) -> &Mailbox {
        &self.slots[kind.index()]
    }

    /// Place a packet in its mailbox. Waits while the mailbox is full.
    pub async fn deliver(&self, packet: Packet) -> Result<MailboxKind, RiptError> {
        let kind = MailboxKind::for_packet(&packet);
        self.slot(kind)
            .tx
            .send(packet)
            .await
            .map_err(|_| RiptError::FaceClosed(CloseReason::Local("mailbox dropped".to_string())))?;
        Ok(kind)
    }

    /// Place a packet in its mailbox if there is room right now.
    pub fn try_deliver(&self, packet: Packet) -> Result<MailboxKind, RiptError> {
        let kind = MailboxKind::for_packet(&packet);
        let packet_type = packet.packet_type();
        self.slot(kind).tx.try_send(packet).map_err(|e| match e {
            TrySendError::Full(_) => RiptError::MailboxFull(packet_type),
            TrySendError::Closed(_) => {
                RiptError::FaceClosed(CloseReason::Local("mailbox dropped".to_string()))
            }
        })?;
        Ok(kind)
    }

    /// Number of unread packets in a mailbox.
    pub fn pending(&self, kind: MailboxKind) -> usize {
        let slot = self.slot(kind);
        slot.capacity - slot.tx.capacity()
    }

    /// Take a packet if one is ready and nobody is waiting on the mailbox.
    pub fn try_take(&self, kind: MailboxKind) -> Option<Packet> {
        let mut rx = self.slot(kind).rx.try_lock().ok()?;
        rx.try_recv().ok()
    }

    /// Become the mailbox's single reader. Waiters are served in arrival order.
    pub async fn claim(&self, kind: MailboxKind) -> Waiter<'_> {
        Waiter {
            kind,
            rx: self.slot(kind).rx.lock().await,
        }
    }
}

/// Outcome of a correlation wait.
#[derive(Debug, PartialEq, Eq)]
pub enum Correlation {
    Reply(Packet),
    TimedOut,
    Cancelled(CloseReason),
}

/// Exclusive read access to one mailbox.
pub struct Waiter<'a> {
    kind: MailboxKind,
    rx: MutexGuard<'a, mpsc::Receiver<Packet>>,
}

impl Waiter<'_> {
    pub fn kind(&self) -> MailboxKind {
        self.kind
    }

    /// Drop replies left behind by earlier requests that timed out.
    pub fn discard_stale(&mut self) -> usize {
        let mut discarded = 0;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }

    /// Wait for the next reply, racing `deadline` and `cancel`.
    pub async fn await_reply<C>(&mut self, deadline: Instant, cancel: C) -> Correlation
    where
        C: Future<Output = CloseReason>,
    {
        tokio::select! {
            biased;
            Some(packet) = self.rx.recv() => Correlation::Reply(packet),
            reason = cancel => Correlation::Cancelled(reason),
            _ = tokio::time::sleep_until(deadline) => Correlation::TimedOut,
        }
    }
}
