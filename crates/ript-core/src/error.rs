//! Error taxonomy shared by every Face implementation.

use crate::face::CloseReason;
use crate::packet::PacketType;
use crate::wire::WireError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RiptError {
    /// Encode or decode failure. Always a client error on the wire.
    #[error("malformed packet: {0}")]
    MalformedPacket(#[from] WireError),

    /// A required path segment was absent or blank.
    #[error("missing path parameter `{0}`")]
    MissingParameter(&'static str),

    /// No reply arrived before the correlation deadline.
    #[error("no reply before the correlation deadline")]
    CorrelationTimeout,

    #[error("face closed: {0}")]
    FaceClosed(CloseReason),

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("gateway answered with status {0}")]
    UnexpectedStatus(u16),

    #[error("receive channel is not bound")]
    ReceiveChanUnbound,

    #[error("receive channel is already bound")]
    ReceiveChanAlreadyBound,

    #[error("{0:?} packets cannot be sent on this face")]
    Unroutable(PacketType),

    #[error("peer `{0}` has not joined")]
    UnknownPeer(String),

    #[error("router intake queue is closed")]
    IntakeClosed,

    #[error("new-face feed is full")]
    FeedFull,

    /// The mailbox for this packet type holds as many unread packets as it can.
    #[error("{0:?} mailbox is full")]
    MailboxFull(PacketType),
}

impl RiptError {
    /// Short machine-readable reason, sent alongside the HTTP status.
    pub fn reason_code(&self) -> &'static str {
        match self {
            RiptError::MalformedPacket(_) => "malformed-packet",
            RiptError::MissingParameter(_) => "missing-parameter",
            RiptError::CorrelationTimeout => "correlation-timeout",
            RiptError::FaceClosed(_) => "face-closed",
            RiptError::TransportFailure(_) => "transport-failure",
            RiptError::UnexpectedStatus(_) => "unexpected-status",
            RiptError::ReceiveChanUnbound => "receive-chan-unbound",
            RiptError::ReceiveChanAlreadyBound => "receive-chan-already-bound",
            RiptError::Unroutable(_) => "unroutable",
            RiptError::UnknownPeer(_) => "unknown-peer",
            RiptError::IntakeClosed => "intake-closed",
            RiptError::FeedFull => "feed-full",
            RiptError::MailboxFull(_) => "mailbox-full",
        }
    }
}
