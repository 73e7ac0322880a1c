//! ript-core: packet model, wire codecs, and the Face contract.
//! The gateway (ript-net) and the client driver (ript-client) both build on this crate.

pub mod config;
pub mod error;
pub mod face;
pub mod packet;
pub mod wire;

pub use error::RiptError;
pub use face::{CloseLatch, CloseReason, CloseSignal, Face, IntakeSender, IntakeSlot, SharedFace};
pub use packet::{
    CallInfo, ContentFilter, ContentInfo, FaceName, HandlerInfo, Packet, PacketEvent, PacketType,
    StreamContentMedia, StreamMediaAck, TrunkGroup, TrunkGroupsInfo,
};
pub use wire::WireError;
