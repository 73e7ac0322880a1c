//! RIPT packet model: the closed set of packets a Face carries, and the
//! envelope the router consumes.
//!
//! The text encoding is JSON, adjacently tagged: `{"type": "...", "data": {...}}`.
//! Byte payloads are base64 strings in JSON. The binary encoding lives in
//! [`crate::wire`].

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::wire::{self, WireError};

// ── Identity ──────────────────────────────────────────────────────────────────

/// Identity of a Face. Stable and non-empty for the lifetime of the Face.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceName(String);

impl FaceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FaceName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FaceName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── Packet type ───────────────────────────────────────────────────────────────

/// Packet type discriminator. The byte value is the type tag on the binary wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PacketType {
    TrunkGroupDiscovery = 1,
    RegisterHandler = 2,
    Calls = 3,
    StreamMedia = 4,
    StreamMediaAck = 5,
    Content = 6,
}

impl PacketType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::TrunkGroupDiscovery),
            2 => Some(Self::RegisterHandler),
            3 => Some(Self::Calls),
            4 => Some(Self::StreamMedia),
            5 => Some(Self::StreamMediaAck),
            6 => Some(Self::Content),
            _ => None,
        }
    }
}

// ── Payloads ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrunkGroup {
    pub id: String,
    #[serde(default)]
    pub uri: String,
}

/// Trunk groups offered by a gateway. Empty on a discovery query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrunkGroupsInfo {
    #[serde(default)]
    pub trunk_groups: Vec<TrunkGroup>,
}

/// Handler descriptor sent on registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerInfo {
    pub handler_id: String,
    /// Capability advertisement, opaque to the transport.
    #[serde(default)]
    pub advertisement: String,
    /// Assigned by the gateway in the registration reply.
    #[serde(default)]
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallInfo {
    pub handler_uri: String,
    pub destination: String,
    #[serde(default)]
    pub advertisement: String,
    /// Assigned by the gateway. The last path segment is the call id.
    #[serde(default)]
    pub call_uri: String,
}

impl CallInfo {
    /// Call id carried in `call_uri`, if one has been assigned.
    pub fn call_id(&self) -> Option<&str> {
        self.call_uri
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
    }
}

/// One fragment of streamed media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamContentMedia {
    pub seq_no: u64,
    pub timestamp: u64,
    pub source_id: u32,
    #[serde(with = "base64_bytes")]
    pub media: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMediaAck {
    pub seq_no: u64,
}

/// Direction of a generic content packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFilter {
    /// Client → gateway (push).
    #[default]
    MediaForward,
    /// Gateway → client (pull).
    MediaReverse,
}

/// Generic content payload with a sequence id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentInfo {
    pub id: u32,
    #[serde(default)]
    pub filter: ContentFilter,
    #[serde(with = "base64_bytes")]
    pub content: Bytes,
}

// ── Packet ────────────────────────────────────────────────────────────────────

/// A RIPT packet. Exactly one payload per instance; the variant is the type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Packet {
    TrunkGroupDiscovery(TrunkGroupsInfo),
    RegisterHandler(HandlerInfo),
    Calls(CallInfo),
    StreamMedia(StreamContentMedia),
    StreamMediaAck(StreamMediaAck),
    Content(ContentInfo),
}

impl Packet {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::TrunkGroupDiscovery(_) => PacketType::TrunkGroupDiscovery,
            Packet::RegisterHandler(_) => PacketType::RegisterHandler,
            Packet::Calls(_) => PacketType::Calls,
            Packet::StreamMedia(_) => PacketType::StreamMedia,
            Packet::StreamMediaAck(_) => PacketType::StreamMediaAck,
            Packet::Content(_) => PacketType::Content,
        }
    }

    /// An empty discovery query.
    pub fn discovery_query() -> Self {
        Packet::TrunkGroupDiscovery(TrunkGroupsInfo::default())
    }

    /// A pull request for the next reverse-direction content.
    pub fn pull_request() -> Self {
        Packet::Content(ContentInfo {
            id: 0,
            filter: ContentFilter::MediaReverse,
            content: Bytes::new(),
        })
    }

    /// Fail with [`WireError::UnexpectedType`] unless this is an `expected` packet.
    pub fn expect_type(self, expected: PacketType) -> Result<Self, WireError> {
        let found = self.packet_type();
        if found == expected {
            Ok(self)
        } else {
            Err(WireError::UnexpectedType { expected, found })
        }
    }

    /// Text (JSON) encoding, used on the control plane.
    pub fn to_json(&self) -> Result<Vec<u8>, WireError> {
        serde_json::to_vec(self).map_err(|e| WireError::Json(e.to_string()))
    }

    pub fn from_json(data: &[u8]) -> Result<Self, WireError> {
        serde_json::from_slice(data).map_err(|e| WireError::Json(e.to_string()))
    }

    /// Binary encoding, used on the media plane.
    pub fn to_binary(&self) -> Result<Bytes, WireError> {
        wire::encode(self)
    }

    pub fn from_binary(data: &[u8]) -> Result<Self, WireError> {
        wire::decode(data)
    }
}

// ── Event envelope ────────────────────────────────────────────────────────────

/// A packet plus the routing metadata the router needs.
/// Produced once per inbound request and consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketEvent {
    pub sender: FaceName,
    /// Trunk-group id. Required for trunk-scoped operations.
    pub tg_id: Option<String>,
    /// Call id. Required for call-scoped operations.
    pub call_id: Option<String>,
    pub packet: Packet,
}

impl PacketEvent {
    pub fn new(sender: FaceName, packet: Packet) -> Self {
        Self {
            sender,
            tg_id: None,
            call_id: None,
            packet,
        }
    }

    pub fn with_trunk_group(mut self, tg_id: impl Into<String>) -> Self {
        self.tg_id = Some(tg_id.into());
        self
    }

    pub fn with_call(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }
}

// ── Serde helpers ─────────────────────────────────────────────────────────────

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
