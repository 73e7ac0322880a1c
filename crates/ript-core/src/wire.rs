//! RIPT binary wire format: the compact encoding used on the media plane.
//!
//! Every frame is an 8-byte [`FrameHeader`] followed by a variant-specific
//! body. Integers in the body are big-endian. Strings are u16-length-prefixed
//! UTF-8, byte payloads are u32-length-prefixed.
//!
//! Decoding is total: any malformed input yields a [`WireError`], never a panic.

use bytes::{BufMut, Bytes, BytesMut};
use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::packet::{
    CallInfo, ContentFilter, ContentInfo, HandlerInfo, Packet, PacketType, StreamContentMedia,
    StreamMediaAck, TrunkGroup, TrunkGroupsInfo,
};

// ── Frame Header ──────────────────────────────────────────────────────────────

/// Header preceding every binary frame.
///
/// Wire size: 8 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct FrameHeader {
    /// Always [`MAGIC`].
    pub magic: [u8; 2],

    /// Frame format version. Currently 0x01.
    pub version: u8,

    /// [`PacketType`] byte.
    pub packet_type: u8,

    /// Body length in bytes, big-endian, not including this header.
    pub length: [u8; 4],
}

assert_eq_size!(FrameHeader, [u8; 8]);

// ── Constants ─────────────────────────────────────────────────────────────────

pub const MAGIC: [u8; 2] = *b"RP";

pub const FRAME_VERSION: u8 = 0x01;

pub const HEADER_LEN: usize = 8;

/// Largest media or content payload carried in one frame.
pub const MAX_MEDIA_PAYLOAD: usize = 1 << 20;

/// Content type of text-encoded bodies.
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

/// Content type of binary-encoded bodies.
pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// Request header naming the calling face.
pub const PEER_HEADER: &str = "ript-peer";

/// Response header carrying a machine-readable failure reason.
pub const REASON_HEADER: &str = "ript-reason";

const FILTER_MEDIA_FORWARD: u8 = 0x00;
const FILTER_MEDIA_REVERSE: u8 = 0x01;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when encoding or decoding a packet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("bad frame magic")]
    BadMagic,

    #[error("unknown frame version: 0x{0:02x}")]
    UnknownVersion(u8),

    #[error("unknown packet type: 0x{0:02x}")]
    UnknownPacketType(u8),

    #[error("unknown content filter: 0x{0:02x}")]
    UnknownContentFilter(u8),

    #[error("truncated frame: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("declared body length {declared} does not match actual {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("{0} trailing bytes after packet body")]
    TrailingBytes(usize),

    #[error("payload length {0} exceeds maximum {}", MAX_MEDIA_PAYLOAD)]
    PayloadTooLarge(usize),

    #[error("field length {0} exceeds 65535")]
    FieldTooLong(usize),

    #[error("string field is not valid utf-8")]
    InvalidUtf8,

    #[error("expected {expected:?} packet, got {found:?}")]
    UnexpectedType {
        expected: PacketType,
        found: PacketType,
    },

    #[error("json: {0}")]
    Json(String),
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encode a packet as one binary frame.
pub fn encode(packet: &Packet) -> Result<Bytes, WireError> {
    let mut body = BytesMut::new();

    match packet {
        Packet::TrunkGroupDiscovery(info) => {
            let count = u16::try_from(info.trunk_groups.len())
                .map_err(|_| WireError::FieldTooLong(info.trunk_groups.len()))?;
            body.put_u16(count);
            for tg in &info.trunk_groups {
                put_str(&mut body, &tg.id)?;
                put_str(&mut body, &tg.uri)?;
            }
        }
        Packet::RegisterHandler(info) => {
            put_str(&mut body, &info.handler_id)?;
            put_str(&mut body, &info.advertisement)?;
            put_str(&mut body, &info.uri)?;
        }
        Packet::Calls(info) => {
            put_str(&mut body, &info.handler_uri)?;
            put_str(&mut body, &info.destination)?;
            put_str(&mut body, &info.advertisement)?;
            put_str(&mut body, &info.call_uri)?;
        }
        Packet::StreamMedia(media) => {
            body.put_u64(media.seq_no);
            body.put_u64(media.timestamp);
            body.put_u32(media.source_id);
            put_payload(&mut body, &media.media)?;
        }
        Packet::StreamMediaAck(ack) => {
            body.put_u64(ack.seq_no);
        }
        Packet::Content(content) => {
            body.put_u32(content.id);
            body.put_u8(match content.filter {
                ContentFilter::MediaForward => FILTER_MEDIA_FORWARD,
                ContentFilter::MediaReverse => FILTER_MEDIA_REVERSE,
            });
            put_payload(&mut body, &content.content)?;
        }
    }

    let length = u32::try_from(body.len()).map_err(|_| WireError::PayloadTooLarge(body.len()))?;
    let header = FrameHeader {
        magic: MAGIC,
        version: FRAME_VERSION,
        packet_type: packet.packet_type() as u8,
        length: length.to_be_bytes(),
    };

    let mut frame = BytesMut::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(&body);
    Ok(frame.freeze())
}

fn put_str(buf: &mut BytesMut, value: &str) -> Result<(), WireError> {
    let len = u16::try_from(value.len()).map_err(|_| WireError::FieldTooLong(value.len()))?;
    buf.put_u16(len);
    buf.put_slice(value.as_bytes());
    Ok(())
}

fn put_payload(buf: &mut BytesMut, payload: &[u8]) -> Result<(), WireError> {
    if payload.len() > MAX_MEDIA_PAYLOAD {
        return Err(WireError::PayloadTooLarge(payload.len()));
    }
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    Ok(())
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decode one binary frame. The input must contain exactly one frame.
pub fn decode(data: &[u8]) -> Result<Packet, WireError> {
    let header = FrameHeader::read_from_prefix(data).ok_or(WireError::Truncated {
        needed: HEADER_LEN,
        available: data.len(),
    })?;

    // Copy packed fields to locals before inspecting them.
    let magic = header.magic;
    let version = header.version;
    let type_byte = header.packet_type;
    let declared = u32::from_be_bytes(header.length) as usize;

    if magic != MAGIC {
        return Err(WireError::BadMagic);
    }
    if version != FRAME_VERSION {
        return Err(WireError::UnknownVersion(version));
    }
    let packet_type =
        PacketType::from_u8(type_byte).ok_or(WireError::UnknownPacketType(type_byte))?;

    let body = &data[HEADER_LEN..];
    if body.len() != declared {
        return Err(WireError::LengthMismatch {
            declared,
            actual: body.len(),
        });
    }

    let mut r = Reader { buf: body };
    let packet = match packet_type {
        PacketType::TrunkGroupDiscovery => {
            let count = r.u16()? as usize;
            let mut trunk_groups = Vec::with_capacity(count.min(64));
            for _ in 0..count {
                trunk_groups.push(TrunkGroup {
                    id: r.string()?,
                    uri: r.string()?,
                });
            }
            Packet::TrunkGroupDiscovery(TrunkGroupsInfo { trunk_groups })
        }
        PacketType::RegisterHandler => Packet::RegisterHandler(HandlerInfo {
            handler_id: r.string()?,
            advertisement: r.string()?,
            uri: r.string()?,
        }),
        PacketType::Calls => Packet::Calls(CallInfo {
            handler_uri: r.string()?,
            destination: r.string()?,
            advertisement: r.string()?,
            call_uri: r.string()?,
        }),
        PacketType::StreamMedia => Packet::StreamMedia(StreamContentMedia {
            seq_no: r.u64()?,
            timestamp: r.u64()?,
            source_id: r.u32()?,
            media: r.payload()?,
        }),
        PacketType::StreamMediaAck => Packet::StreamMediaAck(StreamMediaAck { seq_no: r.u64()? }),
        PacketType::Content => {
            let id = r.u32()?;
            let filter = match r.u8()? {
                FILTER_MEDIA_FORWARD => ContentFilter::MediaForward,
                FILTER_MEDIA_REVERSE => ContentFilter::MediaReverse,
                other => return Err(WireError::UnknownContentFilter(other)),
            };
            Packet::Content(ContentInfo {
                id,
                filter,
                content: r.payload()?,
            })
        }
    };

    r.finish()?;
    Ok(packet)
}

/// Bounds-checked cursor over a frame body.
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.buf.len() < n {
            return Err(WireError::Truncated {
                needed: n,
                available: self.buf.len(),
            });
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, WireError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, WireError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(raw))
    }

    fn u64(&mut self) -> Result<u64, WireError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(raw))
    }

    fn string(&mut self) -> Result<String, WireError> {
        let len = self.u16()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| WireError::InvalidUtf8)
    }

    fn payload(&mut self) -> Result<Bytes, WireError> {
        let len = self.u32()? as usize;
        if len > MAX_MEDIA_PAYLOAD {
            return Err(WireError::PayloadTooLarge(len));
        }
        Ok(Bytes::copy_from_slice(self.take(len)?))
    }

    fn finish(self) -> Result<(), WireError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(WireError::TrailingBytes(self.buf.len()))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
