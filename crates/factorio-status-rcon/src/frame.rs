//! RCON frame encoding and decoding.
//!
//! ```text
//! ┌──────────┬────────────┬──────────┬──────────┬──────┐
//! │ size     │ request id │ type     │ body     │ 0x00 │
//! │ i32 LE   │ i32 LE     │ i32 LE   │ n bytes  │ 0x00 │
//! └──────────┴────────────┴──────────┴──────────┴──────┘
//! size = 4 + 4 + n + 2
//! ```
//!
//! Pure codec: no state, no IO. Reading whole frames off the transport is
//! the connection's job.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::RconError;

/// Width of the leading size field.
pub const SIZE_FIELD_LEN: usize = 4;

/// Smallest legal `size`: request id + type + two terminators, empty body.
pub const MIN_FRAME_SIZE: usize = 4 + 4 + 2;

/// Largest `size` accepted from a peer.
pub const MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;

/// Request id the server echoes back when authentication fails.
pub const AUTH_FAILED_ID: i32 = -1;

/// Wire packet type. Kept open so unknown types survive a round trip.
///
/// `AUTH_RESPONSE` and `EXEC_COMMAND` share the value 2; the direction of
/// travel tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketType(pub i32);

impl PacketType {
    pub const AUTH: Self = Self(3);
    pub const AUTH_RESPONSE: Self = Self(2);
    pub const EXEC_COMMAND: Self = Self(2);
    pub const RESPONSE_VALUE: Self = Self(0);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub request_id: i32,
    pub packet_type: PacketType,
    pub body: Bytes,
}

impl Frame {
    pub fn new(request_id: i32, packet_type: PacketType, body: impl Into<Bytes>) -> Self {
        Self {
            request_id,
            packet_type,
            body: body.into(),
        }
    }

    pub fn encode(&self) -> Result<Bytes, RconError> {
        encode(self.request_id, self.packet_type, &self.body)
    }
}

/// Value of the `size` field for a body of `body_len` bytes.
pub fn frame_size(body_len: usize) -> usize {
    4 + 4 + body_len + 2
}

/// Encode one frame into a single buffer.
pub fn encode(request_id: i32, packet_type: PacketType, body: &[u8]) -> Result<Bytes, RconError> {
    let size = frame_size(body.len());
    if size > MAX_FRAME_SIZE {
        return Err(RconError::MalformedFrame(format!(
            "body of {} bytes exceeds the {MAX_FRAME_SIZE} byte frame limit",
            body.len()
        )));
    }

    let mut buf = BytesMut::with_capacity(SIZE_FIELD_LEN + size);
    buf.put_i32_le(size as i32);
    buf.put_i32_le(request_id);
    buf.put_i32_le(packet_type.0);
    buf.put_slice(body);
    buf.put_slice(&[0x00, 0x00]);
    Ok(buf.freeze())
}

/// Validate the leading size field read off the wire.
pub fn declared_size(header: [u8; SIZE_FIELD_LEN]) -> Result<usize, RconError> {
    let size = i32::from_le_bytes(header);
    usize::try_from(size)
        .ok()
        .filter(|size| (MIN_FRAME_SIZE..=MAX_FRAME_SIZE).contains(size))
        .ok_or_else(|| {
            RconError::MalformedFrame(format!(
                "declared size {size} outside {MIN_FRAME_SIZE}..={MAX_FRAME_SIZE}"
            ))
        })
}

/// Decode one complete frame, size field included.
pub fn decode(buf: &[u8]) -> Result<Frame, RconError> {
    if buf.len() < SIZE_FIELD_LEN + MIN_FRAME_SIZE {
        return Err(RconError::MalformedFrame(format!(
            "frame of {} bytes is shorter than the {} byte minimum",
            buf.len(),
            SIZE_FIELD_LEN + MIN_FRAME_SIZE
        )));
    }

    let mut cursor = buf;
    let size = cursor.get_i32_le();
    let available = cursor.len();
    if usize::try_from(size).ok() != Some(available) {
        return Err(RconError::MalformedFrame(format!(
            "declared size {size} does not match {available} available bytes"
        )));
    }

    let request_id = cursor.get_i32_le();
    let packet_type = PacketType(cursor.get_i32_le());

    let (body, terminators) = cursor.split_at(cursor.len() - 2);
    if terminators != [0x00, 0x00] {
        return Err(RconError::MalformedFrame(format!(
            "missing null terminators (got {terminators:02x?})"
        )));
    }

    Ok(Frame {
        request_id,
        packet_type,
        body: Bytes::copy_from_slice(body),
    })
}

/// Strip trailing NUL and newline bytes from a response payload.
pub fn trim_payload(body: &[u8]) -> &[u8] {
    let end = body
        .iter()
        .rposition(|b| !matches!(b, b'\0' | b'\n'))
        .map_or(0, |i| i + 1);
    &body[..end]
}
