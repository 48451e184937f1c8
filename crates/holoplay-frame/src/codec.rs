use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: request id (4 bytes, big-endian).
pub const HEADER_SIZE: usize = 4;

/// Smallest valid request id. Replies always carry the high bit.
pub const REPLY_ID_MIN: u32 = 0x8000_0000;

/// A request or reply frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Correlation id shared by a request and its reply.
    pub id: u32,
    /// The encoded payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(id: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Encode into a standalone buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        encode_frame(self.id, &self.payload, &mut dst);
        dst.freeze()
    }
}

/// True if `id` carries the reply bit.
pub fn is_reply_id(id: u32) -> bool {
    id >= REPLY_ID_MIN
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────────┬──────────────────────┐
/// │ Request id     │ Payload              │
/// │ (4B BE)        │ (rest of message)    │
/// └────────────────┴──────────────────────┘
/// ```
pub fn encode_frame(id: u32, payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u32(id);
    dst.put_slice(payload);
}

/// Split an inbound message into id and payload.
///
/// Only the header is validated; the payload is returned untouched so a bad
/// header never costs a decode.
pub fn decode_frame(mut src: Bytes) -> Result<Frame> {
    if src.len() < HEADER_SIZE {
        return Err(FrameError::Truncated { len: src.len() });
    }

    let id = src.get_u32();
    if !is_reply_id(id) {
        return Err(FrameError::NotAReply { id });
    }

    Ok(Frame { id, payload: src })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut buf = BytesMut::new();
        encode_frame(0x8000_0001, b"\xa0", &mut buf);
        assert_eq!(buf.as_ref(), &[0x80, 0x00, 0x00, 0x01, 0xa0]);

        let frame = decode_frame(buf.freeze()).unwrap();
        assert_eq!(frame.id, 0x8000_0001);
        assert_eq!(frame.payload.as_ref(), b"\xa0");
    }

    #[test]
    fn test_decode_short_frame() {
        let result = decode_frame(Bytes::from_static(&[0x80, 0x00, 0x01]));
        assert_eq!(result, Err(FrameError::Truncated { len: 3 }));
    }

    #[test]
    fn test_decode_low_id_rejected() {
        let result = decode_frame(Bytes::from_static(&[0x00, 0x00, 0x00, 0x01, 0xff, 0xff]));
        assert_eq!(result, Err(FrameError::NotAReply { id: 1 }));
    }

    #[test]
    fn test_empty_payload() {
        let frame = decode_frame(Bytes::from_static(&[0xff, 0xff, 0xff, 0xfe])).unwrap();
        assert_eq!(frame.id, 0xffff_fffe);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_frame_to_bytes() {
        let frame = Frame::new(0x9000_0000, Bytes::from_static(b"test"));
        assert_eq!(frame.wire_size(), HEADER_SIZE + 4);
        assert_eq!(frame.to_bytes().as_ref(), b"\x90\x00\x00\x00test");
    }

    #[test]
    fn test_reply_bit() {
        assert!(!is_reply_id(0x7fff_ffff));
        assert!(is_reply_id(REPLY_ID_MIN));
        assert!(is_reply_id(u32::MAX));
    }
}
