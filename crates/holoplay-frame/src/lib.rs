//! Request-id framing for the HoloPlay driver protocol.
//!
//! Every message on the wire is a 4-byte big-endian request id followed by a
//! CBOR payload. Request ids live in the upper half of the `u32` range, so
//! the most significant bit doubles as a cheap "is this a reply" check.
//!
//! Message boundaries come from the transport (one WebSocket message per
//! frame); there is no length prefix.

pub mod codec;
pub mod error;
pub mod id;

pub use codec::{decode_frame, encode_frame, is_reply_id, Frame, HEADER_SIZE, REPLY_ID_MIN};
pub use error::{FrameError, Result};
pub use id::{RequestIdGenerator, REQUEST_ID_SPAN};
