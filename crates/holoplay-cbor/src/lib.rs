//! Compact binary value codec for the HoloPlay driver wire.
//!
//! The format is a CBOR subset: eight major types, each introduced by a
//! leading byte whose low five bits carry a length or argument. Encoding is
//! deterministic and bit-exact with the driver's expectations; decoding also
//! accepts the indefinite-length and half/single float forms the encoder never
//! produces.
//!
//! ```
//! use holoplay_cbor::{decode, encode, Value};
//!
//! let value = Value::map([("error", Value::from(0)), ("data", Value::from("ok"))]);
//! let bytes = encode(&value);
//! assert_eq!(decode(&bytes).unwrap(), value);
//! ```

pub mod decode;
pub mod encode;
pub mod error;
#[cfg(feature = "json")]
pub mod json;
pub mod value;

pub use decode::{
    decode, Decoder, IgnoreTags, KeepTags, SimpleValueFallback, TagTransform, UndefinedSimple,
    DEFAULT_MAX_DEPTH,
};
pub use encode::{encode, Encoder, INITIAL_CAPACITY};
pub use error::{CodecError, Result};
pub use value::{Value, MAX_EXACT_INTEGER};
