use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::encode::{
    BREAK, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE, MAJOR_SIMPLE, MAJOR_TAG,
    MAJOR_TEXT, MAJOR_UNSIGNED,
};
use crate::error::{CodecError, Result};
use crate::value::{integral, Value};

/// Default nesting limit for arrays, maps and tags.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Turns a decoded tag and its nested value into the value handed to callers.
pub trait TagTransform: Send + Sync {
    fn transform(&self, value: Value, tag: u64) -> Value;
}

impl<F> TagTransform for F
where
    F: Fn(Value, u64) -> Value + Send + Sync,
{
    fn transform(&self, value: Value, tag: u64) -> Value {
        self(value, tag)
    }
}

/// Produces a value for simple-value codes other than false/true/null/undefined.
pub trait SimpleValueFallback: Send + Sync {
    fn simple(&self, code: u8) -> Value;
}

impl<F> SimpleValueFallback for F
where
    F: Fn(u8) -> Value + Send + Sync,
{
    fn simple(&self, code: u8) -> Value {
        self(code)
    }
}

/// Drops the tag and returns the nested value. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreTags;

impl TagTransform for IgnoreTags {
    fn transform(&self, value: Value, _tag: u64) -> Value {
        value
    }
}

/// Preserves tags as [`Value::Tag`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepTags;

impl TagTransform for KeepTags {
    fn transform(&self, value: Value, tag: u64) -> Value {
        Value::Tag(tag, Box::new(value))
    }
}

/// Maps every unknown simple value to [`Value::Undefined`]. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct UndefinedSimple;

impl SimpleValueFallback for UndefinedSimple {
    fn simple(&self, _code: u8) -> Value {
        Value::Undefined
    }
}

/// Decode a single value with the default strategies.
pub fn decode(data: &[u8]) -> Result<Value> {
    Decoder::default().decode(data)
}

/// Configurable decoder.
///
/// Holds no per-call state; one decoder can be shared across threads and
/// reused after a failed decode.
#[derive(Clone)]
pub struct Decoder {
    tags: Arc<dyn TagTransform>,
    simple: Arc<dyn SimpleValueFallback>,
    max_depth: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self {
            tags: Arc::new(IgnoreTags),
            simple: Arc::new(UndefinedSimple),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag_transform(mut self, tags: impl TagTransform + 'static) -> Self {
        self.tags = Arc::new(tags);
        self
    }

    pub fn with_simple_fallback(mut self, simple: impl SimpleValueFallback + 'static) -> Self {
        self.simple = Arc::new(simple);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Decode exactly one value; trailing bytes are an error.
    pub fn decode(&self, data: &[u8]) -> Result<Value> {
        let mut reader = Reader {
            data,
            offset: 0,
            decoder: self,
        };
        let value = reader.item(0)?;
        if reader.offset != data.len() {
            return Err(CodecError::TrailingBytes {
                remaining: data.len() - reader.offset,
            });
        }
        Ok(value)
    }
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
    decoder: &'a Decoder,
}

impl<'a> Reader<'a> {
    fn item(&mut self, depth: usize) -> Result<Value> {
        if depth > self.decoder.max_depth {
            return Err(CodecError::DepthLimitExceeded {
                max_depth: self.decoder.max_depth,
                offset: self.offset,
            });
        }

        let start = self.offset;
        let initial = self.read_u8()?;
        let major = initial >> 5;
        let info = initial & 0x1f;

        if major == MAJOR_SIMPLE {
            match info {
                25 => return Ok(Value::Float(f64::from(half_to_f32(self.read_u16()?)))),
                26 => return Ok(Value::Float(f64::from(f32::from_bits(self.read_u32()?)))),
                27 => return Ok(Value::Float(f64::from_bits(self.read_u64()?))),
                _ => {}
            }
        }

        let length = self.argument(info, start)?;

        match (major, length) {
            (MAJOR_UNSIGNED, Some(n)) => Ok(Value::Integer(i128::from(n))),
            (MAJOR_NEGATIVE, Some(n)) => Ok(Value::Integer(-1 - i128::from(n))),
            (MAJOR_BYTES, Some(n)) => Ok(Value::Bytes(Bytes::copy_from_slice(self.take(n)?))),
            (MAJOR_BYTES, None) => {
                let joined = self.chunks(MAJOR_BYTES)?;
                Ok(Value::Bytes(Bytes::from(joined)))
            }
            (MAJOR_TEXT, length) => {
                let raw = match length {
                    Some(n) => self.take(n)?.to_vec(),
                    None => self.chunks(MAJOR_TEXT)?,
                };
                String::from_utf8(raw)
                    .map(Value::Text)
                    .map_err(|_| CodecError::InvalidUtf8 { offset: start })
            }
            (MAJOR_ARRAY, Some(n)) => {
                let mut items = Vec::with_capacity(self.capacity_hint(n));
                for _ in 0..n {
                    items.push(self.item(depth + 1)?);
                }
                Ok(Value::Array(items))
            }
            (MAJOR_ARRAY, None) => {
                let mut items = Vec::new();
                while !self.read_break()? {
                    items.push(self.item(depth + 1)?);
                }
                Ok(Value::Array(items))
            }
            (MAJOR_MAP, length) => {
                let mut entries = match length {
                    Some(n) => MapEntries::with_capacity(self.capacity_hint(n)),
                    None => MapEntries::default(),
                };
                let mut read = 0u64;
                loop {
                    match length {
                        Some(n) if read == n => break,
                        None if self.read_break()? => break,
                        _ => {}
                    }
                    let key = self.item(depth + 1)?;
                    let value = self.item(depth + 1)?;
                    entries.insert(key, value);
                    read += 1;
                }
                Ok(Value::Map(entries.into_inner()))
            }
            (MAJOR_TAG, Some(tag)) => {
                let inner = self.item(depth + 1)?;
                Ok(self.decoder.tags.transform(inner, tag))
            }
            (MAJOR_SIMPLE, Some(code)) => Ok(match code {
                20 => Value::Bool(false),
                21 => Value::Bool(true),
                22 => Value::Null,
                23 => Value::Undefined,
                // `argument` never yields more than one byte for info < 25.
                code => self.decoder.simple.simple(code as u8),
            }),
            (major, _) => Err(CodecError::InvalidIndefiniteLength {
                major,
                offset: start,
            }),
        }
    }

    /// Read the argument for `info`; `None` means indefinite length.
    fn argument(&mut self, info: u8, start: usize) -> Result<Option<u64>> {
        match info {
            0..=23 => Ok(Some(u64::from(info))),
            24 => Ok(Some(u64::from(self.read_u8()?))),
            25 => Ok(Some(u64::from(self.read_u16()?))),
            26 => Ok(Some(u64::from(self.read_u32()?))),
            27 => Ok(Some(self.read_u64()?)),
            31 => Ok(None),
            _ => Err(CodecError::InvalidLengthEncoding {
                info,
                offset: start,
            }),
        }
    }

    /// Concatenate definite-length chunks of `major` until a break.
    fn chunks(&mut self, major: u8) -> Result<Vec<u8>> {
        let mut joined = Vec::new();
        loop {
            let start = self.offset;
            let initial = self.read_u8()?;
            if initial == BREAK {
                return Ok(joined);
            }
            let found = initial >> 5;
            if found != major {
                return Err(CodecError::InvalidChunk {
                    expected: major,
                    found,
                    offset: start,
                });
            }
            match self.argument(initial & 0x1f, start)? {
                Some(n) => joined.extend_from_slice(self.take(n)?),
                None => {
                    return Err(CodecError::InvalidChunk {
                        expected: major,
                        found,
                        offset: start,
                    })
                }
            }
        }
    }

    fn read_break(&mut self) -> Result<bool> {
        match self.data.get(self.offset) {
            Some(&BREAK) => {
                self.offset += 1;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(CodecError::UnexpectedEof {
                offset: self.offset,
                needed: 1,
            }),
        }
    }

    fn capacity_hint(&self, declared: u64) -> usize {
        let remaining = self.data.len() - self.offset;
        usize::try_from(declared).map_or(remaining, |n| n.min(remaining))
    }

    fn take(&mut self, length: u64) -> Result<&'a [u8]> {
        let remaining = self.data.len() - self.offset;
        let len = match usize::try_from(length) {
            Ok(len) if len <= remaining => len,
            _ => {
                return Err(CodecError::LengthOverflow {
                    length,
                    offset: self.offset,
                })
            }
        };
        let data = self.data;
        let slice = &data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn fixed<const N: usize>(&mut self) -> Result<[u8; N]> {
        let remaining = self.data.len() - self.offset;
        if remaining < N {
            return Err(CodecError::UnexpectedEof {
                offset: self.offset,
                needed: N - remaining,
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.offset..self.offset + N]);
        self.offset += N;
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.fixed::<1>()?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.fixed()?))
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.fixed()?))
    }

    fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.fixed()?))
    }
}

/// Hashable form of the key kinds that show up in practice.
#[derive(PartialEq, Eq, Hash)]
enum IndexKey {
    Text(String),
    Integer(i128),
}

impl IndexKey {
    /// Whole floats share the integer slot since they compare equal.
    fn of(key: &Value) -> Option<Self> {
        match key {
            Value::Text(text) => Some(IndexKey::Text(text.clone())),
            Value::Integer(n) => Some(IndexKey::Integer(*n)),
            Value::Float(f) => integral(*f).map(IndexKey::Integer),
            _ => None,
        }
    }
}

/// Map entries in first-seen order; a repeated key overwrites the earlier value.
#[derive(Default)]
struct MapEntries {
    entries: Vec<(Value, Value)>,
    index: HashMap<IndexKey, usize>,
    /// Positions of keys with no `IndexKey`, searched linearly.
    unindexed: Vec<usize>,
}

impl MapEntries {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            unindexed: Vec::new(),
        }
    }

    fn insert(&mut self, key: Value, value: Value) {
        let position = self.entries.len();
        let existing = match IndexKey::of(&key) {
            Some(indexed) => match self.index.entry(indexed) {
                Entry::Occupied(slot) => Some(*slot.get()),
                Entry::Vacant(slot) => {
                    slot.insert(position);
                    None
                }
            },
            None => {
                let found = self
                    .unindexed
                    .iter()
                    .copied()
                    .find(|&at| self.entries[at].0 == key);
                if found.is_none() {
                    self.unindexed.push(position);
                }
                found
            }
        };
        match existing {
            Some(at) => self.entries[at].1 = value,
            None => self.entries.push((key, value)),
        }
    }

    fn into_inner(self) -> Vec<(Value, Value)> {
        self.entries
    }
}

/// Widen an IEEE 754 half-precision value.
fn half_to_f32(half: u16) -> f32 {
    let sign = u32::from(half & 0x8000);
    let mut exponent = u32::from(half & 0x7c00);
    let fraction = u32::from(half & 0x03ff);

    if exponent == 0x7c00 {
        exponent = 0xff << 10;
    } else if exponent != 0 {
        exponent += (127 - 15) << 10;
    } else if fraction != 0 {
        // Subnormal: fraction * 2^-24.
        let magnitude = fraction as f32 * (1.0 / 16_777_216.0);
        return if sign != 0 { -magnitude } else { magnitude };
    }

    f32::from_bits(sign << 16 | exponent << 13 | fraction << 13)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_integers() {
        assert_eq!(decode(&[0x00]).unwrap(), Value::from(0));
        assert_eq!(decode(&[0x18, 0x64]).unwrap(), Value::from(100));
        assert_eq!(decode(&[0x39, 0x03, 0xe7]).unwrap(), Value::from(-1000));
        assert_eq!(
            decode(&[0x1b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).unwrap(),
            Value::Integer(i128::from(u64::MAX))
        );
        assert_eq!(
            decode(&[0x3b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).unwrap(),
            Value::Integer(-1 - i128::from(u64::MAX))
        );
    }

    #[test]
    fn decodes_half_single_and_double_floats() {
        assert_eq!(decode(&[0xf9, 0x3c, 0x00]).unwrap(), Value::Float(1.0));
        assert_eq!(decode(&[0xf9, 0x3e, 0x00]).unwrap(), Value::Float(1.5));
        assert_eq!(decode(&[0xf9, 0xc4, 0x00]).unwrap(), Value::Float(-4.0));
        assert_eq!(
            decode(&[0xf9, 0x00, 0x01]).unwrap(),
            Value::Float(2f64.powi(-24))
        );
        assert_eq!(
            decode(&[0xf9, 0x7c, 0x00]).unwrap(),
            Value::Float(f64::INFINITY)
        );
        assert_eq!(decode(&[0xf9, 0x7e, 0x00]).unwrap(), Value::Float(f64::NAN));
        assert_eq!(
            decode(&[0xfa, 0x47, 0xc3, 0x50, 0x00]).unwrap(),
            Value::Float(100000.0)
        );
        assert_eq!(
            decode(&[0xfb, 0x3f, 0xf1, 0x99, 0x99, 0x99, 0x99, 0x99, 0x9a]).unwrap(),
            Value::Float(1.1)
        );
    }

    #[test]
    fn decodes_simple_values_with_default_fallback() {
        assert_eq!(decode(&[0xf4]).unwrap(), Value::Bool(false));
        assert_eq!(decode(&[0xf5]).unwrap(), Value::Bool(true));
        assert_eq!(decode(&[0xf6]).unwrap(), Value::Null);
        assert_eq!(decode(&[0xf7]).unwrap(), Value::Undefined);
        assert_eq!(decode(&[0xf0]).unwrap(), Value::Undefined);
        assert_eq!(decode(&[0xf8, 0xff]).unwrap(), Value::Undefined);
    }

    #[test]
    fn custom_simple_fallback_sees_code() {
        let decoder = Decoder::new().with_simple_fallback(|code: u8| Value::from(code));
        assert_eq!(decoder.decode(&[0xf0]).unwrap(), Value::from(16));
        assert_eq!(decoder.decode(&[0xf8, 0x20]).unwrap(), Value::from(32));
        assert_eq!(decoder.decode(&[0xf6]).unwrap(), Value::Null);
    }

    #[test]
    fn tags_are_ignored_by_default() {
        let bytes = [0xc1, 0x1a, 0x51, 0x4b, 0x67, 0xb0];
        assert_eq!(decode(&bytes).unwrap(), Value::from(1_363_896_240u32));
    }

    #[test]
    fn tag_transform_receives_value_and_tag() {
        let bytes = [0xd8, 0x20, 0x63, b'u', b'r', b'l'];
        let kept = Decoder::new().with_tag_transform(KeepTags).decode(&bytes);
        assert_eq!(kept.unwrap(), Value::tagged(32, "url"));

        let described = Decoder::new()
            .with_tag_transform(|value: Value, tag: u64| {
                Value::map([("tag", Value::from(tag)), ("value", value)])
            })
            .decode(&bytes)
            .unwrap();
        assert_eq!(described.get("tag"), Some(&Value::from(32)));
    }

    #[test]
    fn indefinite_byte_string_concatenates_chunks() {
        let bytes = [0x5f, 0x43, 1, 2, 3, 0x45, 4, 5, 6, 7, 8, 0xff];
        let value = decode(&bytes).unwrap();
        assert_eq!(value, Value::from(&[1u8, 2, 3, 4, 5, 6, 7, 8][..]));
        assert_eq!(value.as_bytes().map(|b| b.len()), Some(8));
    }

    #[test]
    fn indefinite_text_array_and_map() {
        let text = [0x7f, 0x62, b'h', b'e', 0x63, b'l', b'l', b'o', 0xff];
        assert_eq!(decode(&text).unwrap(), Value::from("hello"));

        let array = [0x9f, 0x01, 0x82, 0x02, 0x03, 0xff];
        assert_eq!(
            decode(&array).unwrap(),
            Value::Array(vec![Value::from(1), Value::array([2, 3])])
        );

        let map = [0xbf, 0x61, b'a', 0x01, 0x61, b'b', 0x9f, 0xff, 0xff];
        assert_eq!(
            decode(&map).unwrap(),
            Value::map([("a", Value::from(1)), ("b", Value::Array(vec![]))])
        );
    }

    #[test]
    fn duplicate_map_keys_keep_first_position_last_value() {
        let bytes = [0xa3, 0x61, b'a', 0x01, 0x61, b'b', 0x02, 0x61, b'a', 0x03];
        let value = decode(&bytes).unwrap();
        assert_eq!(value, Value::map([("a", 3), ("b", 2)]));
    }

    #[test]
    fn large_map_with_rewritten_keys() {
        const N: i64 = 50_000;
        let mut entries: Vec<(Value, Value)> =
            (0..N).map(|n| (Value::from(n), Value::from(n))).collect();
        entries.extend((0..N).step_by(2).map(|n| (Value::from(n), Value::from(-n))));
        entries.push((Value::from("tail"), Value::Null));
        let bytes = crate::encode(&Value::Map(entries));

        let value = decode(&bytes).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.len(), N as usize + 1);
        assert_eq!(map[0], (Value::from(0), Value::from(0)));
        assert_eq!(map[2], (Value::from(2), Value::from(-2)));
        assert_eq!(map[3], (Value::from(3), Value::from(3)));
        assert_eq!(value.get("tail"), Some(&Value::Null));
    }

    #[test]
    fn whole_float_key_overwrites_integer_key() {
        // {1: "a", 1.0: "b", [1]: 1, [1]: 2}
        let bytes = [
            0xa4, 0x01, 0x61, b'a', 0xf9, 0x3c, 0x00, 0x61, b'b', 0x81, 0x01, 0x01, 0x81, 0x01,
            0x02,
        ];
        let value = decode(&bytes).unwrap();
        assert_eq!(
            value,
            Value::Map(vec![
                (Value::from(1), Value::from("b")),
                (Value::Array(vec![Value::from(1)]), Value::from(2)),
            ])
        );
    }

    #[test]
    fn four_byte_utf8_round_trips() {
        let bytes = [0x64, 0xf0, 0x9f, 0x8e, 0x89];
        assert_eq!(decode(&bytes).unwrap(), Value::from("\u{1F389}"));
    }

    #[test]
    fn rejects_mismatched_chunk() {
        let bytes = [0x5f, 0x61, b'a', 0xff];
        assert!(matches!(
            decode(&bytes),
            Err(CodecError::InvalidChunk {
                expected: 2,
                found: 3,
                ..
            })
        ));
    }

    #[test]
    fn rejects_nested_indefinite_chunk() {
        let bytes = [0x5f, 0x5f, 0xff, 0xff];
        assert!(matches!(decode(&bytes), Err(CodecError::InvalidChunk { .. })));
    }

    #[test]
    fn rejects_indefinite_on_forbidden_major_types() {
        for initial in [0x1f, 0x3f, 0xdf, 0xff] {
            assert!(
                matches!(
                    decode(&[initial, 0x00]),
                    Err(CodecError::InvalidIndefiniteLength { .. })
                ),
                "initial byte {initial:#04x}"
            );
        }
    }

    #[test]
    fn rejects_reserved_length_encoding() {
        assert!(matches!(
            decode(&[0x1c]),
            Err(CodecError::InvalidLengthEncoding { info: 28, .. })
        ));
    }

    #[test]
    fn rejects_trailing_bytes() {
        assert_eq!(
            decode(&[0x01, 0x02, 0x03]),
            Err(CodecError::TrailingBytes { remaining: 2 })
        );
    }

    #[test]
    fn rejects_truncated_input() {
        assert!(matches!(
            decode(&[0x19, 0x01]),
            Err(CodecError::UnexpectedEof { needed: 1, .. })
        ));
        assert!(matches!(
            decode(&[0x63, b'a']),
            Err(CodecError::LengthOverflow { length: 3, .. })
        ));
        assert!(matches!(
            decode(&[0x82, 0x01]),
            Err(CodecError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            decode(&[0x9f, 0x01]),
            Err(CodecError::UnexpectedEof { .. })
        ));
        assert!(matches!(decode(&[]), Err(CodecError::UnexpectedEof { .. })));
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert!(matches!(
            decode(&[0x62, 0xc3, 0x28]),
            Err(CodecError::InvalidUtf8 { offset: 0 })
        ));
    }

    #[test]
    fn enforces_depth_limit() {
        let mut bytes = vec![0x81; 10];
        bytes.push(0x00);
        let decoder = Decoder::new().with_max_depth(4);
        assert!(matches!(
            decoder.decode(&bytes),
            Err(CodecError::DepthLimitExceeded { max_depth: 4, .. })
        ));
        assert!(Decoder::new().decode(&bytes).is_ok());
    }

    #[test]
    fn decoder_is_reusable_after_error() {
        let decoder = Decoder::new();
        assert!(decoder.decode(&[0x82, 0x01]).is_err());
        assert_eq!(decoder.decode(&[0x82, 0x01, 0x02]).unwrap(), Value::array([1, 2]));
    }
}
