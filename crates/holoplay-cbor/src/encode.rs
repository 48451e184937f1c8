use bytes::{BufMut, Bytes, BytesMut};

use crate::value::{Value, MAX_EXACT_INTEGER};

/// Starting size of the encode buffer.
pub const INITIAL_CAPACITY: usize = 256;

pub(crate) const MAJOR_UNSIGNED: u8 = 0;
pub(crate) const MAJOR_NEGATIVE: u8 = 1;
pub(crate) const MAJOR_BYTES: u8 = 2;
pub(crate) const MAJOR_TEXT: u8 = 3;
pub(crate) const MAJOR_ARRAY: u8 = 4;
pub(crate) const MAJOR_MAP: u8 = 5;
pub(crate) const MAJOR_TAG: u8 = 6;
pub(crate) const MAJOR_SIMPLE: u8 = 7;

pub(crate) const FALSE: u8 = 0xf4;
pub(crate) const TRUE: u8 = 0xf5;
pub(crate) const NULL: u8 = 0xf6;
pub(crate) const UNDEFINED: u8 = 0xf7;
pub(crate) const FLOAT64: u8 = 0xfb;
pub(crate) const BREAK: u8 = 0xff;

/// Encode a value into a freshly allocated buffer.
pub fn encode(value: &Value) -> Bytes {
    let mut encoder = Encoder::new();
    encoder.encode(value);
    encoder.finish()
}

/// Incremental value encoder.
///
/// The buffer starts at [`INITIAL_CAPACITY`] bytes and doubles whenever a
/// write does not fit; [`Encoder::finish`] returns exactly the bytes written.
#[derive(Debug)]
pub struct Encoder {
    buf: BytesMut,
    capacity: usize,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Current buffer size. Always a power-of-two multiple of the initial size.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append one encoded value.
    pub fn encode(&mut self, value: &Value) {
        match value {
            Value::Bool(false) => self.write_u8(FALSE),
            Value::Bool(true) => self.write_u8(TRUE),
            Value::Null => self.write_u8(NULL),
            Value::Undefined => self.write_u8(UNDEFINED),
            Value::Integer(n) => self.write_integer(*n),
            Value::Float(f) => self.write_number(*f),
            Value::Text(s) => {
                self.write_type_and_length(MAJOR_TEXT, s.len() as u64);
                self.write_slice(s.as_bytes());
            }
            Value::Bytes(b) => {
                self.write_type_and_length(MAJOR_BYTES, b.len() as u64);
                self.write_slice(b);
            }
            Value::Array(items) => {
                self.write_type_and_length(MAJOR_ARRAY, items.len() as u64);
                for item in items {
                    self.encode(item);
                }
            }
            Value::Map(entries) => {
                self.write_type_and_length(MAJOR_MAP, entries.len() as u64);
                for (key, value) in entries {
                    self.encode(key);
                    self.encode(value);
                }
            }
            Value::Tag(tag, inner) => {
                self.write_type_and_length(MAJOR_TAG, *tag);
                self.encode(inner);
            }
        }
    }

    /// Consume the encoder and return the written bytes.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    fn write_integer(&mut self, n: i128) {
        if (0..=MAX_EXACT_INTEGER).contains(&n) {
            self.write_type_and_length(MAJOR_UNSIGNED, n as u64);
        } else if (-MAX_EXACT_INTEGER..0).contains(&n) {
            self.write_type_and_length(MAJOR_NEGATIVE, (-(n + 1)) as u64);
        } else {
            self.write_float64(n as f64);
        }
    }

    fn write_number(&mut self, f: f64) {
        // Integral doubles in the exact range go out as integers; -0.0 becomes 0.
        let limit = MAX_EXACT_INTEGER as f64;
        if f.fract() == 0.0 && (-limit..=limit).contains(&f) {
            self.write_integer(f as i128);
        } else {
            self.write_float64(f);
        }
    }

    fn write_float64(&mut self, f: f64) {
        self.ensure_space(9);
        self.buf.put_u8(FLOAT64);
        self.buf.put_f64(f);
    }

    fn write_type_and_length(&mut self, major: u8, length: u64) {
        let major = major << 5;
        if length < 24 {
            self.write_u8(major | length as u8);
        } else if length < 0x100 {
            self.ensure_space(2);
            self.buf.put_u8(major | 24);
            self.buf.put_u8(length as u8);
        } else if length < 0x10000 {
            self.ensure_space(3);
            self.buf.put_u8(major | 25);
            self.buf.put_u16(length as u16);
        } else if length < 0x1_0000_0000 {
            self.ensure_space(5);
            self.buf.put_u8(major | 26);
            self.buf.put_u32(length as u32);
        } else {
            self.ensure_space(9);
            self.buf.put_u8(major | 27);
            self.buf.put_u64(length);
        }
    }

    fn write_u8(&mut self, byte: u8) {
        self.ensure_space(1);
        self.buf.put_u8(byte);
    }

    fn write_slice(&mut self, data: &[u8]) {
        self.ensure_space(data.len());
        self.buf.put_slice(data);
    }

    fn ensure_space(&mut self, additional: usize) {
        let required = self.buf.len() + additional;
        if required <= self.capacity {
            return;
        }
        let mut capacity = self.capacity;
        while capacity < required {
            capacity *= 2;
        }
        self.buf.reserve(capacity - self.buf.len());
        self.capacity = capacity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(value: &Value) -> Vec<u8> {
        encode(value).to_vec()
    }

    #[test]
    fn encodes_small_and_boundary_integers() {
        assert_eq!(hex(&Value::from(0)), [0x00]);
        assert_eq!(hex(&Value::from(23)), [0x17]);
        assert_eq!(hex(&Value::from(24)), [0x18, 0x18]);
        assert_eq!(hex(&Value::from(255)), [0x18, 0xff]);
        assert_eq!(hex(&Value::from(256)), [0x19, 0x01, 0x00]);
        assert_eq!(hex(&Value::from(65536)), [0x1a, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(
            hex(&Value::from(0x1_0000_0000u64)),
            [0x1b, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(hex(&Value::from(-1)), [0x20]);
        assert_eq!(hex(&Value::from(-100)), [0x38, 0x63]);
    }

    #[test]
    fn integers_beyond_exact_range_become_doubles() {
        let beyond = MAX_EXACT_INTEGER + 1;
        let bytes = hex(&Value::Integer(beyond));
        assert_eq!(bytes[0], FLOAT64);
        assert_eq!(bytes.len(), 9);

        let edge = hex(&Value::Integer(MAX_EXACT_INTEGER));
        assert_eq!(edge[0], 0x1b);
        let negative_edge = hex(&Value::Integer(-MAX_EXACT_INTEGER));
        assert_eq!(negative_edge[0], 0x3b);
    }

    #[test]
    fn integral_floats_encode_as_integers() {
        assert_eq!(hex(&Value::Float(10.0)), [0x0a]);
        assert_eq!(hex(&Value::Float(-0.0)), [0x00]);
        assert_eq!(hex(&Value::Float(-2.0)), [0x21]);
    }

    #[test]
    fn fractional_floats_always_use_double() {
        assert_eq!(
            hex(&Value::Float(1.5)),
            [0xfb, 0x3f, 0xf8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(hex(&Value::Float(f64::INFINITY))[0], FLOAT64);
        assert_eq!(hex(&Value::Float(f64::NAN))[0], FLOAT64);
    }

    #[test]
    fn encodes_simple_values() {
        assert_eq!(hex(&Value::Bool(false)), [0xf4]);
        assert_eq!(hex(&Value::Bool(true)), [0xf5]);
        assert_eq!(hex(&Value::Null), [0xf6]);
        assert_eq!(hex(&Value::Undefined), [0xf7]);
    }

    #[test]
    fn encodes_text_and_bytes() {
        assert_eq!(hex(&Value::from("a")), [0x61, b'a']);
        assert_eq!(hex(&Value::from("\u{1F600}")), [0x64, 0xf0, 0x9f, 0x98, 0x80]);
        assert_eq!(hex(&Value::from(&[1u8, 2, 3][..])), [0x43, 1, 2, 3]);
    }

    #[test]
    fn map_keeps_insertion_order_and_natural_key_types() {
        let value = Value::Map(vec![
            (Value::from("z"), Value::from(1)),
            (Value::from(7), Value::from(2)),
        ]);
        assert_eq!(hex(&value), [0xa2, 0x61, b'z', 0x01, 0x07, 0x02]);
    }

    #[test]
    fn encodes_tag_and_array() {
        let value = Value::tagged(1, Value::array([1, 2]));
        assert_eq!(hex(&value), [0xc1, 0x82, 0x01, 0x02]);
    }

    #[test]
    fn buffer_grows_by_doubling_and_keeps_prefix() {
        let mut encoder = Encoder::with_capacity(4);
        encoder.encode(&Value::from("abc"));
        assert_eq!(encoder.capacity(), 4);

        let blob = vec![0x5a; 20];
        encoder.encode(&Value::from(blob.as_slice()));
        assert_eq!(encoder.capacity(), 32);
        assert_eq!(encoder.len(), 4 + 1 + 20);

        let out = encoder.finish();
        assert_eq!(out.len(), 25);
        assert_eq!(&out[..4], &[0x63, b'a', b'b', b'c']);
        assert_eq!(&out[5..], blob.as_slice());
    }
}
