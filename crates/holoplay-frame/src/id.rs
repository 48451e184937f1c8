//! Request id generation.
//!
//! Ids are drawn from a seeded xoshiro128** generator whose four state words
//! come from an xmur3 hash of a seed string (by default the decimal
//! wall-clock time in milliseconds). Each draw is scaled into
//! `[0x80000000, 0xFFFFFFFF)`. The sequence is fully determined by the seed,
//! so tests can pin it.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::codec::REPLY_ID_MIN;

/// Width of the id range above [`REPLY_ID_MIN`].
pub const REQUEST_ID_SPAN: u32 = 0x7fff_ffff;

/// Deterministic pseudo-random request id source.
///
/// Not cryptographic. Collisions are merely unlikely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdGenerator {
    state: [u32; 4],
}

impl RequestIdGenerator {
    /// Seed from the current wall-clock time.
    pub fn from_system_time() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self::from_timestamp_millis(millis)
    }

    /// Seed from a Unix timestamp in milliseconds.
    pub fn from_timestamp_millis(millis: u64) -> Self {
        Self::from_seed(&millis.to_string())
    }

    /// Seed from an arbitrary string.
    pub fn from_seed(seed: &str) -> Self {
        let mut hash = Xmur3::new(seed);
        Self::from_state([hash.next(), hash.next(), hash.next(), hash.next()])
    }

    /// Start from raw generator state.
    pub fn from_state(state: [u32; 4]) -> Self {
        Self { state }
    }

    /// Current generator state.
    pub fn state(&self) -> [u32; 4] {
        self.state
    }

    /// Next raw 32-bit output.
    pub fn next_u32(&mut self) -> u32 {
        let [mut a, mut b, mut c, mut d] = self.state;
        let t = b << 9;
        let r = a.wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        c ^= a;
        d ^= b;
        b ^= c;
        a ^= d;
        c ^= t;
        d = d.rotate_left(11);
        self.state = [a, b, c, d];
        r
    }

    /// Next draw in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }

    /// Next request id in `[0x80000000, 0xFFFFFFFF)`.
    pub fn next_id(&mut self) -> u32 {
        let offset = (self.next_f64() * f64::from(REQUEST_ID_SPAN)).floor() as u32;
        REPLY_ID_MIN + offset
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::from_system_time()
    }
}

/// xmur3 string hash, used only to expand a seed into state words.
struct Xmur3 {
    h: u32,
}

impl Xmur3 {
    fn new(seed: &str) -> Self {
        let units: Vec<u16> = seed.encode_utf16().collect();
        let mut h = 1_779_033_703u32 ^ units.len() as u32;
        for unit in units {
            h = (h ^ u32::from(unit)).wrapping_mul(3_432_918_353);
            h = h.rotate_left(13);
        }
        Self { h }
    }

    fn next(&mut self) -> u32 {
        let mut h = self.h;
        h = (h ^ (h >> 16)).wrapping_mul(2_246_822_507);
        h = (h ^ (h >> 13)).wrapping_mul(3_266_489_909);
        h ^= h >> 16;
        self.h = h;
        h
    }
}
