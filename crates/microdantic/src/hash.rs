//! # Content Hash
//!
//! A compact 32-bit xxHash variant (4-byte lanes only, murmur-style tail) and a
//! canonical byte encoding of value trees to run it over. Everything uses fixed-width
//! arithmetic, so two hosts agree on the hash of structurally equal instances
//! regardless of word size. Not a security primitive.
//!
//! ## Canonical encoding
//!
//! Each value is a one-byte kind tag followed by its payload: little-endian `i64`
//! for integers, the IEEE-754 bit pattern for floats (`-0.0` folded to `0.0`, every
//! NaN folded to one pattern), a `u8` for booleans, a `u32` length prefix plus the
//! bytes for text and byte sequences, a `u32` count plus the elements for sequences,
//! and a `u32` count plus the key-sorted entries for mappings. A nested instance is its
//! model name followed by its values in declaration order.
//!
//! The hash mixes the total input length in first, so the encoding is measured in one
//! pass and streamed into the hasher in a second, without an intermediate buffer.

use crate::instance::Instance;
use crate::value::Value;

const PRIME1: u32 = 2_654_435_761;
const PRIME2: u32 = 2_246_822_519;
const PRIME3: u32 = 3_266_489_917;
const PRIME4: u32 = 668_265_263;
const PRIME5: u32 = 374_761_393;

/// Seed used by [`Instance::content_hash`].
pub const DEFAULT_SEED: u32 = 0;

/// Hashes `data` in one call.
#[must_use]
pub fn hash32(data: &[u8], seed: u32) -> u32 {
    let mut hasher = Hasher32::new(seed, data.len());
    hasher.update(data);
    hasher.finish()
}

/// Streaming form of [`hash32`].
///
/// The total input length is part of the initial state, so it must be known up
/// front; feeding a different number of bytes yields a hash that matches no
/// one-shot call.
#[derive(Debug, Clone)]
pub struct Hasher32 {
    acc: u32,
    lane: [u8; 4],
    filled: usize,
}

impl Hasher32 {
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new(seed: u32, total_len: usize) -> Self {
        // The length enters modulo 2^32.
        let acc = seed.wrapping_add(PRIME5).wrapping_add(total_len as u32);
        Self { acc, lane: [0; 4], filled: 0 }
    }

    pub fn update(&mut self, mut data: &[u8]) {
        if self.filled > 0 {
            let take = (4 - self.filled).min(data.len());
            self.lane[self.filled..self.filled + take].copy_from_slice(&data[..take]);
            self.filled += take;
            data = &data[take..];
            if self.filled < 4 {
                return;
            }
            self.round(self.lane);
            self.filled = 0;
        }

        let mut chunks = data.chunks_exact(4);
        for chunk in chunks.by_ref() {
            self.round([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        let rest = chunks.remainder();
        self.lane[..rest.len()].copy_from_slice(rest);
        self.filled = rest.len();
    }

    fn round(&mut self, lane: [u8; 4]) {
        let k = u32::from_le_bytes(lane).wrapping_mul(PRIME3).rotate_left(17).wrapping_mul(PRIME4);
        self.acc = (self.acc ^ k).rotate_left(19).wrapping_mul(PRIME1).wrapping_add(PRIME4);
    }

    #[must_use]
    pub fn finish(self) -> u32 {
        let mut h = self.acc;
        let tail = &self.lane[..self.filled];

        if tail.len() == 3 {
            h ^= u32::from(tail[2]) << 16;
        }
        if tail.len() >= 2 {
            h ^= u32::from(tail[1]) << 8;
        }
        if let Some(&first) = tail.first() {
            h ^= u32::from(first);
            h = h.wrapping_mul(PRIME5).rotate_left(11).wrapping_mul(PRIME1);
        }

        h ^= h >> 15;
        h = h.wrapping_mul(PRIME2);
        h ^= h >> 13;
        h = h.wrapping_mul(PRIME3);
        h ^= h >> 16;
        h
    }
}

/// Receives the canonical encoding.
trait Sink {
    fn put(&mut self, bytes: &[u8]);
}

struct Measure(usize);

impl Sink for Measure {
    fn put(&mut self, bytes: &[u8]) {
        self.0 += bytes.len();
    }
}

impl Sink for Hasher32 {
    fn put(&mut self, bytes: &[u8]) {
        self.update(bytes);
    }
}

mod tag {
    pub(super) const NULL: u8 = 0;
    pub(super) const INT: u8 = 1;
    pub(super) const FLOAT: u8 = 2;
    pub(super) const BOOL: u8 = 3;
    pub(super) const TEXT: u8 = 4;
    pub(super) const BYTES: u8 = 5;
    pub(super) const SEQ: u8 = 6;
    pub(super) const MAP: u8 = 7;
    pub(super) const MODEL: u8 = 8;
}

fn put_len(sink: &mut dyn Sink, len: usize) {
    sink.put(&u32::try_from(len).unwrap_or(u32::MAX).to_le_bytes());
}

fn put_bytes(sink: &mut dyn Sink, bytes: &[u8]) {
    put_len(sink, bytes.len());
    sink.put(bytes);
}

fn canonical_float(v: f64) -> u64 {
    if v == 0.0 {
        0
    } else if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}

fn encode_value(sink: &mut dyn Sink, value: &Value) {
    match value {
        Value::Null => sink.put(&[tag::NULL]),
        Value::Int(v) => {
            sink.put(&[tag::INT]);
            sink.put(&v.to_le_bytes());
        },
        Value::Float(v) => {
            sink.put(&[tag::FLOAT]);
            sink.put(&canonical_float(*v).to_le_bytes());
        },
        Value::Bool(v) => sink.put(&[tag::BOOL, u8::from(*v)]),
        Value::Text(v) => {
            sink.put(&[tag::TEXT]);
            put_bytes(sink, v.as_bytes());
        },
        Value::Bytes(v) => {
            sink.put(&[tag::BYTES]);
            put_bytes(sink, v);
        },
        Value::Seq(items) => {
            sink.put(&[tag::SEQ]);
            put_len(sink, items.len());
            items.iter().for_each(|item| encode_value(sink, item));
        },
        Value::Map(map) => {
            sink.put(&[tag::MAP]);
            put_len(sink, map.len());
            for (key, item) in map.sorted_entries() {
                put_bytes(sink, key.as_bytes());
                encode_value(sink, item);
            }
        },
        Value::Model(instance) => encode_instance(sink, instance),
    }
}

fn encode_instance(sink: &mut dyn Sink, instance: &Instance) {
    sink.put(&[tag::MODEL]);
    put_bytes(sink, instance.model().name().as_bytes());
    put_len(sink, instance.values().len());
    instance.values().iter().for_each(|value| encode_value(sink, value));
}

fn hash_encoded(seed: u32, encode: impl Fn(&mut dyn Sink)) -> u32 {
    let mut measure = Measure(0);
    encode(&mut measure);
    let mut hasher = Hasher32::new(seed, measure.0);
    encode(&mut hasher);
    hasher.finish()
}

impl Value {
    /// Hash of this value's canonical encoding.
    #[must_use]
    pub fn content_hash(&self, seed: u32) -> u32 {
        hash_encoded(seed, |sink| encode_value(sink, self))
    }
}

impl Instance {
    /// Hash of this instance's canonical encoding with [`DEFAULT_SEED`].
    ///
    /// Structurally equal instances hash equally on every host.
    #[must_use]
    pub fn content_hash(&self) -> u32 {
        self.content_hash_with_seed(DEFAULT_SEED)
    }

    #[must_use]
    pub fn content_hash_with_seed(&self, seed: u32) -> u32 {
        hash_encoded(seed, |sink| encode_instance(sink, self))
    }
}
