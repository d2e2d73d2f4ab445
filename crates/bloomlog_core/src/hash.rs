//! Sizing formulas and double-hashed probe positions.

use std::f64::consts::LN_2;

#[inline]
pub fn h64(key: &[u8]) -> u64 { xxhash_rust::xxh3::xxh3_64(key) }

/// Optimal bit count for `max` elements at false-positive rate `fpp`:
/// `ceil(-n * ln(p) / ln(2)^2)`.
pub fn bit_size(max: u64, fpp: f64) -> u64 {
    (-(max as f64) * fpp.ln() / (LN_2 * LN_2)).ceil() as u64
}

/// Optimal probe count: `round(m / n * ln 2)`, at least one.
pub fn hash_size(bit_size: u64, max: u64) -> u32 {
    ((bit_size as f64 / max as f64) * LN_2).round().max(1.0) as u32
}

/// `(h1, h2)` with `h1 = H(k)` and `h2 = H(k ++ k)`.
pub fn base_hashes(key: &[u8]) -> (u64, u64) {
    let mut doubled = Vec::with_capacity(key.len() * 2);
    doubled.extend_from_slice(key);
    doubled.extend_from_slice(key);
    (h64(key), h64(&doubled))
}

/// Probe positions `(h1 + i * h2) mod bit_size` for `i in 0..hash_size`.
#[derive(Debug, Clone)]
pub struct Probes {
    h1: u64,
    h2: u64,
    bit_size: u64,
    i: u32,
    n: u32,
}

impl Probes {
    pub fn new(key: &[u8], hash_size: u32, bit_size: u64) -> Self {
        let (h1, h2) = base_hashes(key);
        Self { h1, h2, bit_size, i: 0, n: hash_size }
    }
}

impl Iterator for Probes {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<u64> {
        if self.i >= self.n {
            return None;
        }
        let c = self.h1.wrapping_add((self.i as u64).wrapping_mul(self.h2));
        self.i += 1;
        Some(c % self.bit_size)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.n - self.i) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Probes {}
