//! Deterministic seed-derivation helpers.
//!
//! The harness never seeds from ambient entropy during a run. A master
//! `seed: u64` is fixed at startup and every per-sample seed is derived by
//! hashing `(master_seed, substream)` with SipHash-1-3 configured with fixed
//! zero keys. The substream for the k-th measured sample at any scale is `k`,
//! so re-running a benchmark with the same master seed reproduces the exact
//! generator inputs sample for sample. This rule is stable across platforms.

use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Substream reserved for warm-up executions, outside the sample index range.
pub const WARMUP_SUBSTREAM: u64 = 1 << 32;

/// Derives the deterministic seed for a specific substream.
pub fn derive_sample_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}
