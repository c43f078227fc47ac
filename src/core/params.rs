//! Table dimensioning for Cuckoo filters.
//!
//! This module implements the parameter formulas from "Cuckoo Filter:
//! Practically Better Than Bloom" (Fan, Andersen, Kaminsky, Mitzenmacher,
//! CoNEXT 2014) for deriving fingerprint width and bucket count from the
//! requested false positive probability and capacity.
//!
//! # Mathematical Background
//!
//! Given a target false positive probability `ε` and the design load factor
//! `α = 0.955` for 4-slot buckets:
//!
//! - `tag_bits = ⌈log₂(1/ε + 3) / α⌉` (fingerprint width)
//! - `num_buckets = nextpow2(⌈max_keys / (α · 4)⌉)` (table size)
//!
//! The bucket count is forced to a power of two so the bucket index can be
//! taken by modulo without bias and so the XOR-derived alternate index is
//! closed over the table (see [`crate::core::index`]).

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

use crate::error::{CuckooCraftError, Result};
use crate::util::bitops::next_power_of_two;

/// Number of fingerprint slots per bucket.
///
/// Fixed at 4: the geometry the load-factor constant and the
/// duplicate-insert ceiling are derived from.
pub const BUCKET_SIZE: usize = 4;

/// Design load factor for 4-slot buckets.
///
/// Reasonably sized filters with randomly distributed keys reach about this
/// fill fraction before the first insertion failure.
pub const LOAD_FACTOR: f64 = 0.955;

/// Default false positive probability used by the builder.
pub const DEFAULT_FPP: f64 = 0.01;

/// Default expected concurrency used by the builder.
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Calculate the fingerprint width needed to reach a false positive
/// probability.
///
/// # Arguments
///
/// * `fpp` - Target false positive probability, in (0, 0.25)
///
/// # Errors
///
/// [`CuckooCraftError::FalsePositiveRateOutOfBounds`] if `fpp` is outside
/// (0, 0.25).
///
/// # Examples
///
/// ```
/// use cuckoocraft::core::params::tag_bits_for_fpp;
///
/// assert_eq!(tag_bits_for_fpp(0.01).unwrap(), 8);
/// assert_eq!(tag_bits_for_fpp(0.001).unwrap(), 11);
/// assert!(tag_bits_for_fpp(0.5).is_err());
/// ```
pub fn tag_bits_for_fpp(fpp: f64) -> Result<usize> {
    if !(fpp > 0.0 && fpp < 0.25) {
        return Err(CuckooCraftError::fpp_out_of_bounds(fpp));
    }
    let bits = ((1.0 / fpp + 3.0).log2() / LOAD_FACTOR).ceil();
    Ok(bits as usize)
}

/// Calculate the bucket count needed to hold `max_keys` keys at the design
/// load factor, rounded up to a power of two.
///
/// # Arguments
///
/// * `max_keys` - Number of keys the filter is expected to hold before
///   insertion failure (must be > 1)
///
/// # Errors
///
/// - [`CuckooCraftError::InvalidMaxKeys`] if `max_keys <= 1`
/// - [`CuckooCraftError::InvalidParameters`] if the requested capacity is too
///   large to address
///
/// # Examples
///
/// ```
/// use cuckoocraft::core::params::buckets_needed;
///
/// assert_eq!(buckets_needed(130_000).unwrap(), 65_536);
/// assert!(buckets_needed(1).is_err());
/// ```
pub fn buckets_needed(max_keys: u64) -> Result<u64> {
    if max_keys <= 1 {
        return Err(CuckooCraftError::invalid_max_keys(max_keys));
    }
    let raw = ((1.0 / LOAD_FACTOR) * max_keys as f64 / BUCKET_SIZE as f64).ceil();
    // 2^56 buckets is already a table beyond any addressable memory; the cap
    // keeps the bit-offset arithmetic comfortably inside u64.
    if raw > (1u64 << 56) as f64 {
        return Err(CuckooCraftError::invalid_parameters(format!(
            "max keys {} requires more buckets than the table can address",
            max_keys
        )));
    }
    next_power_of_two(raw as u64).ok_or_else(|| {
        CuckooCraftError::invalid_parameters(format!(
            "max keys {} requires more buckets than the table can address",
            max_keys
        ))
    })
}
