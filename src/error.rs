//! Error types for CuckooCraft operations.
//!
//! All fallible operations in this crate return [`Result<T>`] with
//! [`CuckooCraftError`] as the error type. Configuration problems surface at
//! construction time; once a filter exists, the runtime operations (`put`,
//! `delete`, `might_contain`) signal "full" or "not found" through their
//! boolean return values rather than through errors.
//!
//! # Error Propagation
//!
//! ```
//! use cuckoocraft::{CuckooCraftError, Result};
//! use cuckoocraft::core::params::{buckets_needed, tag_bits_for_fpp};
//!
//! fn plan_filter(max_keys: u64, fpp: f64) -> Result<(u64, usize)> {
//!     let buckets = buckets_needed(max_keys)?;
//!     let tag_bits = tag_bits_for_fpp(fpp)?;
//!     Ok((buckets, tag_bits))
//! }
//! # assert!(plan_filter(10_000, 0.01).is_ok());
//! # assert!(plan_filter(1, 0.01).is_err());
//! ```

#![allow(clippy::module_name_repetitions)]

use std::fmt;

/// Result type alias for CuckooCraft operations.
pub type Result<T> = std::result::Result<T, CuckooCraftError>;

/// Errors that can occur while configuring or rehydrating a Cuckoo filter.
///
/// Each variant carries the offending value so callers can report precisely
/// what was wrong. Runtime saturation is *not* an error: a full filter makes
/// `put` return `false`.
#[derive(Debug, Clone, PartialEq)]
pub enum CuckooCraftError {
    /// Filter parameters don't satisfy a structural constraint.
    InvalidParameters {
        /// Human-readable description of what's invalid.
        message: String,
    },

    /// False positive probability out of the supported range (0, 0.25).
    ///
    /// Rates at or above 0.25 produce fingerprints too short to sustain the
    /// design load factor; rates at or below zero are meaningless.
    FalsePositiveRateOutOfBounds {
        /// The invalid false positive probability that was provided.
        fpp: f64,
    },

    /// Expected key count is too small to build a table around.
    InvalidMaxKeys {
        /// The invalid key count that was provided.
        max_keys: u64,
    },

    /// Expected concurrency must be a positive power of two.
    ///
    /// The segment count is `2 * expected_concurrency` and bucket indexes are
    /// mapped to segments by modulo; a non-power-of-two count would bias that
    /// mapping.
    InvalidConcurrency {
        /// The invalid concurrency that was provided.
        concurrency: usize,
    },

    /// Fingerprint width outside the supported range.
    ///
    /// Tags shorter than 5 bits cannot sustain a useful fill capacity and
    /// tags of 48 bits or more exceed what the table addressing supports.
    InvalidTagBits {
        /// The invalid tag width, in bits.
        tag_bits: usize,
    },

    /// The chosen hash algorithm is too short for the table configuration.
    ///
    /// 32- and 64-bit hash codes must cover `index_bits + tag_bits`; codes of
    /// 128 bits or more lift that coupling but still cap each part at 64 bits.
    UnsupportedHashConfiguration {
        /// Width of the hash code produced by the chosen algorithm, in bits.
        hash_bits: usize,
        /// Bits of hash consumed by the bucket index.
        index_bits: usize,
        /// Bits of hash consumed by the fingerprint.
        tag_bits: usize,
    },

    /// Serialization or deserialization failed.
    SerializationError {
        /// Description of what failed.
        message: String,
    },

    /// Internal invariant violated.
    ///
    /// This should never occur in correct usage. If it does, it indicates a
    /// bug in CuckooCraft itself.
    InternalError {
        /// Description of the invariant that was violated.
        message: String,
    },
}

impl fmt::Display for CuckooCraftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameters { message } => {
                write!(f, "Invalid Cuckoo filter parameters: {}.", message)
            }
            Self::FalsePositiveRateOutOfBounds { fpp } => {
                write!(
                    f,
                    "False positive probability {} is out of bounds. Must be in range (0, 0.25).",
                    fpp
                )
            }
            Self::InvalidMaxKeys { max_keys } => {
                write!(
                    f,
                    "Invalid max keys: {}. Expected key count must be greater than 1.",
                    max_keys
                )
            }
            Self::InvalidConcurrency { concurrency } => {
                write!(
                    f,
                    "Invalid expected concurrency: {}. Must be a positive power of two.",
                    concurrency
                )
            }
            Self::InvalidTagBits { tag_bits } => {
                write!(
                    f,
                    "Invalid tag width: {} bits. Must be greater than 4 and less than 48.",
                    tag_bits
                )
            }
            Self::UnsupportedHashConfiguration {
                hash_bits,
                index_bits,
                tag_bits,
            } => {
                write!(
                    f,
                    "Unsupported hash configuration: a {}-bit hash cannot cover {} index bits \
                     plus {} tag bits. Make the table smaller or use a longer hash.",
                    hash_bits, index_bits, tag_bits
                )
            }
            Self::SerializationError { message } => {
                write!(f, "Serialization error: {}.", message)
            }
            Self::InternalError { message } => {
                write!(
                    f,
                    "Internal error (this is a bug in CuckooCraft): {}.",
                    message
                )
            }
        }
    }
}

impl std::error::Error for CuckooCraftError {}

impl CuckooCraftError {
    /// Create an `InvalidParameters` error with a formatted message.
    #[must_use]
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Create a `FalsePositiveRateOutOfBounds` error.
    #[must_use]
    pub fn fpp_out_of_bounds(fpp: f64) -> Self {
        Self::FalsePositiveRateOutOfBounds { fpp }
    }

    /// Create an `InvalidMaxKeys` error.
    #[must_use]
    pub fn invalid_max_keys(max_keys: u64) -> Self {
        Self::InvalidMaxKeys { max_keys }
    }

    /// Create an `InvalidConcurrency` error.
    #[must_use]
    pub fn invalid_concurrency(concurrency: usize) -> Self {
        Self::InvalidConcurrency { concurrency }
    }

    /// Create an `InvalidTagBits` error.
    #[must_use]
    pub fn invalid_tag_bits(tag_bits: usize) -> Self {
        Self::InvalidTagBits { tag_bits }
    }

    /// Create an `UnsupportedHashConfiguration` error.
    #[must_use]
    pub fn unsupported_hash_configuration(
        hash_bits: usize,
        index_bits: usize,
        tag_bits: usize,
    ) -> Self {
        Self::UnsupportedHashConfiguration {
            hash_bits,
            index_bits,
            tag_bits,
        }
    }

    /// Create a `SerializationError`.
    #[must_use]
    pub fn serialization_error(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Create an `InternalError`.
    ///
    /// This should only be used for conditions that indicate bugs in
    /// CuckooCraft.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}
