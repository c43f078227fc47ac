//! Fluent builder for [`CuckooFilter`].
//!
//! Two parameters are required up front: the [`Funnel`] that serializes
//! items for hashing, and `max_keys`, the number of keys the filter should
//! hold before insertion failure. Everything else has defaults:
//!
//! | Parameter              | Default                                 |
//! |------------------------|-----------------------------------------|
//! | `false_positive_rate`  | 0.01                                    |
//! | `hash_algorithm`       | Murmur3, width picked to fit the table  |
//! | `expected_concurrency` | 16                                      |
//!
//! All validation happens in [`build`](CuckooFilterBuilder::build); invalid
//! configurations produce a typed [`CuckooCraftError`] and no filter.
//!
//! # Examples
//!
//! ```
//! use cuckoocraft::{Algorithm, CuckooFilter, CuckooFilterBuilder, U64Funnel};
//!
//! let filter: CuckooFilter<u64, U64Funnel> = CuckooFilterBuilder::new(U64Funnel, 100_000)
//!     .false_positive_rate(0.001)
//!     .hash_algorithm(Algorithm::SipHash24)
//!     .expected_concurrency(32)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(filter.algorithm(), Algorithm::SipHash24);
//! ```

use crate::core::index::{index_bits_used, IndexTagCalc};
use crate::core::params::{
    buckets_needed, tag_bits_for_fpp, DEFAULT_CONCURRENCY, DEFAULT_FPP,
};
use crate::core::table::BucketTable;
use crate::error::{CuckooCraftError, Result};
use crate::filter::CuckooFilter;
use crate::hash::{Algorithm, Funnel, SaltedHasher};
use crate::sync::victim::Victim;
use crate::util::bitops::is_power_of_two;
use std::marker::PhantomData;

/// Builder for [`CuckooFilter`]; see the [module docs](self).
pub struct CuckooFilterBuilder<T: ?Sized, F: Funnel<T>> {
    funnel: F,
    max_keys: u64,
    fpp: f64,
    algorithm: Option<Algorithm>,
    expected_concurrency: usize,
    _marker: PhantomData<fn(&T)>,
}

impl<T: ?Sized, F: Funnel<T>> CuckooFilterBuilder<T, F> {
    /// Start a builder for a filter of `max_keys` items hashed through
    /// `funnel`.
    ///
    /// Overflowing a filter with noticeably more keys than `max_keys`
    /// results in insertion failure, so size generously.
    #[must_use]
    pub fn new(funnel: F, max_keys: u64) -> Self {
        Self {
            funnel,
            max_keys,
            fpp: DEFAULT_FPP,
            algorithm: None,
            expected_concurrency: DEFAULT_CONCURRENCY,
            _marker: PhantomData,
        }
    }

    /// Set the false positive probability. The default is 1%.
    ///
    /// Must lie in (0, 0.25). Unrealistically small values fail at
    /// [`build`](Self::build) once the implied fingerprint no longer fits
    /// the table addressing; values of 0.1 and up fail because the implied
    /// fingerprint is too short to sustain the design load factor.
    #[must_use]
    pub fn false_positive_rate(mut self, fpp: f64) -> Self {
        self.fpp = fpp;
        self
    }

    /// Pin the hash algorithm instead of letting the builder choose.
    ///
    /// By default the builder uses Murmur3 and picks the 32- or 128-bit
    /// variant based on how many hash bits the table needs. Pinning a short
    /// algorithm caps the table size; with a 32-bit hash roughly 270 MB of
    /// table, with 64-bit hashes a few orders of magnitude more. Oversized
    /// configurations fail at [`build`](Self::build).
    #[must_use]
    pub fn hash_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Set the number of threads expected to access the filter
    /// concurrently. The default is 16.
    ///
    /// Must be a positive power of two. Overestimating is cheap (each unit
    /// buys two cache-line-sized locks); underestimating serializes writers
    /// that would otherwise proceed in parallel. Any value within an order
    /// of magnitude of the real thread count works fine.
    #[must_use]
    pub fn expected_concurrency(mut self, expected_concurrency: usize) -> Self {
        self.expected_concurrency = expected_concurrency;
        self
    }

    /// Validate the configuration and build the filter.
    ///
    /// # Errors
    ///
    /// - [`CuckooCraftError::InvalidMaxKeys`] if `max_keys <= 1`
    /// - [`CuckooCraftError::FalsePositiveRateOutOfBounds`] if the rate is
    ///   outside (0, 0.25)
    /// - [`CuckooCraftError::InvalidConcurrency`] if the concurrency is not
    ///   a positive power of two
    /// - [`CuckooCraftError::InvalidTagBits`] if the implied fingerprint
    ///   width leaves the supported range
    /// - [`CuckooCraftError::UnsupportedHashConfiguration`] if the chosen
    ///   algorithm is too short for the table
    pub fn build(self) -> Result<CuckooFilter<T, F>> {
        if self.expected_concurrency == 0 || !is_power_of_two(self.expected_concurrency as u64) {
            return Err(CuckooCraftError::invalid_concurrency(
                self.expected_concurrency,
            ));
        }
        let tag_bits = tag_bits_for_fpp(self.fpp)?;
        let num_buckets = buckets_needed(self.max_keys)?;
        let hasher = match self.algorithm {
            Some(algorithm) => SaltedHasher::create(algorithm, self.funnel),
            None => SaltedHasher::auto(index_bits_used(num_buckets) + tag_bits, self.funnel),
        };
        // hash-width validation runs before the table allocates
        let hasher = IndexTagCalc::new(hasher, num_buckets, tag_bits)?;
        let table = BucketTable::create(tag_bits, num_buckets)?;
        Ok(CuckooFilter::from_parts(
            hasher,
            table,
            0,
            Victim::default(),
            self.expected_concurrency,
        ))
    }
}

impl<T: ?Sized, F: Funnel<T> + std::fmt::Debug> std::fmt::Debug for CuckooFilterBuilder<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CuckooFilterBuilder")
            .field("funnel", &self.funnel)
            .field("max_keys", &self.max_keys)
            .field("fpp", &self.fpp)
            .field("algorithm", &self.algorithm)
            .field("expected_concurrency", &self.expected_concurrency)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::U64Funnel;

    #[test]
    fn test_defaults() {
        let filter: CuckooFilter<u64, U64Funnel> =
            CuckooFilterBuilder::new(U64Funnel, 130_000).build().unwrap();
        assert_eq!(filter.num_buckets(), 65_536);
        assert_eq!(filter.tag_bits(), 8); // fpp 0.01
        assert_eq!(filter.expected_concurrency(), 16);
        // 17 index bits + 8 tag bits fit the 32-bit default
        assert_eq!(filter.algorithm(), Algorithm::Murmur3_32);
    }

    #[test]
    fn test_auto_algorithm_widens_when_bits_run_out() {
        // a long fingerprint pushes index + tag bits past 32
        let filter: CuckooFilter<u64, U64Funnel> =
            CuckooFilterBuilder::new(U64Funnel, 10_000)
                .false_positive_rate(0.000_000_1)
                .build()
                .unwrap();
        assert_eq!(filter.algorithm(), Algorithm::Murmur3_128);
    }

    #[test]
    fn test_rejects_max_keys_at_most_one() {
        assert!(matches!(
            CuckooFilterBuilder::<u64, _>::new(U64Funnel, 1).build(),
            Err(CuckooCraftError::InvalidMaxKeys { max_keys: 1 })
        ));
        assert!(CuckooFilterBuilder::<u64, _>::new(U64Funnel, 0)
            .build()
            .is_err());
    }

    #[test]
    fn test_rejects_fpp_out_of_range() {
        for fpp in [0.0, -1.0, 0.25, 0.5, 1.0] {
            let result = CuckooFilterBuilder::<u64, _>::new(U64Funnel, 1_000)
                .false_positive_rate(fpp)
                .build();
            assert!(
                matches!(
                    result,
                    Err(CuckooCraftError::FalsePositiveRateOutOfBounds { .. })
                ),
                "fpp {fpp}"
            );
        }
    }

    #[test]
    fn test_rejects_fpp_with_too_short_fingerprint() {
        // 0.2 is inside (0, 0.25) but implies a 4-bit fingerprint
        let result = CuckooFilterBuilder::<u64, _>::new(U64Funnel, 1_000)
            .false_positive_rate(0.2)
            .build();
        assert!(matches!(
            result,
            Err(CuckooCraftError::InvalidTagBits { tag_bits: 4 })
        ));
    }

    #[test]
    fn test_rejects_bad_concurrency() {
        for concurrency in [0, 3, 12, 100] {
            let result = CuckooFilterBuilder::<u64, _>::new(U64Funnel, 1_000)
                .expected_concurrency(concurrency)
                .build();
            assert!(
                matches!(result, Err(CuckooCraftError::InvalidConcurrency { .. })),
                "concurrency {concurrency}"
            );
        }
    }

    #[test]
    fn test_rejects_hash_too_short_for_table() {
        // ~300M keys need 2^27 buckets: 28 index bits + 8 tag bits > 32
        let result = CuckooFilterBuilder::<u64, _>::new(U64Funnel, 300_000_000)
            .hash_algorithm(Algorithm::Murmur3_32)
            .build();
        assert!(matches!(
            result,
            Err(CuckooCraftError::UnsupportedHashConfiguration { hash_bits: 32, .. })
        ));
    }

    #[test]
    fn test_every_algorithm_builds() {
        for algorithm in [
            Algorithm::Murmur3_32,
            Algorithm::Murmur3_128,
            Algorithm::Sha256,
            Algorithm::SipHash24,
            Algorithm::XxHash64,
        ] {
            let filter: CuckooFilter<u64, U64Funnel> =
                CuckooFilterBuilder::new(U64Funnel, 10_000)
                    .hash_algorithm(algorithm)
                    .build()
                    .unwrap();
            assert_eq!(filter.algorithm(), algorithm);
            assert!(filter.put(&1));
            assert!(filter.might_contain(&1));
        }
    }
}
