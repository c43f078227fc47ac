//! Serialization support for [`CuckooFilter`].
//!
//! # Format
//!
//! The serialized state is everything needed to reconstruct a filter that
//! answers queries identically to the saved one:
//!
//! - format version (for compatibility checking)
//! - table dimensions (`tag_bits`, `num_buckets`) and the word array
//! - hashing identity: algorithm id, both seeds, and the funnel name
//! - `count`, the victim triple and its occupancy flag
//! - `expected_concurrency`, from which the lock array is rebuilt
//!
//! Locks are never serialized. Deserialization re-validates every parameter
//! through the same paths construction uses, and rejects state written with
//! a different funnel or an unknown algorithm, since either would silently
//! produce wrong answers.
//!
//! # Examples
//!
//! ```
//! use cuckoocraft::serde_support::CuckooFilterSerdeSupport;
//! use cuckoocraft::{CuckooFilter, U64Funnel};
//!
//! let filter: CuckooFilter<u64, U64Funnel> =
//!     CuckooFilter::builder(U64Funnel, 10_000).build().unwrap();
//! filter.put(&42);
//!
//! let bytes = CuckooFilterSerdeSupport::to_bytes(&filter).unwrap();
//! let restored: CuckooFilter<u64, U64Funnel> =
//!     CuckooFilterSerdeSupport::from_bytes(&bytes).unwrap();
//!
//! assert!(restored == filter);
//! assert!(restored.might_contain(&42));
//! ```

use crate::core::index::IndexTagCalc;
use crate::core::table::BucketTable;
use crate::error::{CuckooCraftError, Result};
use crate::filter::CuckooFilter;
use crate::hash::{Algorithm, Funnel, SaltedHasher};
use crate::sync::victim::Victim;
use crate::util::bitops::is_power_of_two;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Serialization format version for compatibility checking.
const SERIALIZATION_VERSION: u16 = 1;

/// Intermediate serialization format for [`CuckooFilter`].
#[derive(Debug, Serialize, Deserialize)]
struct CuckooFilterSerde {
    /// Format version.
    version: u16,

    /// Fingerprint width in bits.
    tag_bits: u32,

    /// Bucket count, a power of two.
    num_buckets: u64,

    /// Lock-array sizing; locks themselves are rebuilt on deserialize.
    expected_concurrency: u32,

    /// Stable algorithm identifier.
    algorithm: u8,

    /// Primary hash seed.
    seed_n_salt: u64,

    /// Secondary SipHash key.
    addl_sip_seed: u64,

    /// Funnel identity, validated against the deserializing type.
    funnel_name: String,

    /// The bit table as 64-bit words.
    words: Vec<u64>,

    /// Stored item count, including a parked victim.
    count: u64,

    /// Whether a victim is parked.
    has_victim: bool,

    /// Victim primary bucket (meaningful only when `has_victim`).
    victim_i1: u64,

    /// Victim alternate bucket (meaningful only when `has_victim`).
    victim_i2: u64,

    /// Victim fingerprint (meaningful only when `has_victim`).
    victim_tag: u64,
}

impl<T: ?Sized, F: Funnel<T>> Serialize for CuckooFilter<T, F> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let (words, count, victim) = self.locked_state();
        let salted = self.index_calc().hasher();
        let data = CuckooFilterSerde {
            version: SERIALIZATION_VERSION,
            tag_bits: self.tag_bits() as u32,
            num_buckets: self.num_buckets(),
            expected_concurrency: self.expected_concurrency() as u32,
            algorithm: salted.algorithm().id(),
            seed_n_salt: salted.seed_n_salt(),
            addl_sip_seed: salted.addl_sip_seed(),
            funnel_name: salted.funnel_name().to_string(),
            words,
            count,
            has_victim: victim.occupied,
            victim_i1: victim.i1,
            victim_i2: victim.i2,
            victim_tag: victim.tag,
        };
        data.serialize(serializer)
    }
}

impl<'de, T: ?Sized, F: Funnel<T> + Default> Deserialize<'de> for CuckooFilter<T, F> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        let data = CuckooFilterSerde::deserialize(deserializer)?;

        if data.version != SERIALIZATION_VERSION {
            return Err(D::Error::custom(format!(
                "unsupported serialization version: expected {}, got {}",
                SERIALIZATION_VERSION, data.version
            )));
        }

        let funnel = F::default();
        if data.funnel_name != funnel.name() {
            return Err(D::Error::custom(format!(
                "funnel mismatch: filter was serialized with '{}' but deserializing with '{}'",
                data.funnel_name,
                funnel.name()
            )));
        }

        let concurrency = data.expected_concurrency as usize;
        if concurrency == 0 || !is_power_of_two(concurrency as u64) {
            return Err(D::Error::custom(
                CuckooCraftError::invalid_concurrency(concurrency).to_string(),
            ));
        }

        let algorithm = Algorithm::from_id(data.algorithm).map_err(D::Error::custom)?;
        let hasher = SaltedHasher::with_seeds(
            algorithm,
            funnel,
            data.seed_n_salt,
            data.addl_sip_seed,
        );
        let hasher = IndexTagCalc::new(hasher, data.num_buckets, data.tag_bits as usize)
            .map_err(D::Error::custom)?;
        let table = BucketTable::from_words(data.tag_bits as usize, data.num_buckets, data.words)
            .map_err(D::Error::custom)?;
        let victim = Victim {
            i1: data.victim_i1,
            i2: data.victim_i2,
            tag: data.victim_tag,
            occupied: data.has_victim,
        };
        Ok(CuckooFilter::from_parts(
            hasher,
            table,
            data.count,
            victim,
            concurrency,
        ))
    }
}

/// Helper functions for bincode and JSON round-trips.
pub struct CuckooFilterSerdeSupport;

impl CuckooFilterSerdeSupport {
    /// Serialize a filter to bytes using bincode.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes<T: ?Sized, F: Funnel<T>>(filter: &CuckooFilter<T, F>) -> Result<Vec<u8>> {
        bincode::serialize(filter).map_err(|e| {
            CuckooCraftError::serialization_error(format!("bincode serialization failed: {}", e))
        })
    }

    /// Deserialize a filter from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed input, version mismatch, funnel
    /// mismatch or invalid parameters.
    pub fn from_bytes<T: ?Sized, F: Funnel<T> + Default>(
        bytes: &[u8],
    ) -> Result<CuckooFilter<T, F>> {
        bincode::deserialize(bytes).map_err(|e| {
            CuckooCraftError::serialization_error(format!("bincode deserialization failed: {}", e))
        })
    }

    /// Serialize a filter to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json<T: ?Sized, F: Funnel<T>>(filter: &CuckooFilter<T, F>) -> Result<String> {
        serde_json::to_string(filter).map_err(|e| {
            CuckooCraftError::serialization_error(format!("JSON serialization failed: {}", e))
        })
    }

    /// Deserialize a filter from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed input, version mismatch, funnel
    /// mismatch or invalid parameters.
    pub fn from_json<T: ?Sized, F: Funnel<T> + Default>(json: &str) -> Result<CuckooFilter<T, F>> {
        serde_json::from_str(json).map_err(|e| {
            CuckooCraftError::serialization_error(format!("JSON deserialization failed: {}", e))
        })
    }
}
