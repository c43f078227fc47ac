//! Fingerprint and bucket index derivation.
//!
//! [`IndexTagCalc`] turns one hash code per item into a `(bucket index,
//! fingerprint)` pair and derives each fingerprint's alternate bucket. The
//! layout depends on the code width:
//!
//! - 32- and 64-bit codes: the fingerprint takes the low `tag_bits`, the
//!   bucket index comes from the remaining high bits. Both must fit in the
//!   code, which bounds the table size for short hashes.
//! - codes of 128 bits and up: the fingerprint is drawn from the first 8
//!   bytes and the index from the next 8, so the two never share hash bits.
//!
//! The alternate index is `(b XOR tag * K) mod num_buckets` with `K` the
//! MurmurHash3 finalizer constant. For that mapping to be an involution
//! (`alt(alt(b, t), t) == b`, the property the whole eviction scheme rests
//! on) the bucket count must be a power of two, which construction enforces.

use crate::error::{CuckooCraftError, Result};
use crate::hash::{Funnel, SaltedHasher};
use crate::util::bitops::is_power_of_two;

/// MurmurHash3 64-bit finalizer constant, used to spread the fingerprint
/// before the XOR. The same value appears in the reference C++
/// implementation of the Cuckoo filter.
const ALT_INDEX_MULTIPLIER: u64 = 0xc4ce_b9fe_1a85_ec53;

/// The salt loop must terminate almost immediately with any non-broken hash
/// function; reaching this many attempts means the hasher is returning
/// constant or near-constant codes.
const MAX_ZERO_TAG_REHASHES: u32 = 100;

/// A bucket index together with the fingerprint stored there.
///
/// Plain value pair so the hot path never allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketAndTag {
    /// Primary bucket index.
    pub index: u64,
    /// Fingerprint, never zero.
    pub tag: u64,
}

/// Derives bucket indexes and fingerprints from item hashes.
#[derive(Debug)]
pub struct IndexTagCalc<T: ?Sized, F: Funnel<T>> {
    hasher: SaltedHasher<T, F>,
    num_buckets: u64,
    tag_bits: usize,
    hash_len: usize,
}

/// Bits of hash needed to produce a bucket index for a table of
/// `num_buckets`.
#[must_use]
pub(crate) fn index_bits_used(num_buckets: u64) -> usize {
    64 - num_buckets.leading_zeros() as usize
}

impl<T: ?Sized, F: Funnel<T>> IndexTagCalc<T, F> {
    /// Create a calculator, validating that the hasher's code width can
    /// cover the table.
    ///
    /// # Errors
    ///
    /// - [`CuckooCraftError::InvalidParameters`] if `num_buckets` is not a
    ///   power of two greater than 1
    /// - [`CuckooCraftError::InvalidTagBits`] if `tag_bits` is out of range
    /// - [`CuckooCraftError::UnsupportedHashConfiguration`] if the code is
    ///   too short for `index_bits + tag_bits`
    pub fn new(hasher: SaltedHasher<T, F>, num_buckets: u64, tag_bits: usize) -> Result<Self> {
        if !is_power_of_two(num_buckets) || num_buckets <= 1 {
            return Err(CuckooCraftError::invalid_parameters(format!(
                "num buckets {} must be a power of two greater than 1",
                num_buckets
            )));
        }
        if tag_bits == 0 || tag_bits >= 64 {
            return Err(CuckooCraftError::invalid_tag_bits(tag_bits));
        }
        let hash_len = hasher.code_bits();
        if !Self::is_configuration_supported(num_buckets, tag_bits, hash_len) {
            return Err(CuckooCraftError::unsupported_hash_configuration(
                hash_len,
                index_bits_used(num_buckets),
                tag_bits,
            ));
        }
        Ok(Self {
            hasher,
            num_buckets,
            tag_bits,
            hash_len,
        })
    }

    fn is_configuration_supported(num_buckets: u64, tag_bits: usize, hash_len: usize) -> bool {
        let bits_needed = index_bits_used(num_buckets) + tag_bits;
        match hash_len {
            32 | 64 => bits_needed <= hash_len,
            len if len >= 128 => tag_bits <= 64 && index_bits_used(num_buckets) <= 64,
            _ => false,
        }
    }

    /// Number of buckets this calculator addresses.
    #[must_use]
    #[inline]
    pub fn num_buckets(&self) -> u64 {
        self.num_buckets
    }

    /// Fingerprint width in bits.
    #[must_use]
    #[inline]
    pub fn tag_bits(&self) -> usize {
        self.tag_bits
    }

    /// The hasher feeding this calculator.
    #[must_use]
    #[inline]
    pub(crate) fn hasher(&self) -> &SaltedHasher<T, F> {
        &self.hasher
    }

    /// Derive the primary bucket index and fingerprint for an item.
    ///
    /// A zero fingerprint would be indistinguishable from an empty slot, so
    /// the item is re-hashed with increasing salts until the fingerprint is
    /// non-zero; the bucket index from the first, unsalted hash is kept
    /// either way.
    ///
    /// # Panics
    ///
    /// Asserts if the salt loop fails to produce a non-zero fingerprint
    /// after 100 attempts, which indicates a broken hash function.
    #[must_use]
    pub fn generate(&self, item: &T) -> BucketAndTag {
        match self.hash_len {
            32 => {
                let code = self.hasher.hash_item(item).as_u32();
                let index = self.bucket_index_32(code);
                let mut tag = self.tag_value_32(code);
                let mut salt = 1;
                while tag == 0 {
                    assert!(
                        salt < MAX_ZERO_TAG_REHASHES,
                        "zero-tag rehash did not converge; hash function is broken"
                    );
                    tag = self.tag_value_32(self.hasher.hash_item_with_salt(item, salt).as_u32());
                    salt += 1;
                }
                BucketAndTag { index, tag }
            }
            64 => {
                let code = self.hasher.hash_item(item).as_u64();
                let index = self.bucket_index_64(code);
                let mut tag = self.tag_value_64(code);
                let mut salt = 1;
                while tag == 0 {
                    assert!(
                        salt < MAX_ZERO_TAG_REHASHES,
                        "zero-tag rehash did not converge; hash function is broken"
                    );
                    tag = self.tag_value_64(self.hasher.hash_item_with_salt(item, salt).as_u64());
                    salt += 1;
                }
                BucketAndTag { index, tag }
            }
            _ => {
                // wide codes: fingerprint and index come from disjoint bytes
                let code = self.hasher.hash_item(item);
                let index = self.bucket_index_64(code.index_word());
                let mut tag = self.tag_value_64(code.tag_word());
                let mut salt = 1;
                while tag == 0 {
                    assert!(
                        salt < MAX_ZERO_TAG_REHASHES,
                        "zero-tag rehash did not converge; hash function is broken"
                    );
                    tag = self
                        .tag_value_64(self.hasher.hash_item_with_salt(item, salt).tag_word());
                    salt += 1;
                }
                BucketAndTag { index, tag }
            }
        }
    }

    /// Derive the alternate bucket for a fingerprint.
    ///
    /// Involution: `alt_index(alt_index(b, tag), tag) == b` whenever
    /// `num_buckets` is a power of two, so the same call moves a fingerprint
    /// in either direction.
    #[must_use]
    pub fn alt_index(&self, bucket_index: u64, tag: u64) -> u64 {
        let mut alt = (bucket_index ^ tag.wrapping_mul(ALT_INDEX_MULTIPLIER)) as i64;
        // fold negatives back into the non-negative range; complement keeps
        // the low bits invertible, plain negation would not
        if alt < 0 {
            alt = !alt;
        }
        (alt as u64) % self.num_buckets
    }

    #[inline]
    fn tag_value_32(&self, code: u32) -> u64 {
        let unused = 32 - self.tag_bits as u32;
        u64::from((code << unused) >> unused)
    }

    #[inline]
    fn bucket_index_32(&self, code: u32) -> u64 {
        u64::from(code >> self.tag_bits) % self.num_buckets
    }

    #[inline]
    fn tag_value_64(&self, code: u64) -> u64 {
        let unused = 64 - self.tag_bits as u32;
        (code << unused) >> unused
    }

    #[inline]
    fn bucket_index_64(&self, code: u64) -> u64 {
        (code >> self.tag_bits) % self.num_buckets
    }

    /// Deep copy, sharing nothing with `self`.
    #[must_use]
    pub fn copy(&self) -> Self
    where
        F: Clone,
    {
        Self {
            hasher: self.hasher.clone(),
            num_buckets: self.num_buckets,
            tag_bits: self.tag_bits,
            hash_len: self.hash_len,
        }
    }
}

impl<T: ?Sized, F: Funnel<T>> PartialEq for IndexTagCalc<T, F> {
    fn eq(&self, other: &Self) -> bool {
        self.hasher == other.hasher
            && self.num_buckets == other.num_buckets
            && self.tag_bits == other.tag_bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{Algorithm, SaltedHasher, U64Funnel};

    fn calc(
        algorithm: Algorithm,
        num_buckets: u64,
        tag_bits: usize,
    ) -> IndexTagCalc<u64, U64Funnel> {
        let hasher = SaltedHasher::with_seeds(algorithm, U64Funnel, 0xfeed_f00d, 0xdead_beef);
        IndexTagCalc::new(hasher, num_buckets, tag_bits).unwrap()
    }

    #[test]
    fn test_rejects_non_power_of_two_buckets() {
        let hasher = SaltedHasher::<u64, _>::with_seeds(Algorithm::Murmur3_32, U64Funnel, 1, 2);
        assert!(IndexTagCalc::new(hasher, 100, 8).is_err());
        let hasher = SaltedHasher::<u64, _>::with_seeds(Algorithm::Murmur3_32, U64Funnel, 1, 2);
        assert!(IndexTagCalc::new(hasher, 1, 8).is_err());
        let hasher = SaltedHasher::<u64, _>::with_seeds(Algorithm::Murmur3_32, U64Funnel, 1, 2);
        assert!(IndexTagCalc::new(hasher, 128, 8).is_ok());
    }

    #[test]
    fn test_hash_width_validation() {
        // 2^24 buckets needs 25 index bits; 25 + 8 = 33 > 32
        let hasher = SaltedHasher::<u64, _>::with_seeds(Algorithm::Murmur3_32, U64Funnel, 1, 2);
        let err = IndexTagCalc::new(hasher, 1 << 24, 8).unwrap_err();
        assert!(matches!(
            err,
            CuckooCraftError::UnsupportedHashConfiguration { hash_bits: 32, .. }
        ));

        // the same table fits a 64-bit code
        let hasher = SaltedHasher::<u64, _>::with_seeds(Algorithm::SipHash24, U64Funnel, 1, 2);
        assert!(IndexTagCalc::new(hasher, 1 << 24, 8).is_ok());

        // 64-bit code saturates too
        let hasher = SaltedHasher::<u64, _>::with_seeds(Algorithm::XxHash64, U64Funnel, 1, 2);
        assert!(IndexTagCalc::new(hasher, 1 << 56, 10).is_err());

        // wide codes cover any table this crate can allocate
        let hasher = SaltedHasher::<u64, _>::with_seeds(Algorithm::Murmur3_128, U64Funnel, 1, 2);
        assert!(IndexTagCalc::new(hasher, 1 << 56, 10).is_ok());
        let hasher = SaltedHasher::<u64, _>::with_seeds(Algorithm::Sha256, U64Funnel, 1, 2);
        assert!(IndexTagCalc::new(hasher, 1 << 56, 10).is_ok());
    }

    #[test]
    fn test_generate_bounds() {
        for algorithm in [
            Algorithm::Murmur3_32,
            Algorithm::Murmur3_128,
            Algorithm::Sha256,
            Algorithm::SipHash24,
            Algorithm::XxHash64,
        ] {
            let calc = calc(algorithm, 2048, 14);
            for item in 0..2_000u64 {
                let pos = calc.generate(&item);
                assert!(pos.index < 2048, "{algorithm:?}");
                assert_ne!(pos.tag, 0, "{algorithm:?}");
                assert!(pos.tag < (1 << 14), "{algorithm:?}");
            }
        }
    }

    #[test]
    fn test_generate_deterministic() {
        let calc = calc(Algorithm::Murmur3_128, 1024, 12);
        for item in 0..100u64 {
            assert_eq!(calc.generate(&item), calc.generate(&item));
        }
    }

    #[test]
    fn test_alt_index_involution_generated() {
        let calc = calc(Algorithm::Murmur3_32, 2048, 14);
        for item in 0..10_000u64 {
            let pos = calc.generate(&item);
            let alt = calc.alt_index(pos.index, pos.tag);
            assert!(alt < 2048);
            assert_eq!(
                calc.alt_index(alt, pos.tag),
                pos.index,
                "involution failed for item {item}"
            );
        }
    }

    #[test]
    fn test_alt_index_involution_exhaustive_tags() {
        let calc = calc(Algorithm::Murmur3_32, 256, 8);
        for bucket in 0..256u64 {
            for tag in 1..256u64 {
                let alt = calc.alt_index(bucket, tag);
                assert_eq!(calc.alt_index(alt, tag), bucket);
            }
        }
    }

    #[test]
    fn test_alt_index_spreads() {
        // the alternate buckets of a fixed bucket should not collapse onto
        // a handful of values
        let calc = calc(Algorithm::Murmur3_32, 2048, 14);
        let mut seen = std::collections::HashSet::new();
        for tag in 1..1_000u64 {
            seen.insert(calc.alt_index(17, tag));
        }
        assert!(seen.len() > 500);
    }

    #[test]
    fn test_copy_is_equal() {
        let calc = calc(Algorithm::SipHash24, 1024, 12);
        let copy = calc.copy();
        assert!(calc == copy);
        for item in 0..100u64 {
            assert_eq!(calc.generate(&item), copy.generate(&item));
        }
    }
}
