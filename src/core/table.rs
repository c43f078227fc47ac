//! Bit-packed bucket table for Cuckoo filters.
//!
//! # Layout
//!
//! The table stores `num_buckets` buckets of [`BUCKET_SIZE`] fingerprint
//! slots, each `bits_per_tag` bits wide, packed contiguously into 64-bit
//! words:
//!
//! ```text
//! bit offset of (bucket b, slot p) = (b * 4 + p) * bits_per_tag
//! ```
//!
//! A tag of zero means "empty slot". Bit offsets are 64-bit throughout; a
//! large filter's table exceeds 2³¹ bits and must still address correctly.
//! Because `bits_per_tag < 48`, a slot spans at most two words.
//!
//! # Thread Safety
//!
//! The table performs no locking of its own. Callers serialize access per
//! bucket through the segment locks (see [`crate::sync::segments`]). Storage
//! is still `AtomicU64`: neighbouring buckets in different segments can share
//! a word, so every mutation is a `fetch_or`/`fetch_and` confined to the
//! slot's own bits. `Relaxed` ordering suffices since the segment locks
//! provide all cross-thread ordering.

use crate::core::params::BUCKET_SIZE;
use crate::error::{CuckooCraftError, Result};
use rand::{thread_rng, Rng};
use std::sync::atomic::{AtomicU64, Ordering};

/// Bit-packed fixed-capacity array of 4-slot fingerprint buckets.
///
/// All operations take `&self`; exclusion per bucket is the caller's
/// responsibility. See the module docs for the storage rationale.
#[derive(Debug)]
pub struct BucketTable {
    /// Backing words. Slots are addressed by 64-bit bit offsets.
    words: Box<[AtomicU64]>,
    /// Fingerprint width in bits, `4 < bits_per_tag < 48`.
    bits_per_tag: usize,
    /// Bucket count, always a power of two at the filter level.
    num_buckets: u64,
    /// Exact table length in bits, `num_buckets * 4 * bits_per_tag`.
    num_bits: u64,
    /// `(1 << bits_per_tag) - 1`.
    tag_mask: u64,
}

impl BucketTable {
    /// Create an empty table.
    ///
    /// # Errors
    ///
    /// - [`CuckooCraftError::InvalidTagBits`] unless `4 < bits_per_tag < 48`
    /// - [`CuckooCraftError::InvalidParameters`] if `num_buckets < 2` or the
    ///   table would overflow the addressable bit range
    pub fn create(bits_per_tag: usize, num_buckets: u64) -> Result<Self> {
        if !(bits_per_tag > 4 && bits_per_tag < 48) {
            return Err(CuckooCraftError::invalid_tag_bits(bits_per_tag));
        }
        if num_buckets <= 1 {
            return Err(CuckooCraftError::invalid_parameters(format!(
                "num buckets {} must be greater than 1",
                num_buckets
            )));
        }
        let num_bits = num_buckets
            .checked_mul((BUCKET_SIZE * bits_per_tag) as u64)
            .ok_or_else(|| {
                CuckooCraftError::invalid_parameters(format!(
                    "table of {} buckets at {} bits per tag overflows the bit range",
                    num_buckets, bits_per_tag
                ))
            })?;
        let num_words = usize::try_from(num_bits / 64 + u64::from(num_bits % 64 != 0)).map_err(|_| {
            CuckooCraftError::invalid_parameters(format!(
                "table of {} bits exceeds addressable memory",
                num_bits
            ))
        })?;
        let words = (0..num_words)
            .map(|_| AtomicU64::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Ok(Self {
            words,
            bits_per_tag,
            num_buckets,
            num_bits,
            tag_mask: (1u64 << bits_per_tag) - 1,
        })
    }

    /// Rebuild a table from a word snapshot, validating the length.
    ///
    /// # Errors
    ///
    /// Everything [`BucketTable::create`] rejects, plus
    /// [`CuckooCraftError::SerializationError`] when the snapshot length does
    /// not match the dimensions.
    pub fn from_words(bits_per_tag: usize, num_buckets: u64, words: Vec<u64>) -> Result<Self> {
        let table = Self::create(bits_per_tag, num_buckets)?;
        if words.len() != table.words.len() {
            return Err(CuckooCraftError::serialization_error(format!(
                "table snapshot has {} words, expected {}",
                words.len(),
                table.words.len()
            )));
        }
        for (slot, word) in table.words.iter().zip(words) {
            slot.store(word, Ordering::Relaxed);
        }
        Ok(table)
    }

    /// Fingerprint width in bits.
    #[must_use]
    #[inline]
    pub fn bits_per_tag(&self) -> usize {
        self.bits_per_tag
    }

    /// Number of buckets.
    #[must_use]
    #[inline]
    pub fn num_buckets(&self) -> u64 {
        self.num_buckets
    }

    /// Table length in bits.
    #[must_use]
    #[inline]
    pub fn storage_size(&self) -> u64 {
        self.num_bits
    }

    /// Backing storage size in bytes, for memory accounting.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.words.len() * std::mem::size_of::<AtomicU64>()
    }

    #[inline]
    fn slot_position(&self, bucket: u64, pos: usize) -> (usize, usize) {
        debug_assert!(bucket < self.num_buckets);
        debug_assert!(pos < BUCKET_SIZE);
        let offset = (bucket * BUCKET_SIZE as u64 + pos as u64) * self.bits_per_tag as u64;
        ((offset / 64) as usize, (offset % 64) as usize)
    }

    /// Read the tag at `(bucket, pos)`.
    #[must_use]
    pub fn read_tag(&self, bucket: u64, pos: usize) -> u64 {
        let (word, shift) = self.slot_position(bucket, pos);
        let mut tag = self.words[word].load(Ordering::Relaxed) >> shift;
        if shift + self.bits_per_tag > 64 {
            tag |= self.words[word + 1].load(Ordering::Relaxed) << (64 - shift);
        }
        tag & self.tag_mask
    }

    /// Overwrite the tag at `(bucket, pos)` with `tag`.
    pub fn write_tag(&self, bucket: u64, pos: usize, tag: u64) {
        debug_assert_eq!(tag & !self.tag_mask, 0, "tag wider than the slot");
        let (word, shift) = self.slot_position(bucket, pos);
        // Clear then set, touching only this slot's bits. Other tags that
        // share the word may be mutated concurrently by their own lock
        // holders, which is why both halves are atomic RMWs.
        self.words[word].fetch_and(!(self.tag_mask << shift), Ordering::Relaxed);
        self.words[word].fetch_or(tag << shift, Ordering::Relaxed);
        if shift + self.bits_per_tag > 64 {
            let spill = 64 - shift;
            self.words[word + 1].fetch_and(!(self.tag_mask >> spill), Ordering::Relaxed);
            self.words[word + 1].fetch_or(tag >> spill, Ordering::Relaxed);
        }
    }

    /// Write `tag` into a slot known to be zero, skipping the clear pass.
    pub fn write_tag_no_clear(&self, bucket: u64, pos: usize, tag: u64) {
        debug_assert_eq!(tag & !self.tag_mask, 0, "tag wider than the slot");
        debug_assert_eq!(self.read_tag(bucket, pos), 0, "slot must be empty");
        let (word, shift) = self.slot_position(bucket, pos);
        self.words[word].fetch_or(tag << shift, Ordering::Relaxed);
        if shift + self.bits_per_tag > 64 {
            self.words[word + 1].fetch_or(tag >> (64 - shift), Ordering::Relaxed);
        }
    }

    /// Clear the slot at `(bucket, pos)` back to empty.
    pub fn delete_tag(&self, bucket: u64, pos: usize) {
        let (word, shift) = self.slot_position(bucket, pos);
        self.words[word].fetch_and(!(self.tag_mask << shift), Ordering::Relaxed);
        if shift + self.bits_per_tag > 64 {
            self.words[word + 1].fetch_and(!(self.tag_mask >> (64 - shift)), Ordering::Relaxed);
        }
    }

    /// Check whether the slot at `(bucket, pos)` holds exactly `tag`.
    #[must_use]
    #[inline]
    pub fn check_tag(&self, bucket: u64, pos: usize, tag: u64) -> bool {
        self.read_tag(bucket, pos) == tag
    }

    /// Insert `tag` into the first empty slot of `bucket`.
    ///
    /// Returns `false` when all four slots are occupied.
    pub fn insert_to_bucket(&self, bucket: u64, tag: u64) -> bool {
        for pos in 0..BUCKET_SIZE {
            if self.check_tag(bucket, pos, 0) {
                self.write_tag_no_clear(bucket, pos, tag);
                return true;
            }
        }
        false
    }

    /// Replace the tag in a uniformly random slot of `bucket` with `tag` and
    /// return the displaced tag.
    ///
    /// Used by the eviction loop once a bucket is known to be full; the
    /// caller holds the bucket's write lock, which makes the read-and-write
    /// pair atomic with respect to that bucket.
    pub fn swap_random_tag_in_bucket(&self, bucket: u64, tag: u64) -> u64 {
        let pos = thread_rng().gen_range(0..BUCKET_SIZE);
        let old = self.read_tag(bucket, pos);
        self.write_tag(bucket, pos, tag);
        old
    }

    /// Check whether `tag` occupies any of the eight slots across two
    /// buckets.
    #[must_use]
    pub fn find_tag(&self, i1: u64, i2: u64, tag: u64) -> bool {
        for pos in 0..BUCKET_SIZE {
            if self.check_tag(i1, pos, tag) || self.check_tag(i2, pos, tag) {
                return true;
            }
        }
        false
    }

    /// Delete one occurrence of `tag` from `bucket`.
    ///
    /// At most one slot is cleared per call. Returns `false` when the tag is
    /// not present.
    pub fn delete_from_bucket(&self, bucket: u64, tag: u64) -> bool {
        for pos in 0..BUCKET_SIZE {
            if self.check_tag(bucket, pos, tag) {
                self.delete_tag(bucket, pos);
                return true;
            }
        }
        false
    }

    /// Count occurrences of `tag` across two buckets, in `[0, 8]`.
    #[must_use]
    pub fn count_tag(&self, i1: u64, i2: u64, tag: u64) -> usize {
        let mut count = 0;
        for pos in 0..BUCKET_SIZE {
            if self.check_tag(i1, pos, tag) {
                count += 1;
            }
            if self.check_tag(i2, pos, tag) {
                count += 1;
            }
        }
        count
    }

    /// Snapshot the backing words.
    ///
    /// Only yields a consistent image when the caller holds every segment
    /// lock; used by equality, hashing, copying and serialization.
    #[must_use]
    pub fn words_snapshot(&self) -> Vec<u64> {
        self.words
            .iter()
            .map(|word| word.load(Ordering::Relaxed))
            .collect()
    }

    /// Deep copy of the table. Same locking requirement as
    /// [`BucketTable::words_snapshot`].
    #[must_use]
    pub fn copy(&self) -> Self {
        let words = self
            .words
            .iter()
            .map(|word| AtomicU64::new(word.load(Ordering::Relaxed)))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            words,
            bits_per_tag: self.bits_per_tag,
            num_buckets: self.num_buckets,
            num_bits: self.num_bits,
            tag_mask: self.tag_mask,
        }
    }
}

impl PartialEq for BucketTable {
    fn eq(&self, other: &Self) -> bool {
        self.bits_per_tag == other.bits_per_tag
            && self.num_buckets == other.num_buckets
            && self
                .words
                .iter()
                .zip(other.words.iter())
                .all(|(a, b)| a.load(Ordering::Relaxed) == b.load(Ordering::Relaxed))
    }
}
