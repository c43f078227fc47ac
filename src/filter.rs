//! The Cuckoo filter itself.
//!
//! See [`CuckooFilter`] for the public surface. The implementation notes
//! that matter for correctness:
//!
//! - All methods take `&self`; share a filter across threads with `Arc`.
//! - To prevent deadlocks, every path that needs both the victim lock and
//!   bucket locks takes the victim lock first; bucket segments are always
//!   locked in ascending segment order.
//! - The eviction loop never holds two segment locks at once: one for the
//!   swap, then one for the candidate reinsertion.

use crate::builder::CuckooFilterBuilder;
use crate::core::index::{BucketAndTag, IndexTagCalc};
use crate::core::params::BUCKET_SIZE;
use crate::core::table::BucketTable;
use crate::hash::{Algorithm, Funnel};
use crate::sync::segments::SegmentedBucketLocker;
use crate::sync::victim::{Victim, VictimCell};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// Maximum kicks in one eviction cascade before the displaced fingerprint
/// is parked in the victim slot.
const INSERT_ATTEMPTS: usize = 500;

/// A thread-safe Cuckoo filter for items of type `T`.
///
/// Cuckoo filters answer approximate membership queries like Bloom filters
/// do, with no false negatives and a tunable false positive probability.
/// Unlike Bloom filters they also support deletion and approximate counting,
/// and they do it in less space at false positive rates below about 2%.
///
/// # Construction
///
/// Filters are created through the [builder](CuckooFilterBuilder): a
/// [`Funnel`] serializes items for hashing, `max_keys` sizes the table, and
/// false positive rate, hash algorithm and expected concurrency are
/// optional. The table size is fixed at construction; a filter that reports
/// itself full is best replaced with a larger one.
///
/// ```
/// use cuckoocraft::{CuckooFilter, U64Funnel};
///
/// let filter: CuckooFilter<u64, U64Funnel> =
///     CuckooFilter::builder(U64Funnel, 10_000).build().unwrap();
///
/// assert!(filter.put(&42));
/// assert!(filter.might_contain(&42));
/// assert!(filter.delete(&42));
/// assert!(!filter.might_contain(&42));
/// ```
///
/// # Concurrency
///
/// All operations take `&self` and are safe under true parallelism. The
/// table is split into lock segments sized from the builder's
/// `expected_concurrency`, so threads mutating disjoint regions proceed in
/// parallel:
///
/// ```
/// use cuckoocraft::{CuckooFilter, U64Funnel};
/// use std::sync::Arc;
/// use std::thread;
///
/// let filter: Arc<CuckooFilter<u64, U64Funnel>> =
///     Arc::new(CuckooFilter::builder(U64Funnel, 10_000).build().unwrap());
///
/// let handles: Vec<_> = (0..4)
///     .map(|t| {
///         let filter = Arc::clone(&filter);
///         thread::spawn(move || {
///             for i in 0..100u64 {
///                 filter.put(&(t * 100 + i));
///             }
///         })
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert_eq!(filter.count(), 400);
/// ```
///
/// # Duplicates
///
/// The same item can be stored at most `2 * 4 + 1 = 9` times: four slots in
/// each candidate bucket plus the victim slot. The tenth insertion fails.
/// Staying at seven or fewer copies is recommended; saturated buckets
/// degrade fill capacity.
///
/// # Deleting
///
/// Only delete items that were previously inserted. Deleting a never-
/// inserted item may remove another item's identical fingerprint (with
/// probability near the false positive rate), after which that other item
/// reports a false negative.
pub struct CuckooFilter<T: ?Sized, F: Funnel<T>> {
    table: BucketTable,
    hasher: IndexTagCalc<T, F>,
    count: AtomicU64,
    expected_concurrency: usize,
    victim: VictimCell,
    locker: SegmentedBucketLocker,
}

impl<T: ?Sized, F: Funnel<T>> CuckooFilter<T, F> {
    /// Start building a filter for `max_keys` items hashed through `funnel`.
    #[must_use]
    pub fn builder(funnel: F, max_keys: u64) -> CuckooFilterBuilder<T, F> {
        CuckooFilterBuilder::new(funnel, max_keys)
    }

    pub(crate) fn from_parts(
        hasher: IndexTagCalc<T, F>,
        table: BucketTable,
        count: u64,
        victim: Victim,
        expected_concurrency: usize,
    ) -> Self {
        Self {
            table,
            hasher,
            count: AtomicU64::new(count),
            expected_concurrency,
            victim: VictimCell::new(victim),
            locker: SegmentedBucketLocker::new(expected_concurrency),
        }
    }

    /// Insert an item.
    ///
    /// Returns `true` when the item is now stored, which makes every later
    /// [`might_contain`](Self::might_contain) for it return `true` until it
    /// is deleted. Returns `false` when the filter cannot take the item:
    /// both candidate buckets are full and the victim slot is already
    /// occupied. The filter should be considered full after the first
    /// failure, although deleting items makes it usable again.
    pub fn put(&self, item: &T) -> bool {
        let pos = self.hasher.generate(item);
        let i1 = pos.index;
        let i2 = self.hasher.alt_index(i1, pos.tag);
        {
            let _buckets = self.locker.lock_buckets_write(i1, i2);
            if self.table.insert_to_bucket(i1, pos.tag) || self.table.insert_to_bucket(i2, pos.tag)
            {
                self.count.fetch_add(1, Ordering::Release);
                return true;
            }
        }
        // both buckets full; refuse outright if a victim is already parked
        let mut victim = match self.victim.write_if_clear() {
            Some(guard) => guard,
            None => return false,
        };
        *victim = Victim {
            i1,
            i2,
            tag: pos.tag,
            occupied: true,
        };
        for _ in 0..=INSERT_ATTEMPTS {
            if self.try_swap_victim_into_empty_slot(&mut victim) {
                break;
            }
        }
        drop(victim);
        // whether the cascade found a slot or left an orphan parked, the
        // item is now logically in the filter
        self.count.fetch_add(1, Ordering::Release);
        true
    }

    /// One round of the eviction cascade.
    ///
    /// Kicks the parked fingerprint into a random slot of its alternate
    /// bucket, then tries to re-home the displaced fingerprint. On failure
    /// the displaced fingerprint becomes the new victim: its `i1` is the
    /// bucket it was kicked out of, so the pair stays consistent with
    /// `alt_index`.
    fn try_swap_victim_into_empty_slot(&self, victim: &mut Victim) -> bool {
        let cur = victim.i2;
        let displaced = {
            let _bucket = self.locker.lock_bucket_write(cur);
            self.table.swap_random_tag_in_bucket(cur, victim.tag)
        };
        let alt = self.hasher.alt_index(cur, displaced);
        let _bucket = self.locker.lock_bucket_write(alt);
        if self.table.insert_to_bucket(alt, displaced) {
            victim.occupied = false;
            true
        } else {
            *victim = Victim {
                i1: cur,
                i2: alt,
                tag: displaced,
                occupied: true,
            };
            false
        }
    }

    /// Query for an item.
    ///
    /// `true` means the item is *possibly* present (false positives happen
    /// at roughly the configured rate); `false` means it is definitely
    /// absent.
    pub fn might_contain(&self, item: &T) -> bool {
        let pos = self.hasher.generate(item);
        let i2 = self.hasher.alt_index(pos.index, pos.tag);
        {
            let _buckets = self.locker.lock_buckets_read(pos.index, i2);
            if self.table.find_tag(pos.index, i2, pos.tag) {
                return true;
            }
        }
        self.check_is_victim(&pos)
    }

    /// Delete one stored copy of an item.
    ///
    /// Returns `true` when a matching fingerprint was removed from either
    /// candidate bucket or from the victim slot; `false` when none was
    /// found. A successful delete also tries, best effort, to move a parked
    /// victim back into the table, since a slot just opened up.
    pub fn delete(&self, item: &T) -> bool {
        let pos = self.hasher.generate(item);
        let i1 = pos.index;
        let i2 = self.hasher.alt_index(i1, pos.tag);
        let deleted = {
            let _buckets = self.locker.lock_buckets_write(i1, i2);
            self.table.delete_from_bucket(i1, pos.tag) || self.table.delete_from_bucket(i2, pos.tag)
        };
        if deleted {
            self.count.fetch_sub(1, Ordering::Release);
            self.insert_if_victim();
            return true;
        }
        // the copy being deleted may be the parked victim itself
        let mut victim = match self.victim.write_if_set() {
            Some(guard) => guard,
            None => return false,
        };
        if victim.tag == pos.tag && (victim.i1 == pos.index || victim.i2 == pos.index) {
            victim.occupied = false;
            drop(victim);
            self.count.fetch_sub(1, Ordering::Release);
            true
        } else {
            false
        }
    }

    /// Re-home the parked victim if one exists.
    ///
    /// Moving the victim into the table does not change [`count`](Self::count):
    /// a parked victim is already counted as stored.
    fn insert_if_victim(&self) {
        let mut victim = match self.victim.write_if_set() {
            Some(guard) => guard,
            None => return,
        };
        let _buckets = self.locker.lock_buckets_write(victim.i1, victim.i2);
        if self.table.insert_to_bucket(victim.i1, victim.tag)
            || self.table.insert_to_bucket(victim.i2, victim.tag)
        {
            victim.occupied = false;
        }
    }

    fn check_is_victim(&self, pos: &BucketAndTag) -> bool {
        self.victim.read().matches(pos.index, pos.tag)
    }

    /// Approximate number of times an item was inserted.
    ///
    /// Never lower than the true count (assuming no deletes of never-
    /// inserted items), occasionally higher when another item shares the
    /// fingerprint, and capped at 9 by table geometry. Returns 0 exactly
    /// when [`might_contain`](Self::might_contain) would return `false`.
    #[must_use]
    pub fn approximate_count(&self, item: &T) -> usize {
        let pos = self.hasher.generate(item);
        let i2 = self.hasher.alt_index(pos.index, pos.tag);
        let mut tag_count = {
            let _buckets = self.locker.lock_buckets_read(pos.index, i2);
            self.table.count_tag(pos.index, i2, pos.tag)
        };
        if self.check_is_victim(&pos) {
            tag_count += 1;
        }
        tag_count
    }

    /// Number of items currently stored, including a parked victim.
    ///
    /// Best effort under contention: the victim-reinsertion path after a
    /// delete is not linearizable with a concurrent reader of this counter,
    /// so a momentarily stale value is possible. Do not build correctness
    /// on it; it can also exceed `max_keys` when the filter runs past its
    /// design fill.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    /// Whether the filter stores nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Fraction of table slots in use, usually within 0 to 1.
    ///
    /// Randomly distributed keys reach about 0.955 before the first
    /// insertion failure. May transiently exceed 1.0 when duplicate-heavy
    /// workloads push the count past the slot total.
    #[must_use]
    pub fn load_factor(&self) -> f64 {
        self.count() as f64 / (self.table.num_buckets() * BUCKET_SIZE as u64) as f64
    }

    /// Absolute number of fingerprint slots in the table.
    ///
    /// The filter cannot be filled to this number; see
    /// [`load_factor`](Self::load_factor) for the practical ceiling.
    #[must_use]
    pub fn actual_capacity(&self) -> u64 {
        self.table.num_buckets() * BUCKET_SIZE as u64
    }

    /// Size of the bit table in bits.
    #[must_use]
    pub fn storage_size(&self) -> u64 {
        self.table.storage_size()
    }

    /// Number of buckets in the table, always a power of two.
    #[must_use]
    pub fn num_buckets(&self) -> u64 {
        self.table.num_buckets()
    }

    /// Fingerprint width in bits.
    #[must_use]
    pub fn tag_bits(&self) -> usize {
        self.table.bits_per_tag()
    }

    /// The hash algorithm in use.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.hasher.hasher().algorithm()
    }

    /// The concurrency level the lock array was sized for.
    #[must_use]
    pub fn expected_concurrency(&self) -> usize {
        self.expected_concurrency
    }

    /// Estimated memory footprint in bytes.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.table.memory_usage() + self.locker.memory_usage() + std::mem::size_of::<Self>()
    }

    /// Snapshot of table words, count and victim, taken under the victim
    /// lock and all segment locks.
    pub(crate) fn locked_state(&self) -> (Vec<u64>, u64, Victim) {
        let victim = self.victim.read();
        let _all = self.locker.lock_all_read();
        (
            self.table.words_snapshot(),
            self.count.load(Ordering::Acquire),
            *victim,
        )
    }

    pub(crate) fn index_calc(&self) -> &IndexTagCalc<T, F> {
        &self.hasher
    }

    /// Deep, independent copy of this filter.
    ///
    /// Takes a consistent snapshot (victim lock plus every segment lock),
    /// so it blocks all writers for the duration; O(table size). The copy
    /// shares no state with the original. Note that identical operation
    /// sequences applied to both filters may still diverge afterwards,
    /// because eviction picks slots at random.
    #[must_use]
    pub fn copy(&self) -> Self
    where
        F: Clone,
    {
        let victim = self.victim.read();
        let _all = self.locker.lock_all_read();
        Self::from_parts(
            self.hasher.copy(),
            self.table.copy(),
            self.count.load(Ordering::Acquire),
            *victim,
            self.expected_concurrency,
        )
    }
}

/// Structural equality: same hasher configuration (seeds, algorithm,
/// funnel), same table contents, same count, congruent victims.
///
/// Takes a consistent snapshot of `self` (victim lock plus all segment
/// locks) and is therefore O(table size) and blocks `self`'s writers.
/// `other` is read without locks; quiesce both filters for an exact
/// comparison. The lock-array sizing (`expected_concurrency`) is a
/// performance knob, not filter state, and is ignored.
impl<T: ?Sized, F: Funnel<T>> PartialEq for CuckooFilter<T, F> {
    fn eq(&self, other: &Self) -> bool {
        let victim = self.victim.read();
        let _all = self.locker.lock_all_read();
        self.hasher == other.hasher
            && self.table == other.table
            && self.count.load(Ordering::Acquire) == other.count.load(Ordering::Acquire)
            && victim.congruent(&other.victim.snapshot())
    }
}

/// Hashes the same snapshot [`PartialEq`] compares, with the same locking
/// and cost caveats.
impl<T: ?Sized, F: Funnel<T>> Hash for CuckooFilter<T, F> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let victim = self.victim.read();
        let _all = self.locker.lock_all_read();
        let salted = self.hasher.hasher();
        salted.seed_n_salt().hash(state);
        salted.addl_sip_seed().hash(state);
        salted.algorithm().id().hash(state);
        salted.funnel_name().hash(state);
        self.table.bits_per_tag().hash(state);
        self.table.num_buckets().hash(state);
        self.table.words_snapshot().hash(state);
        self.count.load(Ordering::Acquire).hash(state);
        if victim.occupied {
            victim.i1.hash(state);
            victim.i2.hash(state);
            victim.tag.hash(state);
        }
        victim.occupied.hash(state);
    }
}

impl<T: ?Sized, F: Funnel<T>> std::fmt::Debug for CuckooFilter<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CuckooFilter")
            .field("num_buckets", &self.num_buckets())
            .field("tag_bits", &self.tag_bits())
            .field("algorithm", &self.algorithm())
            .field("expected_concurrency", &self.expected_concurrency)
            .field("count", &self.count())
            .finish_non_exhaustive()
    }
}
