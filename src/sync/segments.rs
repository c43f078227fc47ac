//! Segmented read-write locking for the bucket table.
//!
//! # Design
//!
//! The table is split by bucket index into `2 * expected_concurrency`
//! segments, each guarded by one read-write lock. The factor of two exists
//! because most operations lock two buckets, so `N` threads touch roughly
//! `2N` segments at a time. The segment of bucket `b` is
//! `b mod segment_count`; the count is a power of two so the modulo carries
//! no bias.
//!
//! # Lock Ordering
//!
//! Every multi-segment acquisition takes locks in ascending segment order,
//! which is what makes concurrent two-bucket operations deadlock-free.
//! [`lock_all_read`](SegmentedBucketLocker::lock_all_read) follows the same
//! ascending order. Callers that also hold the victim lock must acquire it
//! before any segment lock.
//!
//! # False Sharing
//!
//! Each lock is padded to a full cache line. Independent segments are
//! touched by unrelated threads, and co-resident locks would otherwise
//! bounce a shared cache line between cores on every acquisition.

use crate::util::bitops::is_power_of_two;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Cache-line size for padding (64 bytes on most modern CPUs).
const CACHE_LINE_SIZE: usize = 64;

/// Cache-line padded RwLock to prevent false sharing.
#[repr(align(64))]
struct PaddedRwLock {
    lock: RwLock<()>,
    _padding: [u8; CACHE_LINE_SIZE - std::mem::size_of::<RwLock<()>>()],
}

impl PaddedRwLock {
    fn new() -> Self {
        Self {
            lock: RwLock::new(()),
            _padding: [0; CACHE_LINE_SIZE - std::mem::size_of::<RwLock<()>>()],
        }
    }
}

/// Write guard over one or two bucket segments.
///
/// Dropping it releases whatever was acquired; release order does not
/// matter, only acquisition order does.
pub struct BucketsWriteGuard<'a> {
    _first: RwLockWriteGuard<'a, ()>,
    _second: Option<RwLockWriteGuard<'a, ()>>,
}

/// Read guard over one or two bucket segments.
pub struct BucketsReadGuard<'a> {
    _first: RwLockReadGuard<'a, ()>,
    _second: Option<RwLockReadGuard<'a, ()>>,
}

/// Array of read-write locks mapping bucket indexes to lock segments.
pub struct SegmentedBucketLocker {
    locks: Box<[PaddedRwLock]>,
    segment_count: usize,
}

impl SegmentedBucketLocker {
    /// Create a locker with `2 * expected_concurrency` segments.
    ///
    /// `expected_concurrency` must be a positive power of two; the builder
    /// and the deserializer validate this before construction.
    #[must_use]
    pub fn new(expected_concurrency: usize) -> Self {
        assert!(
            expected_concurrency > 0 && is_power_of_two(expected_concurrency as u64),
            "expected concurrency must be a positive power of two"
        );
        let segment_count = expected_concurrency * 2;
        let locks = (0..segment_count)
            .map(|_| PaddedRwLock::new())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            locks,
            segment_count,
        }
    }

    /// Number of lock segments.
    #[must_use]
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// Backing lock array size in bytes, for memory accounting.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.locks.len() * std::mem::size_of::<PaddedRwLock>()
    }

    #[inline]
    fn segment_of(&self, bucket: u64) -> usize {
        (bucket % self.segment_count as u64) as usize
    }

    /// Write-lock the segments of two buckets, lower segment first.
    ///
    /// Acquires a single lock when both buckets share a segment.
    #[must_use]
    pub fn lock_buckets_write(&self, i1: u64, i2: u64) -> BucketsWriteGuard<'_> {
        let s1 = self.segment_of(i1);
        let s2 = self.segment_of(i2);
        let (lo, hi) = if s1 <= s2 { (s1, s2) } else { (s2, s1) };
        let first = self.locks[lo].lock.write().expect("bucket lock poisoned");
        let second = if lo == hi {
            None
        } else {
            Some(self.locks[hi].lock.write().expect("bucket lock poisoned"))
        };
        BucketsWriteGuard {
            _first: first,
            _second: second,
        }
    }

    /// Read-lock the segments of two buckets, lower segment first.
    #[must_use]
    pub fn lock_buckets_read(&self, i1: u64, i2: u64) -> BucketsReadGuard<'_> {
        let s1 = self.segment_of(i1);
        let s2 = self.segment_of(i2);
        let (lo, hi) = if s1 <= s2 { (s1, s2) } else { (s2, s1) };
        let first = self.locks[lo].lock.read().expect("bucket lock poisoned");
        let second = if lo == hi {
            None
        } else {
            Some(self.locks[hi].lock.read().expect("bucket lock poisoned"))
        };
        BucketsReadGuard {
            _first: first,
            _second: second,
        }
    }

    /// Write-lock the segment of a single bucket.
    ///
    /// The eviction loop uses this to hold one segment at a time, which
    /// keeps it trivially inside the ascending-order discipline.
    #[must_use]
    pub fn lock_bucket_write(&self, bucket: u64) -> RwLockWriteGuard<'_, ()> {
        self.locks[self.segment_of(bucket)]
            .lock
            .write()
            .expect("bucket lock poisoned")
    }

    /// Read-lock every segment in ascending order.
    ///
    /// Used by equality, hashing, copying and serialization to freeze the
    /// whole table. O(segments) and blocks all writers; not for hot paths.
    #[must_use]
    pub fn lock_all_read(&self) -> Vec<RwLockReadGuard<'_, ()>> {
        self.locks
            .iter()
            .map(|padded| padded.lock.read().expect("bucket lock poisoned"))
            .collect()
    }
}

impl std::fmt::Debug for SegmentedBucketLocker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentedBucketLocker")
            .field("segment_count", &self.segment_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_segment_count_is_double_concurrency() {
        let locker = SegmentedBucketLocker::new(16);
        assert_eq!(locker.segment_count(), 32);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn test_rejects_non_power_of_two() {
        let _ = SegmentedBucketLocker::new(3);
    }

    #[test]
    fn test_cache_line_padding() {
        assert_eq!(
            std::mem::size_of::<PaddedRwLock>(),
            CACHE_LINE_SIZE,
            "PaddedRwLock must be exactly one cache line to prevent false sharing"
        );
    }

    #[test]
    fn test_same_segment_locks_once() {
        let locker = SegmentedBucketLocker::new(8);
        // buckets 3 and 19 share segment 3 of 16; a second write lock on the
        // same segment would self-deadlock if it were acquired
        let _guard = locker.lock_buckets_write(3, 19);
    }

    #[test]
    fn test_read_locks_are_shared() {
        let locker = SegmentedBucketLocker::new(8);
        let _a = locker.lock_buckets_read(1, 2);
        let _b = locker.lock_buckets_read(1, 2);
        let _all = locker.lock_all_read();
    }

    #[test]
    fn test_crossed_pair_ordering_no_deadlock() {
        // two threads lock the same segment pair in opposite argument order;
        // ascending-segment acquisition must prevent deadlock
        let locker = Arc::new(SegmentedBucketLocker::new(2));
        let mut handles = Vec::new();
        for flip in 0..2u64 {
            let locker = Arc::clone(&locker);
            handles.push(thread::spawn(move || {
                for _ in 0..10_000 {
                    let (a, b) = if flip == 0 { (1, 2) } else { (2, 1) };
                    let _guard = locker.lock_buckets_write(a, b);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_write_excludes_concurrently() {
        let locker = Arc::new(SegmentedBucketLocker::new(4));
        let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let locker = Arc::clone(&locker);
            let counter = Arc::clone(&counter);
            handles.push(thread::spawn(move || {
                for _ in 0..1_000 {
                    let _guard = locker.lock_bucket_write(5);
                    // non-atomic increment pattern under the lock
                    let seen = counter.load(std::sync::atomic::Ordering::Relaxed);
                    counter.store(seen + 1, std::sync::atomic::Ordering::Relaxed);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.load(std::sync::atomic::Ordering::Relaxed), 4_000);
    }
}
