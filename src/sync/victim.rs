//! The single-slot victim cache and its lock.
//!
//! When an eviction cascade runs out of attempts, the last displaced
//! fingerprint has no bucket to live in. Dropping it would create a false
//! negative, so it is parked in a one-element cache outside the table. At
//! most one victim exists at a time; an insertion that would need a second
//! victim is refused instead.
//!
//! The cell is guarded by a read-write lock. The occupancy flag changes
//! rarely while reads are frequent, so the two conditional-write helpers
//! first inspect the flag under a read lock and only then take the write
//! lock, re-checking after the upgrade gap because another thread may have
//! raced through it.
//!
//! Lock order: when the victim lock is held together with segment locks,
//! the victim lock is always acquired first.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// An orphaned fingerprint parked outside the table.
///
/// `i2` is always the alternate bucket of `(i1, tag)`. The fields are
/// meaningful only while `occupied` is set; a cleared victim keeps its last
/// values and they are simply stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Victim {
    /// Primary bucket index of the orphaned fingerprint.
    pub i1: u64,
    /// Alternate bucket index, `alt_index(i1, tag)`.
    pub i2: u64,
    /// The orphaned fingerprint.
    pub tag: u64,
    /// Whether a victim is currently parked here.
    pub occupied: bool,
}

impl Victim {
    /// Check whether this victim holds `tag` reachable from bucket `index`.
    ///
    /// Index comparison is order-insensitive: a query arrives with its own
    /// primary bucket, which may equal either of the victim's two buckets.
    #[must_use]
    #[inline]
    pub fn matches(&self, index: u64, tag: u64) -> bool {
        self.occupied && self.tag == tag && (index == self.i1 || index == self.i2)
    }

    /// Structural congruence for filter equality: both clear, or both
    /// holding the same tag with overlapping bucket pairs.
    #[must_use]
    pub fn congruent(&self, other: &Self) -> bool {
        if self.occupied != other.occupied {
            return false;
        }
        if !self.occupied {
            return true;
        }
        self.tag == other.tag && (self.i1 == other.i1 || self.i1 == other.i2)
    }
}

/// Lock-guarded single-slot victim cache.
#[derive(Debug)]
pub struct VictimCell {
    cell: RwLock<Victim>,
}

impl VictimCell {
    /// Create a cell holding `victim`.
    #[must_use]
    pub fn new(victim: Victim) -> Self {
        Self {
            cell: RwLock::new(victim),
        }
    }

    /// Read-lock the cell.
    #[must_use]
    pub fn read(&self) -> RwLockReadGuard<'_, Victim> {
        self.cell.read().expect("victim lock poisoned")
    }

    /// Acquire the write lock only if no victim is parked.
    ///
    /// Returns `None` when a victim is already present, in which case no
    /// lock is held on return.
    #[must_use]
    pub fn write_if_clear(&self) -> Option<RwLockWriteGuard<'_, Victim>> {
        {
            let guard = self.read();
            if guard.occupied {
                return None;
            }
        }
        // the flag may have flipped between the read unlock and here
        let guard = self.cell.write().expect("victim lock poisoned");
        if guard.occupied {
            None
        } else {
            Some(guard)
        }
    }

    /// Acquire the write lock only if a victim is parked.
    ///
    /// Symmetric to [`VictimCell::write_if_clear`].
    #[must_use]
    pub fn write_if_set(&self) -> Option<RwLockWriteGuard<'_, Victim>> {
        {
            let guard = self.read();
            if !guard.occupied {
                return None;
            }
        }
        let guard = self.cell.write().expect("victim lock poisoned");
        if guard.occupied {
            Some(guard)
        } else {
            None
        }
    }

    /// Copy out the current victim state.
    #[must_use]
    pub fn snapshot(&self) -> Victim {
        *self.read()
    }
}
