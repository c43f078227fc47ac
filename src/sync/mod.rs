//! Concurrency primitives: segmented bucket locking and the victim cell.
//!
//! Two global lock orders keep the filter deadlock-free:
//!
//! 1. Multi-segment acquisitions always proceed in ascending segment order.
//! 2. When the victim lock composes with segment locks, the victim lock
//!    comes first.
//!
//! Both are enforced structurally: the locker only exposes ordered
//! acquisition, and every filter path that touches the victim takes it
//! before any bucket.

pub mod segments;
pub mod victim;

pub use segments::{BucketsReadGuard, BucketsWriteGuard, SegmentedBucketLocker};
pub use victim::{Victim, VictimCell};
