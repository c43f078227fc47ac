//! CuckooCraft: a thread-safe, serializable Cuckoo filter for Rust.
//!
//! A Cuckoo filter is a probabilistic set-membership structure in the same
//! family as Bloom filters: queries can return false positives at a tunable
//! rate, but never false negatives. Unlike Bloom filters, Cuckoo filters
//! also support **deletion** and **approximate counting**, and they use
//! less space at false positive rates below about 2%.
//!
//! # Quick Start
//!
//! ```
//! use cuckoocraft::{CuckooFilter, StrFunnel};
//!
//! // A filter for 10,000 items at a 1% false positive rate
//! let filter: CuckooFilter<str, StrFunnel> =
//!     CuckooFilter::builder(StrFunnel, 10_000).build().unwrap();
//!
//! filter.put("hello");
//! filter.put("world");
//!
//! assert!(filter.might_contain("hello"));  // possibly present
//! assert!(!filter.might_contain("bye"));   // definitely absent
//!
//! filter.delete("hello");
//! assert!(!filter.might_contain("hello"));
//! ```
//!
//! # Concurrency
//!
//! Every operation takes `&self`; wrap the filter in `Arc` and go. The
//! table is split into lock segments so writers touching disjoint regions
//! run in parallel; size the segment array with
//! [`expected_concurrency`](CuckooFilterBuilder::expected_concurrency).
//!
//! ```
//! use cuckoocraft::{CuckooFilter, U64Funnel};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let filter: Arc<CuckooFilter<u64, U64Funnel>> =
//!     Arc::new(CuckooFilter::builder(U64Funnel, 100_000).build().unwrap());
//!
//! let writer = {
//!     let filter = Arc::clone(&filter);
//!     thread::spawn(move || {
//!         for i in 0..1_000u64 {
//!             filter.put(&i);
//!         }
//!     })
//! };
//! writer.join().unwrap();
//! assert!(filter.might_contain(&999));
//! ```
//!
//! # Serialization
//!
//! Filter state round-trips through serde; locks are rebuilt on
//! deserialization. [`serde_support::CuckooFilterSerdeSupport`] wraps the
//! common bincode and JSON cases:
//!
//! ```
//! use cuckoocraft::serde_support::CuckooFilterSerdeSupport;
//! use cuckoocraft::{CuckooFilter, U64Funnel};
//!
//! let filter: CuckooFilter<u64, U64Funnel> =
//!     CuckooFilter::builder(U64Funnel, 1_000).build().unwrap();
//! filter.put(&7);
//!
//! let bytes = CuckooFilterSerdeSupport::to_bytes(&filter).unwrap();
//! let restored: CuckooFilter<u64, U64Funnel> =
//!     CuckooFilterSerdeSupport::from_bytes(&bytes).unwrap();
//! assert!(restored == filter);
//! ```
//!
//! # Hash Algorithms
//!
//! Items are serialized by a [`Funnel`] and hashed by a seeded
//! [`Algorithm`]: Murmur3 (32- or 128-bit, the default, auto-sized to the
//! table), SHA-256, SipHash-2-4 or xxHash64. All algorithms are salted per
//! filter instance; the secure ones are for workloads facing adversarial
//! keys.
//!
//! # Limits Worth Knowing
//!
//! - The table size is fixed at construction. A filter that starts
//!   refusing inserts is full; build a bigger one.
//! - The same item can be stored at most 9 times; stay at 7 or fewer.
//! - Deleting an item that was never inserted can remove another item's
//!   fingerprint and so manufacture a false negative.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::needless_range_loop)]

/// Core data structures: parameter math, the bucket table, index/tag
/// derivation.
pub mod core;

/// Error types and result alias.
pub mod error;

/// Hash algorithms, the salted hasher, and item funnels.
pub mod hash;

/// Segmented locking and the victim cell.
pub mod sync;

/// Utility functions and helpers.
pub mod util;

/// The Cuckoo filter itself.
pub mod filter;

/// Fluent filter builder.
pub mod builder;

/// Serde integration and byte/JSON helpers.
pub mod serde_support;

// Re-export the types most callers need at the crate root
pub use builder::CuckooFilterBuilder;
pub use error::{CuckooCraftError, Result};
pub use filter::CuckooFilter;
pub use hash::{Algorithm, BytesFunnel, Funnel, I64Funnel, StrFunnel, U64Funnel};

/// Prelude module for convenient imports.
///
/// # Examples
///
/// ```
/// use cuckoocraft::prelude::*;
///
/// let filter: CuckooFilter<u64, U64Funnel> =
///     CuckooFilter::builder(U64Funnel, 1_000).build().unwrap();
/// filter.put(&1);
/// assert!(filter.might_contain(&1));
/// ```
pub mod prelude {
    pub use crate::builder::CuckooFilterBuilder;
    pub use crate::error::{CuckooCraftError, Result};
    pub use crate::filter::CuckooFilter;
    pub use crate::hash::{Algorithm, BytesFunnel, Funnel, I64Funnel, StrFunnel, U64Funnel};
    pub use crate::serde_support::CuckooFilterSerdeSupport;
}
