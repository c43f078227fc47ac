//! Item serialization for hashing.
//!
//! Hash algorithms in this crate operate on byte slices, which keeps the
//! choice of serialization explicit and the hash output stable across
//! processes and program versions. A [`Funnel`] turns an item into those
//! bytes.
//!
//! Rust's `Hash` trait is deliberately *not* used here: its output is only
//! specified within a single process, and a filter that has been serialized
//! must answer the same queries after rehydration, possibly in a different
//! build of the program.
//!
//! # Writing a Funnel
//!
//! ```
//! use cuckoocraft::hash::Funnel;
//!
//! #[derive(Default, Clone, Copy)]
//! struct UserFunnel;
//!
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! impl Funnel<User> for UserFunnel {
//!     fn feed(&self, item: &User, sink: &mut Vec<u8>) {
//!         sink.extend_from_slice(&item.id.to_le_bytes());
//!         sink.extend_from_slice(item.name.as_bytes());
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "example.funnel.user"
//!     }
//! }
//! ```

/// Strategy for converting items into the bytes that get hashed.
///
/// Implementations must be deterministic: the same item must always produce
/// the same bytes, across processes and versions, or a rehydrated filter
/// will silently stop recognizing its own contents.
///
/// [`Funnel::name`] identifies the funnel in serialized filter state; two
/// funnels with the same name are assumed to produce identical bytes for
/// identical items.
pub trait Funnel<T: ?Sized>: Send + Sync {
    /// Append the item's byte representation to `sink`.
    fn feed(&self, item: &T, sink: &mut Vec<u8>);

    /// Stable identity of this funnel, recorded in serialized filters and
    /// compared on deserialization.
    fn name(&self) -> &'static str;
}

/// Funnel for `u64` keys, little-endian.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct U64Funnel;

impl Funnel<u64> for U64Funnel {
    #[inline]
    fn feed(&self, item: &u64, sink: &mut Vec<u8>) {
        sink.extend_from_slice(&item.to_le_bytes());
    }

    fn name(&self) -> &'static str {
        "cuckoocraft.funnel.u64"
    }
}

/// Funnel for `i64` keys, little-endian.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct I64Funnel;

impl Funnel<i64> for I64Funnel {
    #[inline]
    fn feed(&self, item: &i64, sink: &mut Vec<u8>) {
        sink.extend_from_slice(&item.to_le_bytes());
    }

    fn name(&self) -> &'static str {
        "cuckoocraft.funnel.i64"
    }
}

/// Funnel for string keys, UTF-8 bytes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StrFunnel;

impl Funnel<str> for StrFunnel {
    #[inline]
    fn feed(&self, item: &str, sink: &mut Vec<u8>) {
        sink.extend_from_slice(item.as_bytes());
    }

    fn name(&self) -> &'static str {
        "cuckoocraft.funnel.str"
    }
}

impl Funnel<String> for StrFunnel {
    #[inline]
    fn feed(&self, item: &String, sink: &mut Vec<u8>) {
        sink.extend_from_slice(item.as_bytes());
    }

    fn name(&self) -> &'static str {
        "cuckoocraft.funnel.str"
    }
}

/// Funnel for raw byte keys.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BytesFunnel;

impl Funnel<[u8]> for BytesFunnel {
    #[inline]
    fn feed(&self, item: &[u8], sink: &mut Vec<u8>) {
        sink.extend_from_slice(item);
    }

    fn name(&self) -> &'static str {
        "cuckoocraft.funnel.bytes"
    }
}

impl Funnel<Vec<u8>> for BytesFunnel {
    #[inline]
    fn feed(&self, item: &Vec<u8>, sink: &mut Vec<u8>) {
        sink.extend_from_slice(item);
    }

    fn name(&self) -> &'static str {
        "cuckoocraft.funnel.bytes"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fed<T: ?Sized, F: Funnel<T>>(funnel: &F, item: &T) -> Vec<u8> {
        let mut sink = Vec::new();
        funnel.feed(item, &mut sink);
        sink
    }

    #[test]
    fn test_u64_funnel_deterministic() {
        assert_eq!(fed(&U64Funnel, &42u64), fed(&U64Funnel, &42u64));
        assert_ne!(fed(&U64Funnel, &42u64), fed(&U64Funnel, &43u64));
        assert_eq!(fed(&U64Funnel, &1u64), vec![1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_str_funnel_matches_string_funnel() {
        let s = String::from("cuckoo");
        assert_eq!(fed(&StrFunnel, s.as_str()), fed(&StrFunnel, &s));
    }

    #[test]
    fn test_bytes_funnel_identity() {
        let data = [1u8, 2, 3];
        assert_eq!(fed(&BytesFunnel, &data[..]), data.to_vec());
    }

    #[test]
    fn test_funnel_names_distinct() {
        let names = [
            Funnel::<u64>::name(&U64Funnel),
            Funnel::<i64>::name(&I64Funnel),
            Funnel::<str>::name(&StrFunnel),
            Funnel::<[u8]>::name(&BytesFunnel),
        ];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
