//! Hash algorithms and item serialization.
//!
//! # Module Structure
//!
//! ```text
//! hash/
//! ├── funnel.rs  - Funnel trait: item -> bytes
//! ├── salted.rs  - SaltedHasher: seeded, salted algorithm dispatch
//! └── mod.rs     - This file (Algorithm enum, public API)
//! ```
//!
//! # Choosing an Algorithm
//!
//! | Algorithm     | Code width | Notes                                      |
//! |---------------|------------|--------------------------------------------|
//! | `Murmur3_32`  | 32         | Default for small tables; fastest          |
//! | `Murmur3_128` | 128        | Default for large tables                   |
//! | `Sha256`      | 256        | Cryptographic; slow                        |
//! | `SipHash24`   | 64         | Keyed, resistant to hash flooding          |
//! | `XxHash64`    | 64         | Very fast, high quality                    |
//!
//! A 32-bit code limits the table: bucket index bits plus fingerprint bits
//! must fit in the code, so the builder rejects configurations the chosen
//! algorithm cannot cover. 128-bit-plus codes have no practical table size
//! limit. The default is Murmur3 with the width picked automatically.

pub mod funnel;
pub mod salted;

pub use funnel::{BytesFunnel, Funnel, I64Funnel, StrFunnel, U64Funnel};
pub use salted::{HashCode, SaltedHasher};

use crate::error::{CuckooCraftError, Result};

/// The hashing algorithm used internally by a filter.
///
/// Identifiers are stable across versions and appear in serialized filter
/// state; the discriminants must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// MurmurHash3, 32-bit variant. The default for tables it can cover.
    Murmur3_32,
    /// MurmurHash3, x64 128-bit variant. The default for larger tables.
    Murmur3_128,
    /// SHA-256. Cryptographically secure and correspondingly slow; the
    /// derivation consumes the first 128 bits of the digest.
    Sha256,
    /// SipHash-2-4, keyed with both filter seeds.
    SipHash24,
    /// xxHash, 64-bit variant.
    XxHash64,
}

impl Algorithm {
    /// Stable wire identifier of this algorithm.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Murmur3_32 => 0,
            Self::Murmur3_128 => 1,
            Self::Sha256 => 2,
            Self::SipHash24 => 3,
            Self::XxHash64 => 4,
        }
    }

    /// Look an algorithm up by its wire identifier.
    ///
    /// # Errors
    ///
    /// [`CuckooCraftError::SerializationError`] for unknown identifiers.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Self::Murmur3_32),
            1 => Ok(Self::Murmur3_128),
            2 => Ok(Self::Sha256),
            3 => Ok(Self::SipHash24),
            4 => Ok(Self::XxHash64),
            other => Err(CuckooCraftError::serialization_error(format!(
                "unknown hash algorithm id {}",
                other
            ))),
        }
    }

    /// Width in bits of the codes this algorithm produces.
    #[must_use]
    pub const fn bits(self) -> usize {
        match self {
            Self::Murmur3_32 => 32,
            Self::Murmur3_128 => 128,
            Self::Sha256 => 256,
            Self::SipHash24 => 64,
            Self::XxHash64 => 64,
        }
    }

    /// Human-readable name of this algorithm.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Murmur3_32 => "Murmur3_32",
            Self::Murmur3_128 => "Murmur3_128",
            Self::Sha256 => "Sha256",
            Self::SipHash24 => "SipHash24",
            Self::XxHash64 => "XxHash64",
        }
    }
}
