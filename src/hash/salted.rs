//! Seeded, salted hashing of filter items.
//!
//! [`SaltedHasher`] binds a hash [`Algorithm`](crate::hash::Algorithm), a
//! [`Funnel`] and two randomly drawn 64-bit seeds. The seeds serve two
//! purposes: they give each filter instance an independent hash family
//! (some protection against collision attacks on non-cryptographic
//! algorithms), and they key the algorithms that support native seeding.
//! The primary seed is also appended to the fed bytes so that even unseeded
//! algorithms (SHA-256) see it.
//!
//! The salt path exists for one caller: fingerprint derivation re-hashes an
//! item with salts 1, 2, 3, … until the fingerprint comes out non-zero,
//! because the all-zeros tag is reserved for empty slots.
//!
//! Seeds are part of a filter's serialized state; a rehydrated filter hashes
//! identically to the one that was saved.

use crate::hash::{Algorithm, Funnel};
use rand::rngs::OsRng;
use rand::Rng;
use sha2::{Digest, Sha256};
use siphasher::sip::SipHasher24;
use std::hash::Hasher;
use std::io::Cursor;
use std::marker::PhantomData;
use xxhash_rust::xxh64::xxh64;

/// A hash code of 32, 64, or at least 128 bits.
///
/// Wide codes carry a 16-byte window; algorithms producing more than 128
/// bits (SHA-256) contribute their first 16 digest bytes, which is all the
/// index and tag derivation consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashCode {
    /// 32-bit code.
    W32(u32),
    /// 64-bit code.
    W64(u64),
    /// First 16 bytes of a code at least 128 bits wide.
    Wide([u8; 16]),
}

impl HashCode {
    /// The code as a 32-bit word. Only meaningful for 32-bit algorithms.
    #[must_use]
    #[inline]
    pub fn as_u32(&self) -> u32 {
        match *self {
            Self::W32(code) => code,
            Self::W64(code) => code as u32,
            Self::Wide(bytes) => u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }

    /// The code as a 64-bit word. Only meaningful for 64-bit algorithms.
    #[must_use]
    #[inline]
    pub fn as_u64(&self) -> u64 {
        match *self {
            Self::W32(code) => u64::from(code),
            Self::W64(code) => code,
            Self::Wide(bytes) => Self::word(&bytes, 0),
        }
    }

    /// First 8 bytes of a wide code, as a big-endian word. Feeds the
    /// fingerprint for 128-bit-plus algorithms.
    #[must_use]
    #[inline]
    pub fn tag_word(&self) -> u64 {
        match *self {
            Self::Wide(bytes) => Self::word(&bytes, 0),
            Self::W32(code) => u64::from(code),
            Self::W64(code) => code,
        }
    }

    /// Bytes 8..16 of a wide code, as a big-endian word. Feeds the bucket
    /// index for 128-bit-plus algorithms, keeping it in a hash segment
    /// disjoint from the fingerprint's.
    #[must_use]
    #[inline]
    pub fn index_word(&self) -> u64 {
        match *self {
            Self::Wide(bytes) => Self::word(&bytes, 8),
            Self::W32(code) => u64::from(code),
            Self::W64(code) => code,
        }
    }

    #[inline]
    fn word(bytes: &[u8; 16], start: usize) -> u64 {
        let mut word = [0u8; 8];
        word.copy_from_slice(&bytes[start..start + 8]);
        u64::from_be_bytes(word)
    }
}

/// Seeded, salted wrapper around the supported hash algorithms.
///
/// Exists because the backing algorithm crates don't set up seeds and salts
/// themselves, and because the seeds have to round-trip through serialized
/// filter state.
pub struct SaltedHasher<T: ?Sized, F: Funnel<T>> {
    /// Primary seed: appended to every hashed message and used as the
    /// algorithm seed where one exists.
    seed_n_salt: u64,
    /// Second SipHash key. Unused by the other algorithms.
    addl_sip_seed: u64,
    algorithm: Algorithm,
    funnel: F,
    _marker: PhantomData<fn(&T)>,
}

impl<T: ?Sized, F: Funnel<T>> SaltedHasher<T, F> {
    /// Create a hasher with fresh random seeds from the operating system.
    #[must_use]
    pub fn create(algorithm: Algorithm, funnel: F) -> Self {
        let mut rng = OsRng;
        Self::with_seeds(algorithm, funnel, rng.gen(), rng.gen())
    }

    /// Create a hasher choosing Murmur3 width automatically: the 32-bit
    /// variant when `hash_bits_needed` fits, the 128-bit variant otherwise.
    #[must_use]
    pub fn auto(hash_bits_needed: usize, funnel: F) -> Self {
        let algorithm = if hash_bits_needed > 32 {
            Algorithm::Murmur3_128
        } else {
            Algorithm::Murmur3_32
        };
        Self::create(algorithm, funnel)
    }

    /// Create a hasher with explicit seeds, for rehydration and copying.
    #[must_use]
    pub fn with_seeds(algorithm: Algorithm, funnel: F, seed_n_salt: u64, addl_sip_seed: u64) -> Self {
        Self {
            seed_n_salt,
            addl_sip_seed,
            algorithm,
            funnel,
            _marker: PhantomData,
        }
    }

    /// Hash an item.
    #[must_use]
    pub fn hash_item(&self, item: &T) -> HashCode {
        let mut message = Vec::with_capacity(24);
        self.funnel.feed(item, &mut message);
        message.extend_from_slice(&self.seed_n_salt.to_le_bytes());
        self.dispatch(&message)
    }

    /// Hash an item with an additional salt appended to the message.
    ///
    /// Used when the fingerprint derived from the unsalted hash is zero,
    /// which collides with the empty-slot encoding.
    #[must_use]
    pub fn hash_item_with_salt(&self, item: &T, salt: u32) -> HashCode {
        let mut message = Vec::with_capacity(28);
        self.funnel.feed(item, &mut message);
        message.extend_from_slice(&self.seed_n_salt.to_le_bytes());
        message.extend_from_slice(&salt.to_le_bytes());
        self.dispatch(&message)
    }

    fn dispatch(&self, message: &[u8]) -> HashCode {
        match self.algorithm {
            Algorithm::Murmur3_32 => {
                let code = murmur3::murmur3_32(&mut Cursor::new(message), self.seed_n_salt as u32)
                    .expect("in-memory read cannot fail");
                HashCode::W32(code)
            }
            Algorithm::Murmur3_128 => {
                let code =
                    murmur3::murmur3_x64_128(&mut Cursor::new(message), self.seed_n_salt as u32)
                        .expect("in-memory read cannot fail");
                HashCode::Wide(code.to_be_bytes())
            }
            Algorithm::Sha256 => {
                let digest = Sha256::digest(message);
                let mut window = [0u8; 16];
                window.copy_from_slice(&digest[..16]);
                HashCode::Wide(window)
            }
            Algorithm::SipHash24 => {
                let mut hasher = SipHasher24::new_with_keys(self.seed_n_salt, self.addl_sip_seed);
                hasher.write(message);
                HashCode::W64(hasher.finish())
            }
            Algorithm::XxHash64 => HashCode::W64(xxh64(message, self.seed_n_salt)),
        }
    }

    /// Width in bits of the codes this hasher produces.
    #[must_use]
    #[inline]
    pub fn code_bits(&self) -> usize {
        self.algorithm.bits()
    }

    /// The configured algorithm.
    #[must_use]
    #[inline]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Primary seed, part of serialized filter state.
    #[must_use]
    #[inline]
    pub fn seed_n_salt(&self) -> u64 {
        self.seed_n_salt
    }

    /// Secondary SipHash key, part of serialized filter state.
    #[must_use]
    #[inline]
    pub fn addl_sip_seed(&self) -> u64 {
        self.addl_sip_seed
    }

    /// Identity of the funnel this hasher feeds items through.
    #[must_use]
    #[inline]
    pub fn funnel_name(&self) -> &'static str {
        self.funnel.name()
    }
}

impl<T: ?Sized, F: Funnel<T> + Clone> Clone for SaltedHasher<T, F> {
    fn clone(&self) -> Self {
        Self {
            seed_n_salt: self.seed_n_salt,
            addl_sip_seed: self.addl_sip_seed,
            algorithm: self.algorithm,
            funnel: self.funnel.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized, F: Funnel<T>> PartialEq for SaltedHasher<T, F> {
    fn eq(&self, other: &Self) -> bool {
        self.seed_n_salt == other.seed_n_salt
            && self.addl_sip_seed == other.addl_sip_seed
            && self.algorithm == other.algorithm
            && self.funnel_name() == other.funnel_name()
    }
}

impl<T: ?Sized, F: Funnel<T>> std::fmt::Debug for SaltedHasher<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaltedHasher")
            .field("algorithm", &self.algorithm)
            .field("funnel", &self.funnel_name())
            .finish_non_exhaustive()
    }
}
