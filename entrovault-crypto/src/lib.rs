//! Entropy-composed encryption and salted password hashing for Entrovault.
//!
//! Provides:
//! - Salted PBKDF2-HMAC password hashing over a pluggable digest (SHA3-512 by default)
//! - Symmetric encryption whose key is derived from an ordered list of entropy sources
//! - Durable and ephemeral encryptors built on top of that cipher
//!
//! # Architecture
//!
//! Every envelope is keyed from two tiers of input:
//!
//! 1. **Entropy**: the caller's sources (plus optional per-call extra entropy)
//!    are folded into a single digest. Nothing about the entropy is stored.
//!
//! 2. **Per-envelope salt and IV**: a fresh random salt turns the folded
//!    entropy into a key with PBKDF2, and a fresh IV drives CBC mode. Both are
//!    stored in front of the ciphertext as `salt || iv || ciphertext`.
//!
//! Decrypting needs the same sources in the same order and the same extra
//! entropy. The envelope is not authenticated: a wrong key or a tampered
//! envelope fails with [`CryptoError::Decryption`] in most cases, but is not
//! guaranteed to be detected.

pub mod cipher;
pub mod config;
pub mod digest;
pub mod encryptor;
pub mod entropy;
mod error;
pub mod password;

pub use cipher::{
    BlockCipherAlgorithm, BlockCipherEngine, CipherEnvelope, EntropyCipher, KDF_ITERATIONS,
};
pub use config::{CipherConfig, PasswordHashConfig};
pub use digest::{DigestAlgorithm, DigestEngine, hash_hex};
pub use encryptor::{EncryptionProfile, SecureEncryptor};
pub use entropy::{EntropyAccumulator, EntropySource};
pub use error::{CryptoError, CryptoResult};
pub use password::{HashParams, PasswordHasher, SaltedHash, constant_time_eq};
