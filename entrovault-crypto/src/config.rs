//! Hashing and encryption configuration.

use serde::{Deserialize, Serialize};

use crate::cipher::BlockCipherAlgorithm;
use crate::digest::DigestAlgorithm;
use crate::encryptor::EncryptionProfile;
use crate::password::HashParams;

/// Configuration for salted password hashing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordHashConfig {
    /// Digest driving PBKDF2-HMAC.
    pub digest: DigestAlgorithm,

    /// PBKDF2 iteration count (raised to at least 100).
    pub iterations: u32,

    /// Salt length in bytes (raised to at least 8).
    pub salt_size: usize,

    /// Derived hash length in bytes (raised to at least 16).
    pub hash_size: usize,
}

impl Default for PasswordHashConfig {
    fn default() -> Self {
        let params = HashParams::default();
        Self {
            digest: DigestAlgorithm::Sha3_512,
            iterations: params.iterations,
            salt_size: params.salt_size,
            hash_size: params.hash_size,
        }
    }
}

impl PasswordHashConfig {
    pub fn params(&self) -> HashParams {
        HashParams {
            iterations: self.iterations,
            salt_size: self.salt_size,
            hash_size: self.hash_size,
        }
    }
}

/// Configuration for an entropy-composed encryptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CipherConfig {
    /// Block cipher used in CBC mode with PKCS7 padding.
    pub cipher: BlockCipherAlgorithm,

    /// Digest driving the PBKDF2 step that turns accumulated entropy into a key.
    pub kdf_digest: DigestAlgorithm,

    /// Digest used to fold entropy sources.
    pub entropy_digest: DigestAlgorithm,

    /// Whether keys are bound to this instance (ephemeral) or reproducible (durable).
    pub profile: EncryptionProfile,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            cipher: BlockCipherAlgorithm::Aes128,
            kdf_digest: DigestAlgorithm::Sha1,
            entropy_digest: DigestAlgorithm::Sha3_256,
            profile: EncryptionProfile::Durable,
        }
    }
}
