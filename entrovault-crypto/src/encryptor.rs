//! Durable and ephemeral encryptors.
//!
//! A [`SecureEncryptor`] wraps an [`EntropyCipher`] and decides at construction
//! time which entropy it derives keys from:
//!
//! - **Durable**: only the caller's sources. Any encryptor built with the same
//!   sources, in any process, can decrypt the envelopes.
//! - **Ephemeral**: the caller's sources plus values unique to this process and
//!   this instance, and a fresh random value. Envelopes can only be decrypted by
//!   the instance that produced them.
//!
//! The ephemeral profile is meant for short-lived secrets held in memory. It
//! reduces how long plaintext sits in the heap, but anything able to read this
//! process's memory can also read the instance's entropy, so it is not a
//! confidentiality guarantee against a co-resident attacker.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cipher::{BlockCipherAlgorithm, BlockCipherEngine, EntropyCipher};
use crate::config::CipherConfig;
use crate::digest::hash_hex;
use crate::entropy::{EntropyAccumulator, EntropySource, random_bytes};
use crate::error::CryptoResult;

/// Random bytes mixed into every ephemeral instance.
const EPHEMERAL_RANDOM_LEN: usize = 32;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Whether derived keys are reproducible across instances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionProfile {
    #[default]
    Durable,
    Ephemeral,
}

impl fmt::Display for EncryptionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncryptionProfile::Durable => f.write_str("durable"),
            EncryptionProfile::Ephemeral => f.write_str("ephemeral"),
        }
    }
}

/// Entropy-composed encryptor with a durable or ephemeral key profile.
#[derive(Debug)]
pub struct SecureEncryptor<C = BlockCipherAlgorithm> {
    cipher: EntropyCipher<C>,
    profile: EncryptionProfile,
    instance_id: u64,
}

impl SecureEncryptor {
    /// AES-128 encryptor keyed only by `sources`.
    pub fn durable<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<EntropySource>,
    {
        let entropy = EntropyAccumulator::from_sources(sources);
        let instance_id = next_instance_id();
        Self::log_created(EncryptionProfile::Durable, instance_id, entropy.len());
        Self {
            cipher: EntropyCipher::new(entropy),
            profile: EncryptionProfile::Durable,
            instance_id,
        }
    }

    /// AES-128 encryptor keyed by `sources` plus process and instance entropy.
    pub fn ephemeral<I, S>(sources: I) -> CryptoResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<EntropySource>,
    {
        Self::with_profile(
            EncryptionProfile::Ephemeral,
            EntropyAccumulator::from_sources(sources),
            BlockCipherAlgorithm::Aes128,
        )
    }

    /// Builds an encryptor from a [`CipherConfig`].
    pub fn from_config<I, S>(config: &CipherConfig, sources: I) -> CryptoResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<EntropySource>,
    {
        let mut entropy = EntropyAccumulator::with_digest(config.entropy_digest);
        entropy.extend(sources);
        let mut encryptor = Self::with_profile(config.profile, entropy, config.cipher)?;
        encryptor.cipher = encryptor.cipher.with_kdf_digest(config.kdf_digest);
        Ok(encryptor)
    }
}

impl<C: BlockCipherEngine> SecureEncryptor<C> {
    /// Builds an encryptor around an injected cipher.
    pub fn with_profile(
        profile: EncryptionProfile,
        mut entropy: EntropyAccumulator,
        cipher: C,
    ) -> CryptoResult<Self> {
        let instance_id = next_instance_id();
        if profile == EncryptionProfile::Ephemeral {
            add_ephemeral_entropy(&mut entropy, instance_id)?;
        }
        Self::log_created(profile, instance_id, entropy.len());
        Ok(Self {
            cipher: EntropyCipher::with_cipher(entropy, cipher),
            profile,
            instance_id,
        })
    }

    fn log_created(profile: EncryptionProfile, instance_id: u64, sources: usize) {
        debug!(%profile, instance_id, sources, "created encryptor");
    }

    pub fn profile(&self) -> EncryptionProfile {
        self.profile
    }

    /// Process-wide unique id of this instance.
    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    pub fn cipher(&self) -> &EntropyCipher<C> {
        &self.cipher
    }

    pub fn encrypt(&self, data: &[u8], extra_entropy: Option<&[u8]>) -> CryptoResult<Vec<u8>> {
        self.cipher.encrypt(data, extra_entropy)
    }

    pub fn decrypt(&self, envelope: &[u8], extra_entropy: Option<&[u8]>) -> CryptoResult<Vec<u8>> {
        self.cipher.decrypt(envelope, extra_entropy)
    }

    pub fn encrypt_str(&self, data: &str, extra_entropy: Option<&str>) -> CryptoResult<String> {
        self.cipher.encrypt_str(data, extra_entropy)
    }

    pub fn decrypt_str(&self, encoded: &str, extra_entropy: Option<&str>) -> CryptoResult<String> {
        self.cipher.decrypt_str(encoded, extra_entropy)
    }
}

fn next_instance_id() -> u64 {
    NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Mixes process and instance identity into `entropy`.
///
/// The process id and executable name hash go in front of the caller's
/// sources; the instance identity hash, process identity hash and a random
/// value go after them.
fn add_ephemeral_entropy(entropy: &mut EntropyAccumulator, instance_id: u64) -> CryptoResult<()> {
    let digest = entropy.digest();
    let pid = std::process::id();
    let exe = std::env::current_exe()
        .ok()
        .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default();

    entropy.prepend(EntropySource::from_display(&hash_hex(&digest, exe.as_bytes())));
    entropy.prepend(EntropySource::from_display(&pid));

    let instance = format!("{pid}:{instance_id}");
    let process = format!("{pid}:{exe}");
    let random = random_bytes(EPHEMERAL_RANDOM_LEN)?;

    entropy
        .push_display(&hash_hex(&digest, instance.as_bytes()))
        .push_display(&hash_hex(&digest, process.as_bytes()))
        .push_display(&hex::encode(random.as_slice()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_adds_five_sources() {
        let encryptor = SecureEncryptor::ephemeral(["a", "b"]).unwrap();
        assert_eq!(encryptor.cipher().entropy().len(), 2 + 5);
        assert_eq!(encryptor.profile(), EncryptionProfile::Ephemeral);
    }

    #[test]
    fn durable_keeps_caller_sources() {
        let encryptor = SecureEncryptor::durable(["a", "b"]);
        assert_eq!(encryptor.cipher().entropy().len(), 2);
        assert_eq!(encryptor.profile(), EncryptionProfile::Durable);
    }

    #[test]
    fn instance_ids_are_unique() {
        let a = SecureEncryptor::durable(["x"]);
        let b = SecureEncryptor::durable(["x"]);
        assert_ne!(a.instance_id(), b.instance_id());
    }

    #[test]
    fn profile_display() {
        assert_eq!(EncryptionProfile::Durable.to_string(), "durable");
        assert_eq!(EncryptionProfile::Ephemeral.to_string(), "ephemeral");
    }
}
