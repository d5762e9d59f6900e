//! Entropy-composed symmetric encryption.
//!
//! The working key is never supplied directly. It is derived with PBKDF2 from
//! the accumulated entropy hash and a fresh salt, and every envelope carries its
//! own salt and IV:
//!
//! ```text
//! salt (N bytes) || iv (N bytes) || CBC/PKCS7 ciphertext
//! ```
//!
//! `N` is the block size of the cipher. There is no authentication tag, so the
//! only integrity signal is the incidental padding check on decryption.

use std::fmt;
use std::str::FromStr;

use aes::{Aes128, Aes192, Aes256};
use base64::{Engine, engine::general_purpose::STANDARD};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use des::{Des, TdesEde3};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::digest::{DigestAlgorithm, DigestEngine};
use crate::entropy::{EntropyAccumulator, random_bytes};
use crate::error::{CryptoError, CryptoResult};

/// PBKDF2 rounds used to turn the entropy hash into a working key.
pub const KDF_ITERATIONS: u32 = 1000;

/// A block cipher used in CBC mode with PKCS7 padding.
pub trait BlockCipherEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Key length in bytes.
    fn key_size(&self) -> usize;

    /// Length in bytes of both the envelope salt and the IV.
    fn salt_iv_size(&self) -> usize;

    /// Encrypts and pads `data`.
    fn encrypt(&self, key: &[u8], iv: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Decrypts and unpads `data`. Bad padding is a [`CryptoError::Decryption`].
    fn decrypt(&self, key: &[u8], iv: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>>;
}

/// Built-in block ciphers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCipherAlgorithm {
    #[default]
    Aes128,
    Aes192,
    Aes256,
    Des,
    TripleDes,
}

impl BlockCipherAlgorithm {
    pub const ALL: [BlockCipherAlgorithm; 5] = [
        BlockCipherAlgorithm::Aes128,
        BlockCipherAlgorithm::Aes192,
        BlockCipherAlgorithm::Aes256,
        BlockCipherAlgorithm::Des,
        BlockCipherAlgorithm::TripleDes,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            BlockCipherAlgorithm::Aes128 => "AES-128",
            BlockCipherAlgorithm::Aes192 => "AES-192",
            BlockCipherAlgorithm::Aes256 => "AES-256",
            BlockCipherAlgorithm::Des => "DES",
            BlockCipherAlgorithm::TripleDes => "3DES",
        }
    }

    const fn block_size(&self) -> usize {
        match self {
            BlockCipherAlgorithm::Aes128
            | BlockCipherAlgorithm::Aes192
            | BlockCipherAlgorithm::Aes256 => 16,
            BlockCipherAlgorithm::Des | BlockCipherAlgorithm::TripleDes => 8,
        }
    }

    fn check_inputs(&self, key: &[u8], iv: &[u8]) -> CryptoResult<()> {
        if key.len() != self.key_size() {
            return Err(CryptoError::InvalidKeyLength {
                expected: self.key_size(),
                actual: key.len(),
            });
        }
        if iv.len() != self.block_size() {
            return Err(CryptoError::InvalidArgument(format!(
                "{} IV must be {} bytes, got {}",
                self.as_str(),
                self.block_size(),
                iv.len()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for BlockCipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockCipherAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        match wanted.as_str() {
            "aes" | "aes128" => Ok(BlockCipherAlgorithm::Aes128),
            "aes192" => Ok(BlockCipherAlgorithm::Aes192),
            "aes256" => Ok(BlockCipherAlgorithm::Aes256),
            "des" => Ok(BlockCipherAlgorithm::Des),
            "3des" | "tripledes" | "tdes" => Ok(BlockCipherAlgorithm::TripleDes),
            _ => Err(CryptoError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl BlockCipherEngine for BlockCipherAlgorithm {
    fn name(&self) -> &str {
        self.as_str()
    }

    fn key_size(&self) -> usize {
        match self {
            BlockCipherAlgorithm::Aes128 => 16,
            BlockCipherAlgorithm::Aes192 => 24,
            BlockCipherAlgorithm::Aes256 => 32,
            BlockCipherAlgorithm::Des => 8,
            BlockCipherAlgorithm::TripleDes => 24,
        }
    }

    fn salt_iv_size(&self) -> usize {
        self.block_size()
    }

    fn encrypt(&self, key: &[u8], iv: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
        self.check_inputs(key, iv)?;
        match self {
            BlockCipherAlgorithm::Aes128 => cbc_encrypt::<Aes128>(key, iv, data),
            BlockCipherAlgorithm::Aes192 => cbc_encrypt::<Aes192>(key, iv, data),
            BlockCipherAlgorithm::Aes256 => cbc_encrypt::<Aes256>(key, iv, data),
            BlockCipherAlgorithm::Des => cbc_encrypt::<Des>(key, iv, data),
            BlockCipherAlgorithm::TripleDes => cbc_encrypt::<TdesEde3>(key, iv, data),
        }
    }

    fn decrypt(&self, key: &[u8], iv: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
        self.check_inputs(key, iv)?;
        if data.is_empty() || data.len() % self.block_size() != 0 {
            return Err(CryptoError::Decryption(format!(
                "ciphertext length {} is not a positive multiple of {}",
                data.len(),
                self.block_size()
            )));
        }
        match self {
            BlockCipherAlgorithm::Aes128 => cbc_decrypt::<Aes128>(key, iv, data),
            BlockCipherAlgorithm::Aes192 => cbc_decrypt::<Aes192>(key, iv, data),
            BlockCipherAlgorithm::Aes256 => cbc_decrypt::<Aes256>(key, iv, data),
            BlockCipherAlgorithm::Des => cbc_decrypt::<Des>(key, iv, data),
            BlockCipherAlgorithm::TripleDes => cbc_decrypt::<TdesEde3>(key, iv, data),
        }
    }
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>>
where
    C: BlockCipher + BlockEncryptMut + KeyInit,
{
    let encryptor = cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|e| CryptoError::Encryption(format!("cipher init failed: {e}")))?;
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(data))
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>>
where
    C: BlockCipher + BlockDecryptMut + KeyInit,
{
    let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|e| CryptoError::Decryption(format!("cipher init failed: {e}")))?;
    decryptor.decrypt_padded_vec_mut::<Pkcs7>(data).map_err(|_| {
        CryptoError::Decryption("invalid padding (wrong entropy or corrupt envelope)".into())
    })
}

/// Borrowed view of `salt || iv || ciphertext`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CipherEnvelope<'a> {
    pub salt: &'a [u8],
    pub iv: &'a [u8],
    pub ciphertext: &'a [u8],
}

impl<'a> CipherEnvelope<'a> {
    /// Splits `bytes` using the cipher's salt/IV size.
    pub fn parse(bytes: &'a [u8], salt_iv_size: usize) -> CryptoResult<Self> {
        if bytes.len() <= salt_iv_size * 2 {
            return Err(CryptoError::Decryption(format!(
                "envelope is {} bytes, too short for a {salt_iv_size}-byte salt and IV",
                bytes.len()
            )));
        }
        let (salt, rest) = bytes.split_at(salt_iv_size);
        let (iv, ciphertext) = rest.split_at(salt_iv_size);
        Ok(Self {
            salt,
            iv,
            ciphertext,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(self.salt.len() + self.iv.len() + self.ciphertext.len());
        out.extend_from_slice(self.salt);
        out.extend_from_slice(self.iv);
        out.extend_from_slice(self.ciphertext);
        out
    }
}

/// Encrypts with a key derived from accumulated entropy instead of a caller key.
#[derive(Clone, Debug)]
pub struct EntropyCipher<C = BlockCipherAlgorithm> {
    entropy: EntropyAccumulator,
    cipher: C,
    kdf_digest: DigestAlgorithm,
}

impl EntropyCipher {
    /// AES-128 cipher with a PBKDF2-HMAC-SHA1 key step.
    pub fn new(entropy: EntropyAccumulator) -> Self {
        Self::with_cipher(entropy, BlockCipherAlgorithm::Aes128)
    }
}

impl<C: BlockCipherEngine> EntropyCipher<C> {
    pub fn with_cipher(entropy: EntropyAccumulator, cipher: C) -> Self {
        Self {
            entropy,
            cipher,
            kdf_digest: DigestAlgorithm::Sha1,
        }
    }

    /// Replaces the digest driving the key derivation step.
    pub fn with_kdf_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.kdf_digest = digest;
        self
    }

    pub fn cipher(&self) -> &C {
        &self.cipher
    }

    pub fn kdf_digest(&self) -> DigestAlgorithm {
        self.kdf_digest
    }

    pub fn entropy(&self) -> &EntropyAccumulator {
        &self.entropy
    }

    /// Encrypts `data` into a fresh `salt || iv || ciphertext` envelope.
    pub fn encrypt(&self, data: &[u8], extra_entropy: Option<&[u8]>) -> CryptoResult<Vec<u8>> {
        if data.is_empty() {
            return Err(CryptoError::InvalidArgument("data to encrypt is empty".into()));
        }
        let n = self.cipher.salt_iv_size();

        let entropy_hash = self.entropy.reduce(extra_entropy);
        let salt = random_bytes(n)?;
        let iv = random_bytes(n)?;
        let key = self.derive_key(&entropy_hash, &salt)?;

        let ciphertext = self.cipher.encrypt(&key, &iv, data)?;
        debug!(
            cipher = self.cipher.name(),
            plaintext_len = data.len(),
            ciphertext_len = ciphertext.len(),
            "encrypted envelope"
        );

        Ok(CipherEnvelope {
            salt: &salt,
            iv: &iv,
            ciphertext: &ciphertext,
        }
        .to_bytes())
    }

    /// Decrypts an envelope produced by [`encrypt`](Self::encrypt) with the same entropy.
    pub fn decrypt(&self, envelope: &[u8], extra_entropy: Option<&[u8]>) -> CryptoResult<Vec<u8>> {
        if envelope.is_empty() {
            return Err(CryptoError::InvalidArgument("data to decrypt is empty".into()));
        }
        let parsed = CipherEnvelope::parse(envelope, self.cipher.salt_iv_size())?;

        let entropy_hash = self.entropy.reduce(extra_entropy);
        let key = self.derive_key(&entropy_hash, parsed.salt)?;

        let plaintext = self.cipher.decrypt(&key, parsed.iv, parsed.ciphertext)?;
        debug!(
            cipher = self.cipher.name(),
            envelope_len = envelope.len(),
            "decrypted envelope"
        );
        Ok(plaintext)
    }

    /// Encrypts UTF-8 text and returns the Base64 envelope.
    pub fn encrypt_str(&self, data: &str, extra_entropy: Option<&str>) -> CryptoResult<String> {
        let envelope = self.encrypt(data.as_bytes(), extra_entropy.map(str::as_bytes))?;
        Ok(STANDARD.encode(envelope))
    }

    /// Decrypts a Base64 envelope back into UTF-8 text.
    pub fn decrypt_str(&self, encoded: &str, extra_entropy: Option<&str>) -> CryptoResult<String> {
        let envelope = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidArgument(format!("malformed envelope: {e}")))?;
        let plaintext = Zeroizing::new(self.decrypt(&envelope, extra_entropy.map(str::as_bytes))?);
        String::from_utf8(plaintext.to_vec()).map_err(|_| {
            CryptoError::Decryption("plaintext is not valid UTF-8 (wrong entropy?)".into())
        })
    }

    fn derive_key(&self, entropy_hash: &[u8], salt: &[u8]) -> CryptoResult<Zeroizing<Vec<u8>>> {
        let mut key = Zeroizing::new(vec![0u8; self.cipher.key_size()]);
        self.kdf_digest
            .pbkdf2(entropy_hash, salt, KDF_ITERATIONS, &mut key)?;
        Ok(key)
    }
}
