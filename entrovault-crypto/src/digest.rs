//! Digest engines used for entropy folding and PBKDF2.
//!
//! A digest is chosen as a value ([`DigestAlgorithm`]) rather than a type, so a
//! password hasher or cipher can switch engines at runtime without one type per
//! digest. Anything implementing [`DigestEngine`] can be plugged in instead.

use std::fmt;
use std::str::FromStr;

use blake2::{Blake2b, Blake2b512, Blake2s, Blake2s256};
use hmac::SimpleHmac;
use hmac::digest::consts::{U20, U32, U48, U128, U168};
use hmac::digest::core_api::BlockSizeUser;
use hmac::digest::{Digest, ExtendableOutput, FixedOutput, HashMarker, Output, OutputSizeUser, Update};
use md5::Md5;
use ripemd::{Ripemd160, Ripemd256, Ripemd320};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use sha3::{Keccak256, Keccak512, Sha3_224, Sha3_256, Sha3_384, Sha3_512, Shake128};
use skein::{Skein256, Skein1024};
use sm3::Sm3;
use whirlpool::Whirlpool;

use crate::error::{CryptoError, CryptoResult};

/// A fixed-output hash function that can also drive PBKDF2-HMAC.
pub trait DigestEngine: Send + Sync {
    /// Human readable engine name, e.g. `"SHA3-512"`.
    fn name(&self) -> &str;

    /// Digest size in bytes.
    fn output_size(&self) -> usize;

    /// Hashes `data` in one shot.
    fn hash(&self, data: &[u8]) -> Vec<u8>;

    /// Fills `out` with PBKDF2 output using HMAC over this digest as the PRF.
    fn pbkdf2(&self, password: &[u8], salt: &[u8], rounds: u32, out: &mut [u8]) -> CryptoResult<()>;
}

/// Built-in digest engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha2_224,
    Sha2_256,
    Sha2_384,
    Sha2_512,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
    Keccak256,
    Keccak512,
    Shake128,
    Blake2b384,
    Blake2b512,
    Blake2s160,
    Blake2s256,
    Ripemd160,
    Ripemd256,
    Ripemd320,
    Whirlpool,
    Sm3,
    Skein256,
    Skein1024,
}

impl DigestAlgorithm {
    /// Every built-in engine, in declaration order.
    pub const ALL: [DigestAlgorithm; 24] = [
        DigestAlgorithm::Md5,
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Sha2_224,
        DigestAlgorithm::Sha2_256,
        DigestAlgorithm::Sha2_384,
        DigestAlgorithm::Sha2_512,
        DigestAlgorithm::Sha3_224,
        DigestAlgorithm::Sha3_256,
        DigestAlgorithm::Sha3_384,
        DigestAlgorithm::Sha3_512,
        DigestAlgorithm::Keccak256,
        DigestAlgorithm::Keccak512,
        DigestAlgorithm::Shake128,
        DigestAlgorithm::Blake2b384,
        DigestAlgorithm::Blake2b512,
        DigestAlgorithm::Blake2s160,
        DigestAlgorithm::Blake2s256,
        DigestAlgorithm::Ripemd160,
        DigestAlgorithm::Ripemd256,
        DigestAlgorithm::Ripemd320,
        DigestAlgorithm::Whirlpool,
        DigestAlgorithm::Sm3,
        DigestAlgorithm::Skein256,
        DigestAlgorithm::Skein1024,
    ];

    /// Canonical display name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha2_224 => "SHA2-224",
            DigestAlgorithm::Sha2_256 => "SHA2-256",
            DigestAlgorithm::Sha2_384 => "SHA2-384",
            DigestAlgorithm::Sha2_512 => "SHA2-512",
            DigestAlgorithm::Sha3_224 => "SHA3-224",
            DigestAlgorithm::Sha3_256 => "SHA3-256",
            DigestAlgorithm::Sha3_384 => "SHA3-384",
            DigestAlgorithm::Sha3_512 => "SHA3-512",
            DigestAlgorithm::Keccak256 => "Keccak-256",
            DigestAlgorithm::Keccak512 => "Keccak-512",
            DigestAlgorithm::Shake128 => "SHAKE-128",
            DigestAlgorithm::Blake2b384 => "BLAKE2b-384",
            DigestAlgorithm::Blake2b512 => "BLAKE2b-512",
            DigestAlgorithm::Blake2s160 => "BLAKE2s-160",
            DigestAlgorithm::Blake2s256 => "BLAKE2s-256",
            DigestAlgorithm::Ripemd160 => "RIPEMD-160",
            DigestAlgorithm::Ripemd256 => "RIPEMD-256",
            DigestAlgorithm::Ripemd320 => "RIPEMD-320",
            DigestAlgorithm::Whirlpool => "Whirlpool",
            DigestAlgorithm::Sm3 => "SM3",
            DigestAlgorithm::Skein256 => "Skein-256",
            DigestAlgorithm::Skein1024 => "Skein-1024",
        }
    }
}

impl Default for DigestAlgorithm {
    fn default() -> Self {
        DigestAlgorithm::Sha3_512
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = CryptoError;

    /// Accepts the display name or the serde name, ignoring case, `-` and `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        DigestAlgorithm::ALL
            .into_iter()
            .find(|alg| {
                normalize(alg.as_str()) == wanted || aliases(*alg).iter().any(|a| *a == wanted)
            })
            .ok_or_else(|| CryptoError::UnknownAlgorithm(s.to_string()))
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '-' && *c != '_' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn aliases(alg: DigestAlgorithm) -> &'static [&'static str] {
    match alg {
        DigestAlgorithm::Sha2_224 => &["sha224"],
        DigestAlgorithm::Sha2_256 => &["sha256"],
        DigestAlgorithm::Sha2_384 => &["sha384"],
        DigestAlgorithm::Sha2_512 => &["sha512"],
        DigestAlgorithm::Blake2b512 => &["blake2b", "blake2"],
        DigestAlgorithm::Blake2s256 => &["blake2s"],
        DigestAlgorithm::Ripemd160 => &["ripemd"],
        DigestAlgorithm::Shake128 => &["shake"],
        DigestAlgorithm::Skein256 => &["skein"],
        _ => &[],
    }
}

/// Dispatches a generic call to the concrete digest type behind `$alg`.
macro_rules! with_digest {
    ($alg:expr, $f:ident ( $($arg:expr),* )) => {
        match $alg {
            DigestAlgorithm::Md5 => $f::<Md5>($($arg),*),
            DigestAlgorithm::Sha1 => $f::<Sha1>($($arg),*),
            DigestAlgorithm::Sha2_224 => $f::<Sha224>($($arg),*),
            DigestAlgorithm::Sha2_256 => $f::<Sha256>($($arg),*),
            DigestAlgorithm::Sha2_384 => $f::<Sha384>($($arg),*),
            DigestAlgorithm::Sha2_512 => $f::<Sha512>($($arg),*),
            DigestAlgorithm::Sha3_224 => $f::<Sha3_224>($($arg),*),
            DigestAlgorithm::Sha3_256 => $f::<Sha3_256>($($arg),*),
            DigestAlgorithm::Sha3_384 => $f::<Sha3_384>($($arg),*),
            DigestAlgorithm::Sha3_512 => $f::<Sha3_512>($($arg),*),
            DigestAlgorithm::Keccak256 => $f::<Keccak256>($($arg),*),
            DigestAlgorithm::Keccak512 => $f::<Keccak512>($($arg),*),
            DigestAlgorithm::Shake128 => $f::<Shake128Fixed>($($arg),*),
            DigestAlgorithm::Blake2b384 => $f::<Blake2b<U48>>($($arg),*),
            DigestAlgorithm::Blake2b512 => $f::<Blake2b512>($($arg),*),
            DigestAlgorithm::Blake2s160 => $f::<Blake2s<U20>>($($arg),*),
            DigestAlgorithm::Blake2s256 => $f::<Blake2s256>($($arg),*),
            DigestAlgorithm::Ripemd160 => $f::<Ripemd160>($($arg),*),
            DigestAlgorithm::Ripemd256 => $f::<Ripemd256>($($arg),*),
            DigestAlgorithm::Ripemd320 => $f::<Ripemd320>($($arg),*),
            DigestAlgorithm::Whirlpool => $f::<Whirlpool>($($arg),*),
            DigestAlgorithm::Sm3 => $f::<Sm3>($($arg),*),
            DigestAlgorithm::Skein256 => $f::<Skein256<U32>>($($arg),*),
            DigestAlgorithm::Skein1024 => $f::<Skein1024<U128>>($($arg),*),
        }
    };
}

impl DigestEngine for DigestAlgorithm {
    fn name(&self) -> &str {
        self.as_str()
    }

    fn output_size(&self) -> usize {
        with_digest!(self, output_size_of())
    }

    fn hash(&self, data: &[u8]) -> Vec<u8> {
        with_digest!(self, hash_with(data))
    }

    fn pbkdf2(&self, password: &[u8], salt: &[u8], rounds: u32, out: &mut [u8]) -> CryptoResult<()> {
        with_digest!(self, pbkdf2_with(password, salt, rounds, out))
    }
}

/// SHAKE-128 squeezed to a fixed 32 bytes, so it can key HMAC like any other digest.
#[derive(Clone, Default)]
pub struct Shake128Fixed(Shake128);

impl HashMarker for Shake128Fixed {}

impl Update for Shake128Fixed {
    fn update(&mut self, data: &[u8]) {
        Update::update(&mut self.0, data);
    }
}

impl OutputSizeUser for Shake128Fixed {
    type OutputSize = U32;
}

impl BlockSizeUser for Shake128Fixed {
    type BlockSize = U168;
}

impl FixedOutput for Shake128Fixed {
    fn finalize_into(self, out: &mut Output<Self>) {
        self.0.finalize_xof_into(out);
    }
}

fn output_size_of<D: Digest>() -> usize {
    <D as Digest>::output_size()
}

/// One-shot digest with a concrete RustCrypto hash type.
pub fn hash_with<D: Digest>(data: &[u8]) -> Vec<u8> {
    D::digest(data).to_vec()
}

/// PBKDF2 with `SimpleHmac<D>` as the PRF.
///
/// `SimpleHmac` is used instead of `Hmac` so digests with lazy block buffers
/// (BLAKE2) share the same path.
pub fn pbkdf2_with<D>(password: &[u8], salt: &[u8], rounds: u32, out: &mut [u8]) -> CryptoResult<()>
where
    D: Digest + BlockSizeUser + Clone + Sync,
{
    pbkdf2::pbkdf2::<SimpleHmac<D>>(password, salt, rounds, out)
        .map_err(|e| CryptoError::KeyDerivation(format!("pbkdf2 failed: {e}")))
}

/// Lowercase hex digest of `data`.
pub fn hash_hex(engine: &dyn DigestEngine, data: &[u8]) -> String {
    hex::encode(engine.hash(data))
}
