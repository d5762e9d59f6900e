//! Salted password hashing with PBKDF2-HMAC over a pluggable digest.
//!
//! A salted hash is laid out as `salt || derived` and Base64 encoded for the
//! string API. Iterations, salt size and hash size are raised to fixed minimums
//! instead of being rejected, so a caller cannot accidentally weaken a hash by
//! passing tiny values. Raising is logged at `warn` level because it usually
//! means the caller is misconfigured.

use base64::{Engine, engine::general_purpose::STANDARD};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::digest::{DigestAlgorithm, DigestEngine};
use crate::entropy::random_bytes;
use crate::error::{CryptoError, CryptoResult};

pub const DEFAULT_ITERATIONS: u32 = 50_000;
pub const DEFAULT_SALT_SIZE: usize = 64;
pub const DEFAULT_HASH_SIZE: usize = 128;

pub const MIN_ITERATIONS: u32 = 100;
pub const MIN_SALT_SIZE: usize = 8;
pub const MIN_HASH_SIZE: usize = 16;

/// PBKDF2 parameters for hashing and verification.
///
/// Verification must use the same parameters as hashing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashParams {
    pub iterations: u32,
    pub salt_size: usize,
    pub hash_size: usize,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            salt_size: DEFAULT_SALT_SIZE,
            hash_size: DEFAULT_HASH_SIZE,
        }
    }
}

impl HashParams {
    pub fn new(iterations: u32, salt_size: usize, hash_size: usize) -> Self {
        Self {
            iterations,
            salt_size,
            hash_size,
        }
    }

    /// Returns the parameters with each value raised to its minimum.
    pub fn clamped(&self) -> Self {
        let clamped = Self {
            iterations: self.iterations.max(MIN_ITERATIONS),
            salt_size: self.salt_size.max(MIN_SALT_SIZE),
            hash_size: self.hash_size.max(MIN_HASH_SIZE),
        };
        if clamped != *self {
            warn!(
                requested_iterations = self.iterations,
                requested_salt_size = self.salt_size,
                requested_hash_size = self.hash_size,
                iterations = clamped.iterations,
                salt_size = clamped.salt_size,
                hash_size = clamped.hash_size,
                "password hash parameters below minimum, raising"
            );
        }
        clamped
    }
}

/// `salt || derived` bytes. Zeroed on drop.
///
/// Equality runs in constant time.
#[derive(Clone)]
pub struct SaltedHash(Zeroizing<Vec<u8>>);

impl SaltedHash {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Decodes a Base64 salted hash.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidArgument(format!("malformed salted hash: {e}")))?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0.as_slice())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Splits into `(salt, derived)`. The salted hash must be longer than `salt_size`.
    pub fn split(&self, salt_size: usize) -> CryptoResult<(&[u8], &[u8])> {
        split_salted(&self.0, salt_size)
    }
}

impl PartialEq for SaltedHash {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(&self.0, &other.0)
    }
}

impl Eq for SaltedHash {}

impl AsRef<[u8]> for SaltedHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SaltedHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SaltedHash({} bytes)", self.0.len())
    }
}

fn split_salted(bytes: &[u8], salt_size: usize) -> CryptoResult<(&[u8], &[u8])> {
    if bytes.len() <= salt_size {
        return Err(CryptoError::InvalidArgument(format!(
            "salted hash is {} bytes, expected more than the {salt_size}-byte salt",
            bytes.len()
        )));
    }
    Ok(bytes.split_at(salt_size))
}

/// Creates and verifies salted password hashes.
#[derive(Clone, Debug)]
pub struct PasswordHasher<E = DigestAlgorithm> {
    engine: E,
}

impl PasswordHasher {
    /// Hasher using SHA3-512.
    pub fn new() -> Self {
        Self::with_engine(DigestAlgorithm::Sha3_512)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DigestEngine> PasswordHasher<E> {
    pub fn with_engine(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Hashes `password` with a fresh random salt.
    pub fn hash(&self, password: &[u8], params: &HashParams) -> CryptoResult<SaltedHash> {
        ensure_password(password)?;
        let params = params.clamped();

        let salt = random_bytes(params.salt_size)?;
        let derived = self.derive(password, &salt, &params)?;

        let mut salted = Vec::with_capacity(salt.len() + derived.len());
        salted.extend_from_slice(&salt);
        salted.extend_from_slice(&derived);

        debug!(
            engine = self.engine.name(),
            iterations = params.iterations,
            salt_size = params.salt_size,
            hash_size = params.hash_size,
            "hashed password"
        );
        Ok(SaltedHash::from_bytes(salted))
    }

    /// Hashes a string password and returns the Base64 salted hash.
    pub fn hash_str(&self, password: &str, params: &HashParams) -> CryptoResult<String> {
        Ok(self.hash(password.as_bytes(), params)?.to_base64())
    }

    /// Checks `password` against `salted_hash` in constant time.
    pub fn verify(
        &self,
        password: &[u8],
        salted_hash: &[u8],
        params: &HashParams,
    ) -> CryptoResult<bool> {
        ensure_password(password)?;
        let params = params.clamped();

        let (salt, stored) = split_salted(salted_hash, params.salt_size)?;
        let salt = Zeroizing::new(salt.to_vec());
        let stored = Zeroizing::new(stored.to_vec());

        let recomputed = self.derive(password, &salt, &params)?;
        let matches = constant_time_eq(&stored, &recomputed);

        debug!(engine = self.engine.name(), matches, "verified password");
        Ok(matches)
    }

    /// Checks a string password against a Base64 salted hash.
    pub fn verify_str(
        &self,
        password: &str,
        salted_hash: &str,
        params: &HashParams,
    ) -> CryptoResult<bool> {
        let decoded = SaltedHash::from_base64(salted_hash)?;
        self.verify(password.as_bytes(), decoded.as_bytes(), params)
    }

    fn derive(
        &self,
        password: &[u8],
        salt: &[u8],
        params: &HashParams,
    ) -> CryptoResult<Zeroizing<Vec<u8>>> {
        let mut out = Zeroizing::new(vec![0u8; params.hash_size]);
        self.engine
            .pbkdf2(password, salt, params.iterations, &mut out)?;
        Ok(out)
    }
}

fn ensure_password(password: &[u8]) -> CryptoResult<()> {
    if password.is_empty() {
        return Err(CryptoError::InvalidArgument("password is empty".into()));
    }
    Ok(())
}

/// Compares two byte strings without exiting early.
///
/// The length difference is folded into the result alongside every byte
/// difference over the common prefix, so timing does not depend on where the
/// first mismatch is.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let mut equal = (a.len() as u64).ct_eq(&(b.len() as u64));
    for (x, y) in a.iter().zip(b.iter()) {
        equal &= x.ct_eq(y);
    }
    equal.into()
}
