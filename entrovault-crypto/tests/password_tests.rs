use entrovault_crypto::password::{MIN_HASH_SIZE, MIN_ITERATIONS, MIN_SALT_SIZE};
use entrovault_crypto::{CryptoError, DigestAlgorithm, HashParams, PasswordHasher, SaltedHash};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn fast_params() -> HashParams {
    HashParams::new(MIN_ITERATIONS, 16, 32)
}

#[test]
fn hash_and_verify_roundtrip() {
    let hasher = PasswordHasher::new();
    let params = fast_params();
    let hash = hasher.hash_str("correct horse battery staple", &params).unwrap();
    assert!(hasher.verify_str("correct horse battery staple", &hash, &params).unwrap());
}

#[test]
fn wrong_password_does_not_verify() {
    let hasher = PasswordHasher::new();
    let params = fast_params();
    let hash = hasher.hash_str("password123", &params).unwrap();
    assert!(!hasher.verify_str("password124", &hash, &params).unwrap());
}

#[test]
fn same_password_gets_fresh_salt() {
    let hasher = PasswordHasher::new();
    let params = fast_params();
    let a = hasher.hash(b"password", &params).unwrap();
    let b = hasher.hash(b"password", &params).unwrap();
    assert_ne!(a, b);
    assert_ne!(a.split(16).unwrap().0, b.split(16).unwrap().0);
}

#[test]
fn default_params_layout() {
    let hasher = PasswordHasher::new();
    let salted = hasher.hash(b"password", &HashParams::default()).unwrap();
    assert_eq!(salted.len(), 64 + 128);
}

#[test]
fn hash_from_one_engine_fails_on_another() {
    let params = fast_params();
    let sha3 = PasswordHasher::new();
    let sha256 = PasswordHasher::with_engine(DigestAlgorithm::Sha2_256);

    let hash = sha3.hash_str("password123", &params).unwrap();
    assert!(sha3.verify_str("password123", &hash, &params).unwrap());
    assert!(!sha256.verify_str("password123", &hash, &params).unwrap());
}

#[test]
fn every_engine_roundtrips() {
    let params = fast_params();
    assert_eq!(DigestAlgorithm::ALL.len(), 24);
    for wide in [
        DigestAlgorithm::Skein256,
        DigestAlgorithm::Skein1024,
        DigestAlgorithm::Shake128,
        DigestAlgorithm::Blake2b384,
        DigestAlgorithm::Blake2s160,
    ] {
        assert!(DigestAlgorithm::ALL.contains(&wide), "{wide} missing");
    }
    for algorithm in DigestAlgorithm::ALL {
        let hasher = PasswordHasher::with_engine(algorithm);
        let hash = hasher.hash(b"password", &params).unwrap();
        assert!(
            hasher.verify(b"password", hash.as_bytes(), &params).unwrap(),
            "{algorithm} failed to verify its own hash"
        );
    }
}

#[test]
fn skein_and_shake_hashes_do_not_cross_verify() {
    let params = fast_params();
    let skein = PasswordHasher::with_engine(DigestAlgorithm::Skein1024);
    let shake = PasswordHasher::with_engine(DigestAlgorithm::Shake128);

    let hash = skein.hash_str("password123", &params).unwrap();
    assert!(skein.verify_str("password123", &hash, &params).unwrap());
    assert!(!shake.verify_str("password123", &hash, &params).unwrap());
}

#[test]
fn tiny_params_are_raised_to_minimums() {
    let hasher = PasswordHasher::new();
    let tiny = HashParams::new(1, 1, 1);
    let salted = hasher.hash(b"password", &tiny).unwrap();
    assert_eq!(salted.len(), MIN_SALT_SIZE + MIN_HASH_SIZE);

    // Verifying with the tiny params clamps the same way.
    assert!(hasher.verify(b"password", salted.as_bytes(), &tiny).unwrap());
    let minimums = HashParams::new(MIN_ITERATIONS, MIN_SALT_SIZE, MIN_HASH_SIZE);
    assert!(hasher.verify(b"password", salted.as_bytes(), &minimums).unwrap());
}

#[test]
fn custom_params() {
    let hasher = PasswordHasher::new();
    let params = HashParams::new(2500, 256, 512);
    let salted = hasher.hash(b"password", &params).unwrap();
    assert_eq!(salted.len(), 256 + 512);
    assert!(hasher.verify(b"password", salted.as_bytes(), &params).unwrap());
}

#[test]
fn mismatched_params_do_not_verify() {
    let hasher = PasswordHasher::new();
    let salted = hasher.hash(b"password", &fast_params()).unwrap();
    let other = HashParams::new(MIN_ITERATIONS + 1, 16, 32);
    assert!(!hasher.verify(b"password", salted.as_bytes(), &other).unwrap());
}

#[test]
fn empty_password_is_invalid() {
    let hasher = PasswordHasher::new();
    let err = hasher.hash_str("", &fast_params()).unwrap_err();
    assert!(matches!(err, CryptoError::InvalidArgument(_)));

    let hash = hasher.hash_str("password", &fast_params()).unwrap();
    let err = hasher.verify_str("", &hash, &fast_params()).unwrap_err();
    assert!(err.is_invalid_input());
}

#[test]
fn malformed_base64_is_invalid() {
    let hasher = PasswordHasher::new();
    let err = hasher
        .verify_str("password", "not base64!!", &fast_params())
        .unwrap_err();
    assert!(matches!(err, CryptoError::InvalidArgument(_)));
}

#[test]
fn salted_hash_shorter_than_salt_is_invalid() {
    let hasher = PasswordHasher::new();
    let short = SaltedHash::from_bytes(vec![7u8; 16]);
    let err = hasher
        .verify_str("password", &short.to_base64(), &fast_params())
        .unwrap_err();
    assert!(matches!(err, CryptoError::InvalidArgument(_)));
}

#[test]
fn base64_roundtrip_preserves_bytes() {
    let hasher = PasswordHasher::new();
    let salted = hasher.hash(b"password", &fast_params()).unwrap();
    let decoded = SaltedHash::from_base64(&salted.to_base64()).unwrap();
    assert_eq!(decoded.as_bytes(), salted.as_bytes());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn any_password_verifies(password in "\\PC{1,40}") {
        let hasher = PasswordHasher::new();
        let params = fast_params();
        let hash = hasher.hash_str(&password, &params).unwrap();
        prop_assert!(hasher.verify_str(&password, &hash, &params).unwrap());
    }
}
