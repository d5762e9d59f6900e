//! C ABI exports for Entrovault.
//!
//! Exposes salted password hashing and the entropy-composed encryptor to
//! P/Invoke, Swift and plain C callers.
//!
//! All functions use C-compatible types and report errors via return codes.
//! Strings handed back to the caller must be released with
//! [`entrovault_free_string`]; encryptor handles with [`entrovault_encryptor_free`].

use std::ffi::{CStr, CString, c_char};
use std::sync::Once;

use entrovault_crypto::{
    CipherConfig, CryptoError, PasswordHashConfig, PasswordHasher, SecureEncryptor,
};
use serde::de::DeserializeOwned;

/// Error codes returned by FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrovaultError {
    /// Operation succeeded.
    Ok = 0,
    /// Null pointer argument.
    NullPointer = 1,
    /// Invalid UTF-8 string.
    InvalidUtf8 = 2,
    /// JSON deserialization error.
    JsonError = 3,
    /// Empty or malformed input.
    InvalidArgument = 4,
    /// Envelope could not be decrypted with this encryptor's entropy.
    DecryptionFailed = 5,
    /// Key derivation, cipher or random generator failure.
    CryptoError = 6,
    /// Unknown error.
    Unknown = 99,
}

impl From<&CryptoError> for EntrovaultError {
    fn from(err: &CryptoError) -> Self {
        match err {
            CryptoError::Decryption(_) => EntrovaultError::DecryptionFailed,
            e if e.is_invalid_input() => EntrovaultError::InvalidArgument,
            _ => EntrovaultError::CryptoError,
        }
    }
}

/// Opaque encryptor handle.
pub struct EntrovaultEncryptor {
    inner: SecureEncryptor,
}

static INIT_LOGGING: Once = Once::new();

/// Installs a stderr log subscriber filtered by `RUST_LOG` (default `info`).
///
/// Calling this more than once is harmless.
#[unsafe(no_mangle)]
pub extern "C" fn entrovault_init_logging() -> EntrovaultError {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .try_init();
    });
    EntrovaultError::Ok
}

/// Returns the library version as a string.
///
/// # Notes
/// - The returned string is statically allocated and must not be freed.
#[unsafe(no_mangle)]
pub extern "C" fn entrovault_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

/// Frees a string allocated by this library.
///
/// # Safety
/// - `s` must be a string allocated by this library, or null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn entrovault_free_string(s: *mut c_char) { unsafe {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}}

// ============================================================================
// Password Hashing
// ============================================================================

/// Hashes a password with a fresh salt and returns the Base64 salted hash.
///
/// # Safety
/// - `password` must be a valid null-terminated UTF-8 string.
/// - `config_json` must be a valid null-terminated `PasswordHashConfig` JSON
///   string, or null for the defaults.
/// - `out_hash` must be a valid pointer. The result must be freed with `entrovault_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn entrovault_hash_password(
    password: *const c_char,
    config_json: *const c_char,
    out_hash: *mut *mut c_char,
) -> EntrovaultError { unsafe {
    if password.is_null() || out_hash.is_null() {
        return EntrovaultError::NullPointer;
    }
    let password = match read_str(password) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let config: PasswordHashConfig = match read_config(config_json) {
        Ok(c) => c,
        Err(e) => return e,
    };

    let hasher = PasswordHasher::with_engine(config.digest);
    match hasher.hash_str(password, &config.params()) {
        Ok(hash) => write_string(out_hash, hash),
        Err(e) => EntrovaultError::from(&e),
    }
}}

/// Checks a password against a Base64 salted hash.
///
/// `config_json` must describe the same parameters the hash was created with.
///
/// # Safety
/// - `password` and `salted_hash` must be valid null-terminated UTF-8 strings.
/// - `config_json` must be a valid null-terminated JSON string, or null for the defaults.
/// - `out_matches` must be a valid pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn entrovault_verify_password(
    password: *const c_char,
    salted_hash: *const c_char,
    config_json: *const c_char,
    out_matches: *mut bool,
) -> EntrovaultError { unsafe {
    if password.is_null() || salted_hash.is_null() || out_matches.is_null() {
        return EntrovaultError::NullPointer;
    }
    let password = match read_str(password) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let salted_hash = match read_str(salted_hash) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let config: PasswordHashConfig = match read_config(config_json) {
        Ok(c) => c,
        Err(e) => return e,
    };

    let hasher = PasswordHasher::with_engine(config.digest);
    match hasher.verify_str(password, salted_hash, &config.params()) {
        Ok(matches) => {
            *out_matches = matches;
            EntrovaultError::Ok
        }
        Err(e) => EntrovaultError::from(&e),
    }
}}

// ============================================================================
// Encryptor
// ============================================================================

/// Creates an encryptor from a `CipherConfig` and a JSON array of entropy strings.
///
/// Sources are used in array order. With an `ephemeral` profile only this
/// handle can decrypt what it encrypts.
///
/// # Safety
/// - `config_json` must be a valid null-terminated JSON string, or null for the defaults.
/// - `entropy_json` must be a valid null-terminated JSON array of strings.
/// - `out_handle` must be a valid pointer. The handle must be freed with `entrovault_encryptor_free`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn entrovault_encryptor_new(
    config_json: *const c_char,
    entropy_json: *const c_char,
    out_handle: *mut *mut EntrovaultEncryptor,
) -> EntrovaultError { unsafe {
    if entropy_json.is_null() || out_handle.is_null() {
        return EntrovaultError::NullPointer;
    }
    let config: CipherConfig = match read_config(config_json) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let entropy = match read_str(entropy_json) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let sources: Vec<String> = match serde_json::from_str(entropy) {
        Ok(v) => v,
        Err(_) => return EntrovaultError::JsonError,
    };

    match SecureEncryptor::from_config(&config, sources) {
        Ok(inner) => {
            *out_handle = Box::into_raw(Box::new(EntrovaultEncryptor { inner }));
            EntrovaultError::Ok
        }
        Err(e) => EntrovaultError::from(&e),
    }
}}

/// Encrypts UTF-8 text and returns the Base64 envelope.
///
/// # Safety
/// - `handle` must come from `entrovault_encryptor_new` and not have been freed.
/// - `plaintext` must be a valid null-terminated UTF-8 string.
/// - `extra_entropy` must be a valid null-terminated UTF-8 string, or null.
/// - `out_envelope` must be a valid pointer. The result must be freed with `entrovault_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn entrovault_encryptor_encrypt(
    handle: *const EntrovaultEncryptor,
    plaintext: *const c_char,
    extra_entropy: *const c_char,
    out_envelope: *mut *mut c_char,
) -> EntrovaultError { unsafe {
    if handle.is_null() || plaintext.is_null() || out_envelope.is_null() {
        return EntrovaultError::NullPointer;
    }
    let plaintext = match read_str(plaintext) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let extra = match read_optional_str(extra_entropy) {
        Ok(s) => s,
        Err(e) => return e,
    };

    match (*handle).inner.encrypt_str(plaintext, extra) {
        Ok(envelope) => write_string(out_envelope, envelope),
        Err(e) => EntrovaultError::from(&e),
    }
}}

/// Decrypts a Base64 envelope back into UTF-8 text.
///
/// # Safety
/// - `handle` must come from `entrovault_encryptor_new` and not have been freed.
/// - `envelope` must be a valid null-terminated UTF-8 string.
/// - `extra_entropy` must be a valid null-terminated UTF-8 string, or null.
/// - `out_plaintext` must be a valid pointer. The result must be freed with `entrovault_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn entrovault_encryptor_decrypt(
    handle: *const EntrovaultEncryptor,
    envelope: *const c_char,
    extra_entropy: *const c_char,
    out_plaintext: *mut *mut c_char,
) -> EntrovaultError { unsafe {
    if handle.is_null() || envelope.is_null() || out_plaintext.is_null() {
        return EntrovaultError::NullPointer;
    }
    let envelope = match read_str(envelope) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let extra = match read_optional_str(extra_entropy) {
        Ok(s) => s,
        Err(e) => return e,
    };

    match (*handle).inner.decrypt_str(envelope, extra) {
        Ok(plaintext) => write_string(out_plaintext, plaintext),
        Err(e) => EntrovaultError::from(&e),
    }
}}

/// Frees an encryptor handle. Its entropy is zeroed.
///
/// # Safety
/// - `handle` must come from `entrovault_encryptor_new`, or be null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn entrovault_encryptor_free(handle: *mut EntrovaultEncryptor) { unsafe {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}}

// ============================================================================
// Helpers
// ============================================================================

unsafe fn read_str<'a>(ptr: *const c_char) -> Result<&'a str, EntrovaultError> { unsafe {
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| EntrovaultError::InvalidUtf8)
}}

unsafe fn read_optional_str<'a>(ptr: *const c_char) -> Result<Option<&'a str>, EntrovaultError> { unsafe {
    if ptr.is_null() {
        return Ok(None);
    }
    read_str(ptr).map(Some)
}}

/// Parses a JSON config, falling back to the defaults for null.
unsafe fn read_config<T: DeserializeOwned + Default>(ptr: *const c_char) -> Result<T, EntrovaultError> { unsafe {
    match read_optional_str(ptr)? {
        None => Ok(T::default()),
        Some(json) => serde_json::from_str(json).map_err(|_| EntrovaultError::JsonError),
    }
}}

unsafe fn write_string(out: *mut *mut c_char, value: String) -> EntrovaultError { unsafe {
    match CString::new(value) {
        Ok(s) => {
            *out = s.into_raw();
            EntrovaultError::Ok
        }
        // Text with an interior NUL cannot cross the C boundary.
        Err(_) => EntrovaultError::InvalidArgument,
    }
}}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::ptr;

    const FAST_HASH: &str = r#"{"iterations":100,"salt_size":16,"hash_size":32}"#;

    fn cstr(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    unsafe fn take_string(ptr: *mut c_char) -> String {
        let s = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
        unsafe { entrovault_free_string(ptr) };
        s
    }

    fn new_encryptor(config: Option<&str>, entropy: &str) -> *mut EntrovaultEncryptor {
        let config = config.map(cstr);
        let entropy = cstr(entropy);
        let mut handle = ptr::null_mut();
        let result = unsafe {
            entrovault_encryptor_new(
                config.as_ref().map_or(ptr::null(), |c| c.as_ptr()),
                entropy.as_ptr(),
                &mut handle,
            )
        };
        assert_eq!(result, EntrovaultError::Ok);
        assert!(!handle.is_null());
        handle
    }

    fn encrypt(handle: *const EntrovaultEncryptor, text: &str) -> String {
        let text = cstr(text);
        let mut out = ptr::null_mut();
        let result =
            unsafe { entrovault_encryptor_encrypt(handle, text.as_ptr(), ptr::null(), &mut out) };
        assert_eq!(result, EntrovaultError::Ok);
        unsafe { take_string(out) }
    }

    fn decrypt(handle: *const EntrovaultEncryptor, envelope: &str) -> Result<String, EntrovaultError> {
        let envelope = cstr(envelope);
        let mut out = ptr::null_mut();
        let result = unsafe {
            entrovault_encryptor_decrypt(handle, envelope.as_ptr(), ptr::null(), &mut out)
        };
        match result {
            EntrovaultError::Ok => Ok(unsafe { take_string(out) }),
            e => Err(e),
        }
    }

    #[test]
    fn version_returns_valid_string() {
        let version = entrovault_version();
        assert!(!version.is_null());
        let version_str = unsafe { CStr::from_ptr(version) }.to_str().unwrap();
        assert_eq!(version_str, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    #[serial]
    fn init_logging_is_idempotent() {
        assert_eq!(entrovault_init_logging(), EntrovaultError::Ok);
        assert_eq!(entrovault_init_logging(), EntrovaultError::Ok);
    }

    #[test]
    fn hash_and_verify_password() {
        let password = cstr("password123");
        let config = cstr(FAST_HASH);
        let mut hash = ptr::null_mut();
        let result =
            unsafe { entrovault_hash_password(password.as_ptr(), config.as_ptr(), &mut hash) };
        assert_eq!(result, EntrovaultError::Ok);
        let hash = cstr(&unsafe { take_string(hash) });

        let mut matches = false;
        let result = unsafe {
            entrovault_verify_password(password.as_ptr(), hash.as_ptr(), config.as_ptr(), &mut matches)
        };
        assert_eq!(result, EntrovaultError::Ok);
        assert!(matches);

        let wrong = cstr("password124");
        let result = unsafe {
            entrovault_verify_password(wrong.as_ptr(), hash.as_ptr(), config.as_ptr(), &mut matches)
        };
        assert_eq!(result, EntrovaultError::Ok);
        assert!(!matches);
    }

    #[test]
    fn hash_null_arguments() {
        let mut hash = ptr::null_mut();
        let result = unsafe { entrovault_hash_password(ptr::null(), ptr::null(), &mut hash) };
        assert_eq!(result, EntrovaultError::NullPointer);

        let password = cstr("password");
        let result =
            unsafe { entrovault_hash_password(password.as_ptr(), ptr::null(), ptr::null_mut()) };
        assert_eq!(result, EntrovaultError::NullPointer);
    }

    #[test]
    fn hash_invalid_utf8() {
        let bytes = [0xffu8, 0xfe, 0];
        let mut hash = ptr::null_mut();
        let result = unsafe {
            entrovault_hash_password(bytes.as_ptr() as *const c_char, ptr::null(), &mut hash)
        };
        assert_eq!(result, EntrovaultError::InvalidUtf8);
    }

    #[test]
    fn hash_bad_json_config() {
        let password = cstr("password");
        let config = cstr("{not json");
        let mut hash = ptr::null_mut();
        let result =
            unsafe { entrovault_hash_password(password.as_ptr(), config.as_ptr(), &mut hash) };
        assert_eq!(result, EntrovaultError::JsonError);
    }

    #[test]
    fn hash_empty_password() {
        let password = cstr("");
        let config = cstr(FAST_HASH);
        let mut hash = ptr::null_mut();
        let result =
            unsafe { entrovault_hash_password(password.as_ptr(), config.as_ptr(), &mut hash) };
        assert_eq!(result, EntrovaultError::InvalidArgument);
    }

    #[test]
    fn verify_malformed_hash() {
        let password = cstr("password");
        let hash = cstr("!!not base64!!");
        let mut matches = true;
        let result = unsafe {
            entrovault_verify_password(password.as_ptr(), hash.as_ptr(), ptr::null(), &mut matches)
        };
        assert_eq!(result, EntrovaultError::InvalidArgument);
    }

    #[test]
    fn durable_encryptors_share_envelopes() {
        let a = new_encryptor(None, r#"["entropy","14235","true"]"#);
        let b = new_encryptor(None, r#"["entropy","14235","true"]"#);

        let envelope = encrypt(a, "secret text");
        assert_eq!(decrypt(b, &envelope).unwrap(), "secret text");

        unsafe {
            entrovault_encryptor_free(a);
            entrovault_encryptor_free(b);
        }
    }

    #[test]
    fn ephemeral_encryptor_is_instance_bound() {
        let config = Some(r#"{"profile":"ephemeral"}"#);
        let a = new_encryptor(config, r#"["entropy"]"#);
        let b = new_encryptor(config, r#"["entropy"]"#);

        let envelope = encrypt(a, "scoped");
        assert_eq!(decrypt(a, &envelope).unwrap(), "scoped");
        match decrypt(b, &envelope) {
            Err(EntrovaultError::DecryptionFailed) => {}
            Ok(text) => assert_ne!(text, "scoped"),
            Err(other) => panic!("unexpected error: {other:?}"),
        }

        unsafe {
            entrovault_encryptor_free(a);
            entrovault_encryptor_free(b);
        }
    }

    #[test]
    fn encryptor_new_rejects_bad_entropy_json() {
        let entropy = cstr(r#"{"not":"an array"}"#);
        let mut handle = ptr::null_mut();
        let result = unsafe { entrovault_encryptor_new(ptr::null(), entropy.as_ptr(), &mut handle) };
        assert_eq!(result, EntrovaultError::JsonError);
        assert!(handle.is_null());
    }

    #[test]
    fn encryptor_new_rejects_unknown_cipher() {
        let config = cstr(r#"{"cipher":"rijndael256"}"#);
        let entropy = cstr("[]");
        let mut handle = ptr::null_mut();
        let result =
            unsafe { entrovault_encryptor_new(config.as_ptr(), entropy.as_ptr(), &mut handle) };
        assert_eq!(result, EntrovaultError::JsonError);
    }

    #[test]
    fn decrypt_malformed_envelope() {
        let handle = new_encryptor(None, r#"["entropy"]"#);
        assert_eq!(decrypt(handle, "%%%"), Err(EntrovaultError::InvalidArgument));
        // Valid Base64 but shorter than salt and IV.
        assert_eq!(decrypt(handle, "AAAA"), Err(EntrovaultError::DecryptionFailed));
        unsafe { entrovault_encryptor_free(handle) };
    }

    #[test]
    fn encryptor_null_handle() {
        let text = cstr("text");
        let mut out = ptr::null_mut();
        let result = unsafe {
            entrovault_encryptor_encrypt(ptr::null(), text.as_ptr(), ptr::null(), &mut out)
        };
        assert_eq!(result, EntrovaultError::NullPointer);
        unsafe { entrovault_encryptor_free(ptr::null_mut()) };
    }

    #[test]
    fn interior_nul_output_is_invalid_argument() {
        let mut out = ptr::null_mut();
        let result = unsafe { write_string(&mut out, "before\0after".to_string()) };
        assert_eq!(result, EntrovaultError::InvalidArgument);
        assert!(out.is_null());

        let result = unsafe { write_string(&mut out, "clean".to_string()) };
        assert_eq!(result, EntrovaultError::Ok);
        assert_eq!(unsafe { take_string(out) }, "clean");
    }

    #[test]
    fn error_mapping() {
        assert_eq!(
            EntrovaultError::from(&CryptoError::Decryption("x".into())),
            EntrovaultError::DecryptionFailed
        );
        assert_eq!(
            EntrovaultError::from(&CryptoError::UnknownAlgorithm("x".into())),
            EntrovaultError::InvalidArgument
        );
        assert_eq!(
            EntrovaultError::from(&CryptoError::Random("x".into())),
            EntrovaultError::CryptoError
        );
    }
}
