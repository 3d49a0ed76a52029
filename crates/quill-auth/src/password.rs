//! Password hashing and verification using Argon2id

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

/// Error types for password operations
#[derive(Error, Debug)]
pub enum PasswordError {
    /// The presented password does not match the stored hash
    #[error("Password does not match")]
    Mismatch,

    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHashFormat(String),
}

/// Hash a password using Argon2id with a fresh random salt.
///
/// Returns a PHC-formatted hash string suitable for storage. Hashing the
/// same password twice yields different strings; equality checks must go
/// through [`verify_password`], never direct comparison.
///
/// # Example
/// ```
/// use quill_auth::password::hash_password;
///
/// let hash = hash_password("MySecurePassword123!").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    // Argon2id with the crate's OWASP-aligned defaults
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a password against a stored PHC-formatted hash.
///
/// A wrong password is an error ([`PasswordError::Mismatch`]), not a `false`
/// return, so calling code propagates a uniform invalid-credentials failure
/// with `?`.
///
/// # Example
/// ```
/// use quill_auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("MyPassword123!").unwrap();
/// assert!(verify_password("MyPassword123!", &hash).is_ok());
/// assert!(verify_password("WrongPassword", &hash).is_err());
/// ```
pub fn verify_password(password: &str, hash: &str) -> Result<(), PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHashFormat(e.to_string()))?;

    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(()),
        Err(argon2::password_hash::Error::Password) => Err(PasswordError::Mismatch),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_produces_valid_hash() {
        let password = "TestPassword123!";
        let hash = hash_password(password).expect("Failed to hash password");

        // PHC string with algorithm, version, params, salt and hash
        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m="));
        assert!(hash.contains("t="));
        assert!(hash.contains("p="));
    }

    #[test]
    fn test_verify_password_correct() {
        let password = "CorrectPassword123!";
        let hash = hash_password(password).expect("Failed to hash password");

        assert!(verify_password(password, &hash).is_ok());
    }

    #[test]
    fn test_verify_password_incorrect_fails() {
        let password = "CorrectPassword123!";
        let hash = hash_password(password).expect("Failed to hash password");

        let result = verify_password("WrongPassword123!", &hash);
        assert!(matches!(result, Err(PasswordError::Mismatch)));
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        let result = verify_password("AnyPassword", "invalid_hash_format");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat(_))));
    }

    #[test]
    fn test_hash_password_different_salts() {
        let password = "SamePassword123!";
        let hash1 = hash_password(password).expect("Failed to hash password");
        let hash2 = hash_password(password).expect("Failed to hash password");

        // Same password, different salts, different hashes
        assert_ne!(hash1, hash2);

        // Both verify against the original password
        assert!(verify_password(password, &hash1).is_ok());
        assert!(verify_password(password, &hash2).is_ok());
    }

    #[test]
    fn test_hash_password_unicode() {
        let password = "🔐Password123!日本語";
        let hash = hash_password(password).expect("Failed to hash unicode password");
        assert!(verify_password(password, &hash).is_ok());
    }

    #[test]
    fn test_verify_password_case_sensitive() {
        let password = "TestPassword123!";
        let hash = hash_password(password).expect("Failed to hash password");

        assert!(verify_password("TestPassword123!", &hash).is_ok());
        assert!(verify_password("testpassword123!", &hash).is_err());
        assert!(verify_password("TESTPASSWORD123!", &hash).is_err());
    }
}
