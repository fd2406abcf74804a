//! Argon2id password hashing. Hashes are stored as PHC strings, so
//! parameters travel with the hash and can be raised later without
//! invalidating existing accounts.

use argon2::password_hash::{
    rand_core::OsRng, Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier,
    SaltString,
};
use argon2::Argon2;

/// Hashes a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
    Ok(hash.to_string())
}

/// Checks a plaintext password against a stored PHC hash string.
/// A mismatch is `Ok(false)`; only an unparseable or corrupt stored
/// hash is an error.
pub fn verify_password(password: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| anyhow::anyhow!("stored hash is not a valid PHC string: {e}"))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("password verification failed: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_distinguishes_right_and_wrong_passwords() {
        let hash = hash_password("orgdash-admin-pw").unwrap();
        assert!(verify_password("orgdash-admin-pw", &hash).unwrap());
        assert!(!verify_password("orgdash-admin-pW", &hash).unwrap());
    }

    #[test]
    fn same_password_hashes_differently_each_time() {
        let first = hash_password("repeatable").unwrap();
        let second = hash_password("repeatable").unwrap();
        assert_ne!(first, second);
        assert!(verify_password("repeatable", &first).unwrap());
        assert!(verify_password("repeatable", &second).unwrap());
    }

    #[test]
    fn malformed_stored_hash_is_an_error_not_a_mismatch() {
        let err = verify_password("whatever", "not-a-phc-string").unwrap_err();
        assert!(err.to_string().contains("not a valid PHC string"));
    }
}
