//! Password hashing and verification using Argon2id.

use anyhow::{Result, anyhow};
use argon2::password_hash::{PasswordHash, SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

/// Hash a plaintext password with Argon2id and a fresh random salt.
///
/// Two calls with the same input produce different digests (unique
/// salts); the PHC string embeds salt and parameters.
///
/// # Errors
/// Returns an error only if the underlying hasher fails, which is
/// unexpected under normal operation.
pub(crate) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("failed to hash password: {e}"))?;
    Ok(digest.to_string())
}

/// Verify a plaintext password against a stored PHC-format digest.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch.
///
/// # Errors
/// Returns an error if the stored digest is malformed.
pub(crate) fn verify_password(password: &str, digest: &str) -> Result<bool> {
    let parsed = PasswordHash::new(digest).map_err(|e| anyhow!("invalid password hash: {e}"))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("password verification error: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_matches() -> Result<()> {
        let digest = hash_password("hunter2")?;
        assert!(verify_password("hunter2", &digest)?);
        Ok(())
    }

    #[test]
    fn wrong_password_does_not_match() -> Result<()> {
        let digest = hash_password("hunter2")?;
        assert!(!verify_password("wrong", &digest)?);
        Ok(())
    }

    #[test]
    fn identical_inputs_produce_unique_digests() -> Result<()> {
        let first = hash_password("hunter2")?;
        let second = hash_password("hunter2")?;
        assert_ne!(first, second);
        assert!(verify_password("hunter2", &first)?);
        assert!(verify_password("hunter2", &second)?);
        Ok(())
    }

    #[test]
    fn malformed_digest_returns_error() {
        assert!(verify_password("pw", "not-a-hash").is_err());
    }
}
