//! Account passwords: length policy plus Argon2id hashing
//!
//! Only the PHC string produced here is ever stored.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::BattleError;

/// Shortest password accepted at signup
pub const MIN_PASSWORD_LEN: usize = 6;

/// Reject passwords that are too short to store
pub fn check_password_policy(password: &str) -> Result<(), BattleError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(BattleError::InvalidArgument(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Hash a password with a fresh salt, returning the PHC string
pub fn hash_password(password: &str) -> Result<String, BattleError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| BattleError::Internal(format!("Failed to hash password: {e}")))
}

/// Check a login attempt against a stored PHC string
///
/// A malformed stored hash is a server-side fault, not a failed login.
pub fn verify_password(candidate: &str, stored: &str) -> Result<bool, BattleError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| BattleError::Internal(format!("Stored password hash unreadable: {e}")))?;

    Ok(Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_attempts() {
        let stored = hash_password("meow-meow-42").unwrap();

        assert!(stored.starts_with("$argon2id$"));
        assert!(verify_password("meow-meow-42", &stored).unwrap());
        assert!(!verify_password("meow-meow-43", &stored).unwrap());
    }

    #[test]
    fn test_each_hash_is_salted() {
        let first = hash_password("hunter22").unwrap();
        let second = hash_password("hunter22").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_unreadable_stored_hash() {
        assert!(matches!(
            verify_password("anything", "plaintext-oops"),
            Err(BattleError::Internal(_))
        ));
    }

    #[test]
    fn test_policy() {
        assert!(check_password_policy("12345").is_err());
        assert!(check_password_policy("123456").is_ok());
        // counted in characters, not bytes
        assert!(check_password_policy("ééééé").is_err());
    }
}
