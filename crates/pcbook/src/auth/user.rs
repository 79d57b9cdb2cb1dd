//! Account records.

use std::fmt;

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

use super::{AuthError, Role};

/// A login account. The password is only ever held as an Argon2 PHC string.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    /// Unique login name
    pub username: String,
    /// Salted Argon2 hash in PHC format
    pub hashed_password: String,
    /// What the account may do
    pub role: Role,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl User {
    /// Create an account, hashing `password` with a fresh random salt.
    pub fn new(
        username: impl Into<String>,
        password: &str,
        role: Role,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            username: username.into(),
            hashed_password: hash_password(password)?,
            role,
        })
    }

    /// Check `password` against the stored hash.
    ///
    /// A corrupt stored hash never matches.
    pub fn is_correct_password(&self, password: &str) -> bool {
        match PasswordHash::new(&self.hashed_password) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| AuthError::Hash(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::Hash(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(phc.to_string())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_password_is_never_stored_in_plaintext() {
        let user = User::new("admin1", "secret", Role::Admin).unwrap();
        assert_ne!(user.hashed_password, "secret");
        assert!(user.hashed_password.starts_with("$argon2"));
    }

    #[test]
    fn test_password_check() {
        let user = User::new("admin1", "secret", Role::Admin).unwrap();
        assert!(user.is_correct_password("secret"));
        assert!(!user.is_correct_password("Secret"));
        assert!(!user.is_correct_password(""));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let a = User::new("a", "secret", Role::User).unwrap();
        let b = User::new("b", "secret", Role::User).unwrap();
        assert_ne!(a.hashed_password, b.hashed_password);
    }

    #[test]
    fn test_corrupt_hash_never_matches() {
        let mut user = User::new("a", "secret", Role::User).unwrap();
        user.hashed_password = "not-a-phc-string".to_string();
        assert!(!user.is_correct_password("secret"));
    }

    #[test]
    fn test_debug_hides_hash() {
        let user = User::new("admin1", "secret", Role::Admin).unwrap();
        let rendered = format!("{user:?}");
        assert!(rendered.contains("admin1"));
        assert!(!rendered.contains(&user.hashed_password));
    }
}
