//! Accounts and signed access tokens.
//!
//! Passwords are kept as salted Argon2 hashes and checked with the hash
//! verifier only. Access tokens are HS256 JWTs carrying the subject and its
//! [`Role`], verifiable without a round trip to whoever issued them.

mod jwt;
mod user;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use jwt::{Claims, JwtManager};
pub use user::User;

/// Errors from credential handling.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The signing secret is empty
    #[error("token signing secret must not be empty")]
    EmptySecret,
    /// The token lifetime rounds down to zero seconds
    #[error("token duration must be at least one second")]
    ZeroDuration,
    /// The token lifetime exceeds [`JwtManager::MAX_TOKEN_DURATION`]
    #[error("token duration must not exceed one year")]
    DurationTooLong,
    /// The token is malformed, forged or expired
    #[error("invalid token: {0}")]
    InvalidToken(String),
    /// Password hashing failed
    #[error("cannot hash password: {0}")]
    Hash(String),
    /// Claims could not be encoded
    #[error("cannot encode claims: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// The closed set of account roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May create laptops and upload images
    Admin,
    /// May rate laptops
    User,
}

impl Role {
    /// The lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role: {other}")),
        }
    }
}
