//! HS256 JSON Web Tokens.
//!
//! ## Token Format
//!
//! `base64url(header) "." base64url(claims) "." base64url(signature)`, where
//! the signature is HMAC-SHA256 over the first two segments. Only the `HS256`
//! header is accepted; there is no algorithm negotiation.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::{AuthError, Role, User};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// What a verified token asserts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token was issued to
    pub sub: String,
    /// Role of that account at issuance
    pub role: Role,
    /// Issued-at, seconds since the Unix epoch
    pub iat: u64,
    /// Expiry, seconds since the Unix epoch; always greater than `iat`
    pub exp: u64,
}

/// Issues and verifies access tokens with a shared secret.
#[derive(Clone)]
pub struct JwtManager {
    secret: Vec<u8>,
    token_duration: Duration,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("token_duration", &self.token_duration)
            .finish_non_exhaustive()
    }
}

impl JwtManager {
    /// Default token lifetime.
    pub const DEFAULT_TOKEN_DURATION: Duration = Duration::from_secs(15 * 60);
    /// Longest accepted token lifetime: one year.
    pub const MAX_TOKEN_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

    /// Create a manager. Misconfiguration is reported here, never per call.
    pub fn new(secret: impl Into<Vec<u8>>, token_duration: Duration) -> Result<Self, AuthError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AuthError::EmptySecret);
        }
        if token_duration.as_secs() == 0 {
            return Err(AuthError::ZeroDuration);
        }
        if token_duration > Self::MAX_TOKEN_DURATION {
            return Err(AuthError::DurationTooLong);
        }
        Ok(Self {
            secret,
            token_duration,
        })
    }

    /// Lifetime of issued tokens.
    pub fn token_duration(&self) -> Duration {
        self.token_duration
    }

    /// Issue a token for `user`, valid from now for the configured duration.
    pub fn generate(&self, user: &User) -> Result<String, AuthError> {
        let iat = unix_now();
        let claims = Claims {
            sub: user.username.clone(),
            role: user.role,
            iat,
            exp: iat
                .checked_add(self.token_duration.as_secs())
                .ok_or(AuthError::DurationTooLong)?,
        };
        self.sign(&claims)
    }

    /// Verify a token's structure, signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("malformed token"));
        };

        let header: Header = decode_segment(header)?;
        if header.alg != ALGORITHM {
            return Err(invalid("unexpected signing method"));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| invalid("malformed signature"))?;
        self.mac(header_payload(token))
            .verify_slice(&signature)
            .map_err(|_| invalid("signature mismatch"))?;

        let claims: Claims = decode_segment(payload)?;
        if claims.exp <= claims.iat || claims.exp <= unix_now() {
            return Err(invalid("token has expired"));
        }
        Ok(claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?)
        );
        let signature = self.mac(&signing_input).finalize().into_bytes();
        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    fn mac(&self, input: &str) -> HmacSha256 {
        let mut mac = match HmacSha256::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC accepts any key length"),
        };
        mac.update(input.as_bytes());
        mac
    }
}

/// The `header.payload` prefix that the signature covers.
fn header_payload(token: &str) -> &str {
    token.rsplit_once('.').map_or(token, |(signed, _)| signed)
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| invalid("malformed segment"))?;
    serde_json::from_slice(&bytes).map_err(|_| invalid("malformed segment"))
}

fn invalid(reason: &str) -> AuthError {
    AuthError::InvalidToken(reason.to_string())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new("secret", JwtManager::DEFAULT_TOKEN_DURATION).unwrap()
    }

    fn admin() -> User {
        User {
            username: "admin1".to_string(),
            hashed_password: String::new(),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_round_trip_carries_subject_and_role() {
        let jwt = manager();
        let token = jwt.generate(&admin()).unwrap();
        let claims = jwt.verify(&token).unwrap();

        assert_eq!(claims.sub, "admin1");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_rejects_misconfiguration() {
        assert!(matches!(
            JwtManager::new("", Duration::from_secs(60)),
            Err(AuthError::EmptySecret)
        ));
        assert!(matches!(
            JwtManager::new("secret", Duration::from_millis(500)),
            Err(AuthError::ZeroDuration)
        ));
    }

    #[test]
    fn test_rejects_overlong_duration() {
        assert!(matches!(
            JwtManager::new("secret", Duration::from_secs(u64::MAX)),
            Err(AuthError::DurationTooLong)
        ));
        assert!(matches!(
            JwtManager::new("secret", Duration::MAX),
            Err(AuthError::DurationTooLong)
        ));
        assert!(matches!(
            JwtManager::new("secret", JwtManager::MAX_TOKEN_DURATION + Duration::from_secs(1)),
            Err(AuthError::DurationTooLong)
        ));
    }

    #[test]
    fn test_longest_duration_still_issues_tokens() {
        let jwt = JwtManager::new("secret", JwtManager::MAX_TOKEN_DURATION).unwrap();
        let token = jwt.generate(&admin()).unwrap();
        let claims = jwt.verify(&token).unwrap();
        assert_eq!(
            claims.exp - claims.iat,
            JwtManager::MAX_TOKEN_DURATION.as_secs()
        );
    }

    #[test]
    fn test_rejects_foreign_signature() {
        let other = JwtManager::new("other-secret", Duration::from_secs(60)).unwrap();
        let token = other.generate(&admin()).unwrap();
        assert!(matches!(
            manager().verify(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_rejects_tampered_claims() {
        let jwt = manager();
        let user = User {
            role: Role::User,
            ..admin()
        };
        let token = jwt.generate(&user).unwrap();

        // Swap the payload for one claiming admin, keeping the old signature.
        let forged_claims = Claims {
            sub: "admin1".to_string(),
            role: Role::Admin,
            iat: unix_now(),
            exp: unix_now() + 60,
        };
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        parts[1] = &forged_payload;

        assert!(jwt.verify(&parts.join(".")).is_err());
    }

    #[test]
    fn test_rejects_expired_token() {
        let jwt = manager();
        let now = unix_now();
        let token = jwt
            .sign(&Claims {
                sub: "admin1".to_string(),
                role: Role::Admin,
                iat: now - 120,
                exp: now - 60,
            })
            .unwrap();

        let err = jwt.verify(&token).unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        let jwt = manager();
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.##"] {
            assert!(
                matches!(jwt.verify(token), Err(AuthError::InvalidToken(_))),
                "accepted {token:?}"
            );
        }
    }

    #[test]
    fn test_rejects_other_algorithms() {
        let jwt = manager();
        let token = jwt.generate(&admin()).unwrap();
        let none_header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let (_, rest) = token.split_once('.').unwrap();

        assert!(jwt.verify(&format!("{none_header}.{rest}")).is_err());
    }
}
