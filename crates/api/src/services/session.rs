//! Session credential codec and cookie plumbing.
//!
//! Identity is carried in an HTTP-only cookie holding a signed, stateless
//! credential: a JWT whose only claim of interest is the user id. Verifying a
//! credential proves possession, nothing more; the bearer is re-resolved
//! against the user store on every request, so deleted users and stale
//! permission sets never survive in the token itself.

use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::Error as JwtError};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use thimble_core::UserId;

/// Cookie under which the session credential travels.
pub const SESSION_COOKIE: &str = "token";

/// How long an issued credential stays valid.
const SESSION_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Errors from signing session credentials.
///
/// Verification failures are deliberately not errors: an unverifiable
/// credential is simply no identity.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to sign session credential: {0}")]
    Signing(#[from] JwtError),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// The user id the credential asserts.
    sub: i64,
    /// Expiry, seconds since the epoch.
    exp: i64,
    /// Issued-at, seconds since the epoch.
    iat: i64,
}

/// Signs and verifies session credentials with a single symmetric secret.
#[derive(Clone)]
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec").finish_non_exhaustive()
    }
}

impl SessionCodec {
    /// Build a codec from the application secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(bytes),
            decoding_key: DecodingKey::from_secret(bytes),
        }
    }

    /// Issue a signed credential asserting `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Signing` if the JWT library fails, which with a
    /// symmetric key only happens on serialization problems.
    pub fn sign(&self, user_id: UserId) -> Result<String, SessionError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.as_i64(),
            exp: now + SESSION_TTL_SECS,
            iat: now,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify a credential and extract the asserted user id.
    ///
    /// Returns `None` for anything unverifiable: bad signature, expired,
    /// malformed. Callers treat that as "no identity", never as an error.
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<UserId> {
        let validation = Validation::new(Algorithm::HS256);
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation).ok()?;
        Some(UserId::new(data.claims.sub))
    }
}

/// Build the session cookie carrying `token`.
///
/// HTTP-only and same-site so scripts never read it and cross-site posts
/// never send it.
#[must_use]
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS))
        .build()
}

/// Build the removal cookie that clears the session.
#[must_use]
pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn codec() -> SessionCodec {
        SessionCodec::new(&SecretString::from("test-signing-secret-0123456789ab"))
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let codec = codec();
        let token = codec.sign(UserId::new(42)).unwrap();
        assert_eq!(codec.verify(&token), Some(UserId::new(42)));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let codec = codec();
        let token = codec.sign(UserId::new(42)).unwrap();

        // Flip a character in the payload segment.
        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        let mut payload: Vec<char> = parts[1].chars().collect();
        payload[0] = if payload[0] == 'A' { 'B' } else { 'A' };
        parts[1] = payload.into_iter().collect();
        let tampered = parts.join(".");

        assert_eq!(codec.verify(&tampered), None);
    }

    #[test]
    fn test_wrong_key_rejected() {
        let codec = codec();
        let other = SessionCodec::new(&SecretString::from("another-signing-secret-0123456"));
        let token = codec.sign(UserId::new(7)).unwrap();
        assert_eq!(other.verify(&token), None);
    }

    #[test]
    fn test_garbage_is_no_identity() {
        assert_eq!(codec().verify("not-a-credential"), None);
        assert_eq!(codec().verify(""), None);
    }

    #[test]
    fn test_session_cookie_flags() {
        let cookie = session_cookie("abc".to_owned());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }
}
