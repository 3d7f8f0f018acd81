use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::Principal,
    error::{AuthError, ConfigError, RandomnessError, SigningError},
};

/// Access tokens are valid for five hours after issuance.
pub const ACCESS_TOKEN_TTL: Duration = Duration::hours(5);

/// Refresh secrets outlive access tokens and are rotated on every use.
pub const REFRESH_TOKEN_TTL: Duration = Duration::days(30);

/// SessionClaims
///
/// The payload carried inside every access token. Both `user_id` and `is_admin` are covered
/// by the HMAC, so neither can be changed without invalidating the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    /// Issued At, seconds since the epoch.
    pub iat: i64,
    /// Expiration, seconds since the epoch.
    pub exp: i64,
}

/// TokenService
///
/// Issues and verifies HS256 session tokens. Built once from the configured secret before the
/// server accepts connections and shared read-only through `AppState`, so there is no
/// initialization window another request could observe.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// new
    ///
    /// Derives the signing and verification keys from `secret`.
    ///
    /// # Errors
    /// `ConfigError::EmptySecret` if the secret is empty.
    pub fn new(secret: &str) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// issue
    ///
    /// Mints an access token for `user_id` valid from now until now + 5h.
    pub fn issue(&self, user_id: i64, is_admin: bool) -> Result<String, SigningError> {
        self.issue_at(user_id, is_admin, Utc::now())
    }

    /// Mints an access token as if it had been issued at `issued_at`.
    pub fn issue_at(
        &self,
        user_id: i64,
        is_admin: bool,
        issued_at: DateTime<Utc>,
    ) -> Result<String, SigningError> {
        let claims = SessionClaims {
            user_id,
            is_admin,
            iat: issued_at.timestamp(),
            exp: (issued_at + ACCESS_TOKEN_TTL).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// verify
    ///
    /// Checks structure, then the MAC, then the validity window, in that order. A token whose
    /// signature is wrong reports `BadSignature` even when it is also expired.
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        check_structure(token)?;

        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidToken
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_)
                | ErrorKind::MissingRequiredClaim(_) => AuthError::Malformed,
                _ => AuthError::BadSignature,
            },
        )?;

        // jsonwebtoken treats exp == now as still valid; the session window is half-open.
        if data.claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }

        Ok(Principal {
            user_id: data.claims.user_id,
            is_admin: data.claims.is_admin,
        })
    }

    /// issue_opaque_secret
    ///
    /// 32 bytes from the operating system's entropy source, hex-encoded. Used as the refresh
    /// secret handed to clients; only its digest is persisted.
    pub fn issue_opaque_secret() -> Result<String, RandomnessError> {
        let mut bytes = [0u8; 32];
        getrandom::getrandom(&mut bytes)?;
        Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// The value stored for a refresh secret.
    pub fn refresh_digest(secret: &str) -> String {
        blake3::hash(secret.as_bytes()).to_hex().to_string()
    }
}

/// A token must be three dot-separated segments whose first two decode to JSON objects.
fn check_structure(token: &str) -> Result<(), AuthError> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::Malformed);
    };

    if signature.is_empty() {
        return Err(AuthError::Malformed);
    }

    for segment in [header, payload] {
        let bytes = URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|_| AuthError::Malformed)?;
        match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(serde_json::Value::Object(_)) => {}
            _ => return Err(AuthError::Malformed),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("unit-test-secret").unwrap()
    }

    #[test]
    fn test_token_issued_six_hours_ago_is_expired() {
        let tokens = service();
        let token = tokens
            .issue_at(7, true, Utc::now() - Duration::hours(6))
            .unwrap();

        assert_eq!(tokens.verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn test_token_still_inside_window_verifies() {
        let tokens = service();
        let token = tokens
            .issue_at(7, false, Utc::now() - Duration::hours(4))
            .unwrap();

        let principal = tokens.verify(&token).unwrap();
        assert_eq!(principal.user_id, 7);
        assert!(!principal.is_admin);
    }

    #[test]
    fn test_bad_signature_wins_over_expiry() {
        let token = service()
            .issue_at(7, false, Utc::now() - Duration::hours(6))
            .unwrap();
        let other = TokenService::new("some-other-secret").unwrap();

        assert_eq!(other.verify(&token), Err(AuthError::BadSignature));
    }

    #[test]
    fn test_structure_check() {
        assert_eq!(check_structure(""), Err(AuthError::Malformed));
        assert_eq!(check_structure("a.b"), Err(AuthError::Malformed));
        assert_eq!(check_structure("a.b.c.d"), Err(AuthError::Malformed));
        // "e30" is base64url for "{}"
        assert_eq!(check_structure("e30.e30."), Err(AuthError::Malformed));
        assert!(check_structure("e30.e30.c2ln").is_ok());
        // "WzFd" is "[1]", valid JSON but not an object
        assert_eq!(check_structure("e30.WzFd.c2ln"), Err(AuthError::Malformed));
    }

    #[test]
    fn test_refresh_digest_is_stable_and_hides_secret() {
        let digest = TokenService::refresh_digest("abc");
        assert_eq!(digest, TokenService::refresh_digest("abc"));
        assert_ne!(digest, "abc");
        assert_eq!(digest.len(), 64);
    }
}
