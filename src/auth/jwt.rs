//! Access/refresh JWT issue and validation.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;

/// Access token lifetime: 15 minutes.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
/// Refresh token lifetime: 7 days.
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub exp: i64,
    pub iat: i64,
    /// Unique per token, so two pairs issued in the same second still differ.
    #[serde(default)]
    pub jti: String,
}

/// What verification reads back. `sub` is loosely typed so a missing or
/// non-string identity is reported as malformed rather than undecodable.
#[derive(Debug, Deserialize)]
struct DecodedClaims {
    sub: Option<serde_json::Value>,
    exp: i64,
}

/// Both halves of a login, serialized as `{accessToken, refreshToken}`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// One signing secret with its lifetime.
#[derive(Clone)]
struct TokenKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKey {
    fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    fn issue(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().simple().to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, AuthError> {
        // Expiry is checked below against the caller's clock, with no leeway.
        let mut validation = Validation::default();
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        // Signature is checked before any claim, so claim errors imply a genuine token.
        let data = decode::<DecodedClaims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::MissingRequiredClaim(_) => AuthError::MalformedToken,
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            }
        })?;

        if data.claims.exp < now.timestamp() {
            return Err(AuthError::ExpiredToken);
        }
        data.claims
            .sub
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .and_then(|sub| Uuid::parse_str(sub).ok())
            .ok_or(AuthError::MalformedToken)
    }
}

/// Issues and verifies token pairs. Holds only immutable keys, so it is cheap
/// to clone into request state and safe to share across tasks.
#[derive(Clone)]
pub struct TokenService {
    access: TokenKey,
    refresh: TokenKey,
}

impl TokenService {
    pub fn new(access_secret: &str, refresh_secret: &str) -> Self {
        Self {
            access: TokenKey::new(access_secret, ACCESS_TOKEN_TTL_SECS),
            refresh: TokenKey::new(refresh_secret, REFRESH_TOKEN_TTL_SECS),
        }
    }

    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, AuthError> {
        self.issue_pair_at(user_id, Utc::now())
    }

    pub fn issue_pair_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.access.issue(user_id, now)?,
            refresh_token: self.refresh.issue(user_id, now)?,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Uuid, AuthError> {
        self.verify_access_at(token, Utc::now())
    }

    pub fn verify_access_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, AuthError> {
        self.access.verify(token, now)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Uuid, AuthError> {
        self.verify_refresh_at(token, Utc::now())
    }

    pub fn verify_refresh_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, AuthError> {
        self.refresh.verify(token, now)
    }
}
