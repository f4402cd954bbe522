//! Bearer token issuance and validation.
//!
//! Tokens are compact HS256 JWTs carrying `sub` (user id), `name`, `roles`,
//! `iss`, `aud`, `iat` and `exp`. Validation is stateless: claims reflect the
//! account as it was when the token was issued, and an edited or deleted
//! account keeps a working token until it expires.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use game_review_core::{Capability, Role, UserId};

use crate::models::User;

/// Token errors.
///
/// Every validation failure is the single `Invalid` value; the reason is
/// only logged at debug level.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,

    #[error("signing key must not be empty")]
    EmptySigningKey,

    #[error("token signing failed")]
    Signing,
}

/// Resolved token settings.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    signing_key: SecretString,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl TokenSettings {
    /// Default token lifetime in hours.
    pub const DEFAULT_LIFETIME_HOURS: i64 = 24;

    /// # Errors
    ///
    /// `EmptySigningKey` when the key has no bytes.
    pub fn new(
        signing_key: SecretString,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        lifetime: Duration,
    ) -> Result<Self, TokenError> {
        if signing_key.expose_secret().is_empty() {
            return Err(TokenError::EmptySigningKey);
        }
        Ok(Self {
            signing_key,
            issuer: issuer.into(),
            audience: audience.into(),
            lifetime,
        })
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    #[must_use]
    pub const fn lifetime(&self) -> Duration {
        self.lifetime
    }
}

/// The validated content of a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub roles: BTreeSet<Role>,
}

impl Identity {
    /// True if any held role grants `capability`.
    #[must_use]
    pub fn can(&self, capability: Capability) -> bool {
        self.roles.iter().any(|role| role.grants(capability))
    }

    /// True if this identity is the given user.
    #[must_use]
    pub fn is(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

/// A freshly signed token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    name: String,
    #[serde(default)]
    roles: Vec<String>,
    iss: String,
    aud: String,
    iat: i64,
    exp: i64,
}

/// Signs and checks bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    settings: TokenSettings,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    #[must_use]
    pub fn new(settings: TokenSettings) -> Self {
        let secret = settings.signing_key.expose_secret().as_bytes();
        let encoding_key = EncodingKey::from_secret(secret);
        let decoding_key = DecodingKey::from_secret(secret);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_required_spec_claims(&["sub", "iss", "aud", "exp"]);
        validation.leeway = 0;
        // Expiry is checked against the caller's clock in `validate_at`.
        validation.validate_exp = false;

        Self {
            settings,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Issue a token for `user`, valid from now for the configured lifetime.
    ///
    /// # Errors
    ///
    /// `TokenError::Signing` if encoding fails.
    pub fn issue(&self, user: &User) -> Result<IssuedToken, TokenError> {
        self.issue_at(user, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// `now` is truncated to whole seconds so `iat`, `exp` and the returned
    /// `expires_at` describe the same instants.
    ///
    /// # Errors
    ///
    /// `TokenError::Signing` if encoding fails.
    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let now = DateTime::from_timestamp(now.timestamp(), 0).ok_or(TokenError::Signing)?;
        let expires_at = now + self.settings.lifetime;
        let claims = Claims {
            sub: user.id.to_string(),
            name: user.username.to_string(),
            roles: user.roles.iter().map(|role| role.code().to_owned()).collect(),
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                tracing::error!(error = %e, "failed to sign token");
                TokenError::Signing
            })?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Validate against the current time.
    ///
    /// # Errors
    ///
    /// `TokenError::Invalid` for any defect.
    pub fn validate(&self, token: &str) -> Result<Identity, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Validate as if the current time were `now`.
    ///
    /// A token is accepted up to and including the instant of its `exp`.
    ///
    /// # Errors
    ///
    /// `TokenError::Invalid` for any defect.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::InvalidSignature => "bad signature",
                ErrorKind::InvalidAlgorithm => "algorithm not allowed",
                ErrorKind::InvalidIssuer => "wrong issuer",
                ErrorKind::InvalidAudience => "wrong audience",
                ErrorKind::MissingRequiredClaim(_) => "missing claim",
                _ => "malformed",
            };
            tracing::debug!(reason, "token rejected");
            TokenError::Invalid
        })?;
        let claims = data.claims;

        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or_else(|| {
            tracing::debug!(reason = "exp out of range", "token rejected");
            TokenError::Invalid
        })?;
        if now > expires_at {
            tracing::debug!(reason = "expired", "token rejected");
            return Err(TokenError::Invalid);
        }

        let user_id = claims.sub.parse::<UserId>().map_err(|_| {
            tracing::debug!(reason = "unparsable subject", "token rejected");
            TokenError::Invalid
        })?;

        let roles = claims
            .roles
            .iter()
            .map(|code| code.parse::<Role>())
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(|_| {
                tracing::debug!(reason = "unknown role", "token rejected");
                TokenError::Invalid
            })?;

        Ok(Identity {
            user_id,
            username: claims.name,
            roles,
        })
    }
}
