//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GRS_JWT_KEY` - Token signing key (min 32 chars, high entropy)
//!
//! ## Optional
//! - `GRS_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; without either the server keeps data in memory)
//! - `GRS_HOST` - Bind address (default: 127.0.0.1)
//! - `GRS_PORT` - Listen port (default: 3000)
//! - `GRS_JWT_ISSUER` - Token issuer (default: game-review-system)
//! - `GRS_JWT_AUDIENCE` - Token audience (default: game-review-clients)
//! - `GRS_JWT_LIFETIME_HOURS` - Token lifetime, 1-720 (default: 24)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name (e.g. production)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::services::{TokenError, TokenSettings};

const MIN_SIGNING_KEY_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const MAX_TOKEN_LIFETIME_HOURS: i64 = 720;

pub const DEFAULT_ISSUER: &str = "game-review-system";
pub const DEFAULT_AUDIENCE: &str = "game-review-clients";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
///
/// Implements `Debug` manually to redact the signing key and database URL.
#[derive(Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` connection URL; `None` selects the in-memory store
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// HS256 signing key
    pub jwt_key: SecretString,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    /// Token lifetime in hours
    pub jwt_lifetime_hours: i64,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_key", &"[REDACTED]")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("jwt_lifetime_hours", &self.jwt_lifetime_hours)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the signing key fails validation (length, placeholder, entropy).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&env);

        let database_url = env.database_url("GRS_DATABASE_URL");
        let host = env
            .or_default("GRS_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("GRS_HOST".to_string(), e.to_string()))?;
        let port = env
            .or_default("GRS_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("GRS_PORT".to_string(), e.to_string()))?;

        let jwt_key = env.validated_secret("GRS_JWT_KEY")?;
        validate_key_length(&jwt_key, "GRS_JWT_KEY")?;

        let jwt_issuer = env.or_default("GRS_JWT_ISSUER", DEFAULT_ISSUER);
        let jwt_audience = env.or_default("GRS_JWT_AUDIENCE", DEFAULT_AUDIENCE);
        let jwt_lifetime_hours = parse_lifetime(&env.or_default(
            "GRS_JWT_LIFETIME_HOURS",
            &TokenSettings::DEFAULT_LIFETIME_HOURS.to_string(),
        ))?;
        let sentry_dsn = env.optional("SENTRY_DSN");
        let sentry_environment = env.optional("SENTRY_ENVIRONMENT");

        Ok(Self {
            database_url,
            host,
            port,
            jwt_key,
            jwt_issuer,
            jwt_audience,
            jwt_lifetime_hours,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Token settings derived from the `GRS_JWT_*` values.
    ///
    /// # Errors
    ///
    /// `EmptySigningKey` if the key is empty.
    pub fn token_settings(&self) -> Result<TokenSettings, TokenError> {
        TokenSettings::new(
            self.jwt_key.clone(),
            self.jwt_issuer.clone(),
            self.jwt_audience.clone(),
            chrono::Duration::hours(self.jwt_lifetime_hours),
        )
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional environment variable. Empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.is_empty())
    }

    /// Get a required environment variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an environment variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Option<SecretString> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
    }

    /// Load and validate a secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
}

fn parse_lifetime(raw: &str) -> Result<i64, ConfigError> {
    let invalid = |reason: String| {
        ConfigError::InvalidEnvVar("GRS_JWT_LIFETIME_HOURS".to_string(), reason)
    };
    let hours = raw.parse::<i64>().map_err(|e| invalid(e.to_string()))?;
    if !(1..=MAX_TOKEN_LIFETIME_HOURS).contains(&hours) {
        return Err(invalid(format!(
            "must be between 1 and {MAX_TOKEN_LIFETIME_HOURS} (got {hours})"
        )));
    }
    Ok(hours)
}

/// Validate that a signing key meets minimum length requirements.
fn validate_key_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let len = secret.expose_secret().chars().count();
    if len < MIN_SIGNING_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_SIGNING_KEY_LENGTH} characters (got {len})"),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated key."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const GOOD_KEY: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_high() {
        assert!(shannon_entropy(GOOD_KEY) > MIN_ENTROPY_BITS_PER_CHAR);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-signing-key-here", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
        assert!(validate_secret_strength("changeme123", "TEST_VAR").is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"ab".repeat(20), "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("GRS_JWT_KEY", GOOD_KEY)]).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.jwt_issuer, DEFAULT_ISSUER);
        assert_eq!(config.jwt_audience, DEFAULT_AUDIENCE);
        assert_eq!(config.jwt_lifetime_hours, 24);
        assert!(config.sentry_dsn.is_none());

        let settings = config.token_settings().unwrap();
        assert_eq!(settings.lifetime(), chrono::Duration::hours(24));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("GRS_JWT_KEY", GOOD_KEY),
            ("GRS_HOST", "0.0.0.0"),
            ("GRS_PORT", "8080"),
            ("GRS_JWT_ISSUER", "reviews"),
            ("GRS_JWT_LIFETIME_HOURS", "720"),
            ("DATABASE_URL", "postgres://fallback/db"),
        ])
        .unwrap();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.jwt_issuer, "reviews");
        assert_eq!(config.jwt_lifetime_hours, 720);
        assert_eq!(
            config.database_url.unwrap().expose_secret(),
            "postgres://fallback/db"
        );
    }

    #[test]
    fn test_primary_database_url_wins() {
        let config = load(&[
            ("GRS_JWT_KEY", GOOD_KEY),
            ("GRS_DATABASE_URL", "postgres://primary/db"),
            ("DATABASE_URL", "postgres://fallback/db"),
        ])
        .unwrap();
        assert_eq!(
            config.database_url.unwrap().expose_secret(),
            "postgres://primary/db"
        );
    }

    #[test]
    fn test_missing_key() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingEnvVar(key)) if key == "GRS_JWT_KEY"));
    }

    #[test]
    fn test_short_key() {
        let result = load(&[("GRS_JWT_KEY", "aB3$xY9!mK2@nL5#")]);
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_lifetime_bounds() {
        for bad in ["0", "721", "-1", "day"] {
            let result = load(&[("GRS_JWT_KEY", GOOD_KEY), ("GRS_JWT_LIFETIME_HOURS", bad)]);
            assert!(
                matches!(result, Err(ConfigError::InvalidEnvVar(_, _))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_invalid_port() {
        let result = load(&[("GRS_JWT_KEY", GOOD_KEY), ("GRS_PORT", "70000")]);
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&[
            ("GRS_JWT_KEY", GOOD_KEY),
            ("GRS_DATABASE_URL", "postgres://user:hunter2@db/reviews"),
        ])
        .unwrap();
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(GOOD_KEY));
        assert!(!debug_output.contains("hunter2"));
    }
}
