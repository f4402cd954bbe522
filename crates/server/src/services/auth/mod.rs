//! Credential store.
//!
//! Owns user accounts: registration, password verification and account
//! changes. Passwords are hashed with Argon2id and only the PHC string is
//! ever stored.

mod error;

pub use error::AuthError;

use std::collections::BTreeSet;
use std::sync::Arc;

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use game_review_core::{Email, Role, UserId, Username, ValidationError};

use crate::db::UserRepository;
use crate::models::{NewUser, User, UserChanges, UserUpdate};

/// Argon2id memory cost in KiB.
pub const ARGON2_MEMORY_KIB: u32 = 19_456;
/// Argon2id passes over memory.
pub const ARGON2_ITERATIONS: u32 = 2;
/// Argon2id lanes.
pub const ARGON2_PARALLELISM: u32 = 1;

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Verified against when the username is unknown, so both failure paths do
/// the same amount of work.
const DUMMY_PASSWORD: &str = "no account has this password";

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
}

impl PasswordPolicy {
    /// The documented production cost.
    #[must_use]
    pub const fn production() -> Self {
        Self {
            memory_kib: ARGON2_MEMORY_KIB,
            iterations: ARGON2_ITERATIONS,
            parallelism: ARGON2_PARALLELISM,
        }
    }

    /// Minimum legal cost. Only for test suites.
    #[must_use]
    pub const fn for_tests() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn hasher(self) -> Result<Argon2<'static>, AuthError> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|_| AuthError::PasswordHash)?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash with a fresh random salt.
    ///
    /// # Errors
    ///
    /// `AuthError::PasswordHash` if the parameters or hasher fail.
    pub fn hash(self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.hasher()?
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AuthError::PasswordHash)
    }

    /// Verify against a PHC string. The cost comes from the hash itself.
    ///
    /// # Errors
    ///
    /// `AuthError::InvalidCredentials` on mismatch or an unparsable hash.
    pub fn verify(self, password: &str, hash: &str) -> Result<(), AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
        self.hasher()?
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AuthError::InvalidCredentials)
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::production()
    }
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    const FIELD: &str = "password";

    let length = password.chars().count();
    if length == 0 {
        return Err(ValidationError::Missing { field: FIELD });
    }
    if length < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: FIELD,
            min: MIN_PASSWORD_LENGTH,
        });
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong {
            field: FIELD,
            max: MAX_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

/// Account operations over a [`UserRepository`].
#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<dyn UserRepository>,
    policy: PasswordPolicy,
    dummy_hash: Arc<str>,
}

impl CredentialStore {
    /// # Errors
    ///
    /// `AuthError::PasswordHash` if `policy` is not a usable Argon2 setting.
    pub fn new(users: Arc<dyn UserRepository>, policy: PasswordPolicy) -> Result<Self, AuthError> {
        let dummy_hash = policy.hash(DUMMY_PASSWORD)?.into();
        Ok(Self {
            users,
            policy,
            dummy_hash,
        })
    }

    // =========================================================================
    // Registration & Login
    // =========================================================================

    /// Create an account holding the `member` role.
    ///
    /// Uniqueness is decided by the store, so two concurrent registrations
    /// of one username produce exactly one account.
    ///
    /// # Errors
    ///
    /// `Validation` for malformed input, `DuplicateUsername` if taken.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<User, AuthError> {
        let username = Username::parse(username)?;
        let email = Email::parse(email)?;
        validate_password(password)?;

        let password_hash = self.policy.hash(password)?;

        let user = self
            .users
            .insert_user(NewUser {
                username,
                email,
                password_hash,
                roles: BTreeSet::from([Role::Member]),
            })
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Check a username/password pair.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` for an unknown or malformed username and for a
    /// wrong password alike.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let user = match Username::parse(username) {
            Ok(username) => self.users.user_by_username(&username).await?,
            Err(_) => None,
        };

        let Some(user) = user else {
            // Same work as a real mismatch, same answer.
            let _ = self.policy.verify(password, &self.dummy_hash);
            tracing::debug!("login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        if self.policy.verify(password, &user.password_hash).is_err() {
            tracing::debug!("login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        tracing::debug!(user_id = %user.id, "login accepted");
        Ok(user)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// # Errors
    ///
    /// `Validation` for a malformed address.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let email = Email::parse(email)?;
        Ok(self.users.user_by_email(&email).await?)
    }

    /// # Errors
    ///
    /// `Validation` for a malformed username.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        let username = Username::parse(username)?;
        Ok(self.users.user_by_username(&username).await?)
    }

    /// # Errors
    ///
    /// Repository failures only.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AuthError> {
        Ok(self.users.user_by_id(id).await?)
    }

    /// # Errors
    ///
    /// `NotFound` when no account has this id.
    pub async fn get(&self, id: UserId) -> Result<User, AuthError> {
        self.find_by_id(id).await?.ok_or(AuthError::NotFound)
    }

    /// # Errors
    ///
    /// Repository failures only.
    pub async fn list(&self) -> Result<Vec<User>, AuthError> {
        Ok(self.users.list_users().await?)
    }

    // =========================================================================
    // Changes
    // =========================================================================

    /// Change username, email or password. A new password is re-hashed.
    ///
    /// # Errors
    ///
    /// `Validation`, `DuplicateUsername`, or `NotFound`.
    pub async fn update(&self, id: UserId, update: UserUpdate) -> Result<User, AuthError> {
        let username = update.username.as_deref().map(Username::parse).transpose()?;
        let email = update.email.as_deref().map(Email::parse).transpose()?;
        let password_hash = match update.password.as_deref() {
            Some(password) => {
                validate_password(password)?;
                Some(self.policy.hash(password)?)
            }
            None => None,
        };

        let user = self
            .users
            .update_user(
                id,
                UserChanges {
                    username,
                    email,
                    password_hash,
                    roles: None,
                },
            )
            .await?;

        tracing::info!(user_id = %user.id, "user updated");
        Ok(user)
    }

    /// Replace the role set.
    ///
    /// # Errors
    ///
    /// `NotFound` when no account has this id.
    pub async fn set_roles(&self, id: UserId, roles: BTreeSet<Role>) -> Result<User, AuthError> {
        let user = self
            .users
            .update_user(
                id,
                UserChanges {
                    roles: Some(roles),
                    ..UserChanges::default()
                },
            )
            .await?;

        tracing::info!(user_id = %user.id, roles = ?user.roles, "roles changed");
        Ok(user)
    }

    /// Add one role, keeping the others.
    ///
    /// # Errors
    ///
    /// `NotFound` when no account has this id.
    pub async fn grant_role(&self, id: UserId, role: Role) -> Result<User, AuthError> {
        let mut roles = self.get(id).await?.roles;
        roles.insert(role);
        self.set_roles(id, roles).await
    }

    /// Remove the account together with every review it wrote.
    ///
    /// # Errors
    ///
    /// `NotFound` when no account has this id.
    pub async fn delete(&self, id: UserId) -> Result<(), AuthError> {
        self.users.delete_user(id).await?;
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }
}
