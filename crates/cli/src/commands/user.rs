//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! # Register a user with a role
//! grs-cli user create -u alice -e alice@example.com -p 'correct horse' -r admin
//!
//! # Promote an existing user to admin
//! grs-cli user promote -u alice
//! ```
//!
//! Both go through the same credential store as the HTTP API, so the
//! password policy, username rules and uniqueness checks are identical.
//!
//! # Environment Variables
//!
//! - `GRS_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)

use std::sync::Arc;

use game_review_core::{Role, UserId};
use game_review_server::db::PgStore;
use game_review_server::services::{AuthError, CredentialStore, PasswordPolicy};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: member, admin")]
    InvalidRole(String),

    /// No account with that username.
    #[error("No user named {0}")]
    UnknownUser(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

async fn credential_store() -> Result<CredentialStore, UserError> {
    let pool = connect().await?;
    let store = Arc::new(PgStore::new(pool));
    Ok(CredentialStore::new(store, PasswordPolicy::production())?)
}

/// Register a user, then give them `role` in addition to `member`.
///
/// # Returns
///
/// The ID of the created user.
pub async fn create(
    username: &str,
    email: &str,
    password: &str,
    role: &str,
) -> Result<UserId, UserError> {
    let role: Role = role
        .parse()
        .map_err(|_| UserError::InvalidRole(role.to_owned()))?;

    let credentials = credential_store().await?;

    tracing::info!("Creating user: {} ({})", username, role);
    let mut user = credentials.register(username, password, email).await?;
    if !user.roles.contains(&role) {
        user = credentials.grant_role(user.id, role).await?;
    }

    tracing::info!(
        "User created successfully! ID: {}, Username: {}, Roles: {:?}",
        user.id,
        user.username,
        user.roles
    );
    Ok(user.id)
}

/// Grant `admin` to an existing user.
pub async fn promote(username: &str) -> Result<UserId, UserError> {
    let credentials = credential_store().await?;

    let user = credentials
        .find_by_username(username)
        .await?
        .ok_or_else(|| UserError::UnknownUser(username.to_owned()))?;

    if user.roles.contains(&Role::Admin) {
        tracing::info!("{} is already an admin", user.username);
        return Ok(user.id);
    }

    let user = credentials.grant_role(user.id, Role::Admin).await?;
    tracing::info!("Promoted {} (ID {}) to admin", user.username, user.id);
    Ok(user.id)
}
