//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Credential store: registration, password verification, account
//!   changes
//! - `token` - Bearer token issuance and validation (HS256 JWT)
//! - `catalog` - Games, reviews, referential integrity and average ratings
//!
//! Services never touch axum types. They take already-resolved settings and
//! repository handles through their constructors.

pub mod auth;
pub mod catalog;
pub mod token;

pub use auth::{AuthError, CredentialStore, PasswordPolicy};
pub use catalog::{CatalogError, CatalogService, Resource};
pub use token::{Identity, IssuedToken, TokenError, TokenService, TokenSettings};
