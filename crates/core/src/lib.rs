//! Game Review System Core - Shared domain types.
//!
//! This crate provides the value types used across all Game Review System
//! components:
//! - `server` - HTTP API, credential store, token service and catalog
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP. Every type here validates on construction, so a
//! value that exists is a value that is allowed to be persisted.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, usernames, emails, ratings, statuses, roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
