//! Core types for the Game Review System.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod rating;
pub mod role;
pub mod status;
pub mod text;
pub mod username;
pub mod validation;

pub use email::{Email, EmailError};
pub use id::*;
pub use rating::{Rating, RatingSummary};
pub use role::{Capability, Role};
pub use status::{GameStatus, SortDirection};
pub use text::{optional_text, required_text};
pub use username::Username;
pub use validation::ValidationError;
