//! Game Review System server library.
//!
//! Credential store, token service and catalog behind an axum JSON API.
//! Exposed as a library so the CLI and the integration tests can build the
//! same services and router the binary serves.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ServerConfig;
pub use routes::build_router;
pub use state::AppState;
