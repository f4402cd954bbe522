//! HTTP middleware for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span opened above)
//!
//! Authentication is not a layer: handlers that need an identity take the
//! [`RequireAuth`] extractor and check capabilities with [`ensure`].

pub mod auth;
pub mod request_id;

pub use auth::{RequireAuth, ensure, ensure_owner_or};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
