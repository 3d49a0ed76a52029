//! API Middleware
//!
//! Middleware layers for authentication and request processing.

pub mod auth;

pub use auth::{require_access, require_refresh, CurrentAuthor};
