//! Middleware components for HTTP request processing.
//!
//! Cross-cutting concerns layered onto the router in [`crate::app`]:
//! response security headers and early request validation.

pub mod security_headers;
pub mod validation;
