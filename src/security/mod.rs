//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → auth.rs (validate the `key` cookie against the configured mode)
//!
//! Login form:
//!     → rate_limit.rs (2/minute and 12/hour, shared by all clients)
//!     → auth.rs (timing-safe password check, hash for the cookie)
//!     → cookie.rs (cookie domain narrowing, Set-Cookie value)
//! ```
//!
//! # Design Decisions
//! - Stateless sessions: every request re-validates its cookie
//! - Fail closed: password mode without a password admits nobody

pub mod auth;
pub mod cookie;
pub mod rate_limit;
