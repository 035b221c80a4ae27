//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware stack, listeners)
//!     → pipeline.rs (heartbeat, HTTPS redirect, robots.txt)
//!     → request.rs (request context, cookies, bodies)
//!     → routes (dispatch)
//!     → redirect.rs / response.rs (relative redirects, file bodies)
//!     → pipeline.rs (error page)
//!     → Send to client
//! ```

pub mod error;
pub mod paths;
pub mod pipeline;
pub mod redirect;
pub mod request;
pub mod response;
pub mod server;

pub use error::{ApiError, ErrorPage, GatewayError};
pub use server::{AppState, HttpServer};
