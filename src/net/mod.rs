//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → tls.rs (optional TLS handshake via axum-server)
//!     → Transport extension (Plain / Tls) for the HTTPS redirect check
//!     → Hand off to HTTP layer
//!
//! WebSocket sessions
//!     → connection.rs (count attached sessions for the heartbeat)
//! ```

pub mod connection;
pub mod tls;

/// How the request reached us. Inserted per listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Plain,
    Tls,
}
