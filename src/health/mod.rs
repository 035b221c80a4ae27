//! Liveness subsystem.
//!
//! # Data Flow
//! ```text
//! Every request (pipeline front door)
//!     → heart.rs beat()
//!     → timestamp in memory + <data_dir>/heartbeat
//!
//! Attached WebSocket sessions
//!     → keepalive task re-beats each interval
//!
//! GET /healthz
//!     → alive / expired + last timestamp
//! ```

pub mod heart;

pub use heart::{Heart, HEARTBEAT_INTERVAL};
