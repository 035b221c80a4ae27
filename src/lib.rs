//! Authenticating HTTP front door for a remotely hosted code editor.

pub mod config;
pub mod editor;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod plugin;
pub mod routes;
pub mod security;
pub mod template;
pub mod update;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
