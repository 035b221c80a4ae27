//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → cli.rs (command-line overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Build identity travels inside the config instead of as globals

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::{
    AuthConfig, AuthMode, BuildInfo, EditorConfig, GatewayConfig, ListenerConfig,
    ObservabilityConfig, PasswordSource, PathsConfig, TlsConfig, UpdateConfig,
};
pub use validation::{validate_config, ValidationError};
