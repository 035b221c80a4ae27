//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// How callers prove who they are.
    pub auth: AuthConfig,

    /// Resource root and data directory.
    pub paths: PathsConfig,

    /// Editor backend settings.
    pub editor: EditorConfig,

    /// Update check settings.
    pub update: UpdateConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Identity of the running build. Never read from the config file.
    #[serde(skip)]
    pub build: BuildInfo,

    /// File the configuration was loaded from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl GatewayConfig {
    /// Directory holding the heartbeat file and the update cache.
    ///
    /// Falls back to the platform data directory, then to `./data`.
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.paths.data_dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("", "", "editor-gateway")
            .map(|dirs| dirs.data_dir().to_owned())
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    /// Where a generated password is stored. Never logged.
    pub fn generated_password_path(&self) -> PathBuf {
        self.data_dir().join("password")
    }

    /// Root of the editor distribution (webview assets live below it).
    pub fn editor_root(&self) -> PathBuf {
        self.editor
            .root
            .clone()
            .unwrap_or_else(|| self.paths.root.join("lib").join("vscode"))
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Optional TLS configuration. When set, plain-HTTP requests are
    /// redirected to HTTPS.
    pub tls: Option<TlsConfig>,

    /// Optional plain-HTTP address that only redirects to HTTPS.
    pub redirect_address: Option<String>,

    /// Request timeout (until response headers) in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            tls: None,
            redirect_address: None,
            request_timeout_secs: 30,
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,
}

/// Strategy used to validate a caller's session.
///
/// Unknown values fail deserialization, so an unsupported mode can never
/// reach request handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Everyone is let in.
    None,
    /// A single shared password, stored hashed in the `key` cookie.
    Password,
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::None => write!(f, "none"),
            AuthMode::Password => write!(f, "password"),
        }
    }
}

/// Where the configured password came from, for the login page hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordSource {
    #[default]
    ConfigFile,
    Environment,
    Generated,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Authentication mode.
    pub mode: AuthMode,

    /// Plaintext shared password (password mode only).
    pub password: Option<String>,

    /// Parent domains the session cookie may be narrowed to.
    pub proxy_domains: Vec<String>,

    #[serde(skip)]
    pub password_source: PasswordSource,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::Password,
            password: None,
            proxy_domains: Vec::new(),
            password_source: PasswordSource::ConfigFile,
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Resource root containing `src/browser/pages` and `src/browser/robots.txt`.
    pub root: PathBuf,

    /// Data directory; platform default when unset.
    pub data_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            data_dir: None,
        }
    }
}

/// Editor backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Base URL of the editor backend process.
    pub backend_url: String,

    /// Root of the editor distribution; `<root>/lib/vscode` when unset.
    pub root: Option<PathBuf>,

    /// Passed to the editor shell as `disableTelemetry`.
    pub disable_telemetry: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8081".to_string(),
            root: None,
            disable_telemetry: false,
        }
    }
}

/// Update check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Fetch release metadata at all.
    pub enabled: bool,

    /// Seconds a cached result stays fresh.
    pub check_interval_secs: u64,

    /// Release endpoint returning `{"tag_name": ...}` or `{"name": ...}`.
    pub latest_url: String,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_secs: 24 * 60 * 60,
            latest_url: "https://api.github.com/repos/coder/code-server/releases/latest".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Identity of the running build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub commit: String,
}

impl BuildInfo {
    pub fn is_development(&self) -> bool {
        self.commit == "development"
    }
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            commit: option_env!("GATEWAY_COMMIT")
                .unwrap_or("development")
                .to_string(),
        }
    }
}
