//! Command-line overrides layered on top of the config file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::schema::{AuthMode, GatewayConfig, PasswordSource, TlsConfig};

#[derive(Debug, Default, Parser)]
#[command(name = "editor-gateway")]
#[command(about = "Authenticating front door for a remote code editor", long_about = None)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8080.
    #[arg(long)]
    pub bind_addr: Option<String>,

    /// Authentication mode.
    #[arg(long, value_enum)]
    pub auth: Option<AuthMode>,

    /// Shared password for password auth.
    #[arg(long, env = "PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// TLS certificate (PEM). Enables HTTPS redirects.
    #[arg(long)]
    pub cert: Option<PathBuf>,

    /// TLS private key (PEM).
    #[arg(long)]
    pub cert_key: Option<PathBuf>,

    /// Parent domain the session cookie may be shared across. Repeatable.
    #[arg(long = "proxy-domain")]
    pub proxy_domains: Vec<String>,

    #[arg(long)]
    pub disable_update_check: bool,

    #[arg(long)]
    pub disable_telemetry: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log: Option<String>,

    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Resource root containing the HTML pages.
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Base URL of the editor backend process.
    #[arg(long)]
    pub editor_backend: Option<String>,
}

impl Cli {
    /// Apply every flag that was given; absent flags keep file values.
    pub fn apply(&self, config: &mut GatewayConfig) {
        if let Some(addr) = &self.bind_addr {
            config.listener.bind_address = addr.clone();
        }
        if let Some(mode) = self.auth {
            config.auth.mode = mode;
        }
        if let Some(password) = &self.password {
            config.auth.password = Some(password.clone());
            config.auth.password_source = if std::env::var("PASSWORD").ok().as_ref() == Some(password) {
                PasswordSource::Environment
            } else {
                PasswordSource::ConfigFile
            };
        }

        if self.cert.is_some() || self.cert_key.is_some() {
            let current = config.listener.tls.take();
            let (cert, key) = match current {
                Some(tls) => (tls.cert_path, tls.key_path),
                None => (PathBuf::new(), PathBuf::new()),
            };
            config.listener.tls = Some(TlsConfig {
                cert_path: self.cert.clone().unwrap_or(cert),
                key_path: self.cert_key.clone().unwrap_or(key),
            });
        }

        config
            .auth
            .proxy_domains
            .extend(self.proxy_domains.iter().cloned());

        if self.disable_update_check {
            config.update.enabled = false;
        }
        if self.disable_telemetry {
            config.editor.disable_telemetry = true;
        }
        if let Some(level) = &self.log {
            config.observability.log_level = level.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.paths.data_dir = Some(dir.clone());
        }
        if let Some(root) = &self.root {
            config.paths.root = root.clone();
        }
        if let Some(url) = &self.editor_backend {
            config.editor.backend_url = url.clone();
        }
    }
}
