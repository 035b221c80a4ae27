//! editor-gateway
//!
//! Authenticating HTTP front door for a remotely hosted code editor.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                    EDITOR GATEWAY                    │
//!                      │                                                      │
//!   Client Request     │  ┌─────────┐   ┌──────────┐   ┌──────────────────┐   │
//!   ───────────────────┼─▶│ net/tls │──▶│ pipeline │──▶│      routes      │   │
//!                      │  └─────────┘   │ heart,   │   │ editor, healthz, │   │
//!                      │                │ https,   │   │ login, proxy,    │   │
//!                      │                │ robots   │   │ static, update   │   │
//!                      │                └──────────┘   └────────┬─────────┘   │
//!                      │                                        │             │
//!   Client Response    │  ┌────────────┐                ┌───────▼────────┐    │
//!   ◀──────────────────┼──│ error page │◀───────────────│ editor backend │◀───┼──── Editor
//!                      │  │ templates  │                │ http + ws      │    │     Process
//!                      │  └────────────┘                └────────────────┘    │
//!                      │                                                      │
//!                      │  ┌────────────────────────────────────────────────┐  │
//!                      │  │              Cross-Cutting Concerns            │  │
//!                      │  │  config · security · health · observability    │  │
//!                      │  │  update · lifecycle · plugin                   │  │
//!                      │  └────────────────────────────────────────────────┘  │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use anyhow::Context;
use clap::Parser;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::net::TcpListener;

use editor_gateway::config::cli::Cli;
use editor_gateway::config::{
    read_config, validate_config, AuthMode, ConfigError, GatewayConfig, PasswordSource,
};
use editor_gateway::lifecycle::{signals, Shutdown};
use editor_gateway::observability::{logging, metrics};
use editor_gateway::security::auth::store_generated_password;
use editor_gateway::HttpServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => GatewayConfig::default(),
    };
    cli.apply(&mut config);

    logging::init(&config.observability);
    tracing::info!(
        version = %config.build.version,
        commit = %config.build.commit,
        "editor-gateway starting"
    );

    config.paths.root = config
        .paths
        .root
        .canonicalize()
        .with_context(|| format!("resource root {} not found", config.paths.root.display()))?;

    let data_dir = config.data_dir();
    tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;
    config.paths.data_dir = Some(data_dir);

    if config.auth.mode == AuthMode::Password && config.auth.password.is_none() {
        let password: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        let path = config.generated_password_path();
        store_generated_password(&path, &password)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "No password configured, generated one");
        config.auth.password = Some(password);
        config.auth.password_source = PasswordSource::Generated;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        auth = %config.auth.mode,
        tls = config.listener.tls.is_some(),
        root = %config.paths.root.display(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config
            .observability
            .metrics_address
            .parse()
            .context("invalid metrics address")?;
        metrics::init_metrics(addr);
    }

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.listener.bind_address))?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        trigger.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
