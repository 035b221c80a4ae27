//! Editor backend contract.
//!
//! # Data Flow
//! ```text
//! GET /            → EditorBackend::initialize   → workbench options → vscode.html
//! WS  /            → EditorBackend::attach_websocket (long-lived, off the
//!                    request lifecycle once handed over)
//! GET /resource    → resource::uri_to_fs_path → file
//! ```

pub mod remote;
pub mod resource;

use async_trait::async_trait;
use axum::extract::ws::WebSocket;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::request::QueryMap;

pub use remote::RemoteEditor;

/// Per-request inputs for workbench initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorContext {
    /// `Host` the browser used; the workbench connects back through it.
    pub remote_authority: String,
    pub disable_telemetry: bool,
}

/// Runtime configuration injected into the editor shell page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkbenchOptions {
    pub product_configuration: Map<String, Value>,
    pub remote_user_data_uri: Value,
    pub workbench_web_configuration: Value,
    pub nls_configuration: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend websocket failed: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("client websocket failed: {0}")]
    Client(#[from] axum::Error),

    #[error("invalid backend url: {0}")]
    Url(#[from] url::ParseError),
}

/// The editor process behind the gateway.
#[async_trait]
pub trait EditorBackend: Send + Sync {
    async fn initialize(
        &self,
        ctx: EditorContext,
        query: &QueryMap,
    ) -> Result<WorkbenchOptions, BackendError>;

    /// Take ownership of an authenticated client socket. Returns when the
    /// session ends.
    async fn attach_websocket(&self, socket: WebSocket, query: QueryMap)
        -> Result<(), BackendError>;
}
