//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use serde_json::{json, Map};
use tempfile::TempDir;
use tokio::net::TcpListener;

use editor_gateway::config::{AuthMode, BuildInfo, GatewayConfig};
use editor_gateway::editor::{BackendError, EditorBackend, EditorContext, WorkbenchOptions};
use editor_gateway::http::request::QueryMap;
use editor_gateway::plugin::RouteExtension;
use editor_gateway::security::auth::hash;
use editor_gateway::{HttpServer, Shutdown};

pub const PASSWORD: &str = "secret";
pub const VERSION: &str = "1.0.0";

const ERROR_PAGE: &str = "<html><title>{{ERROR_TITLE}}</title><h1>{{ERROR_HEADER}}</h1>\
<p>{{ERROR_BODY}}</p><a href=\"{{BASE}}/\">home</a></html>";

const LOGIN_PAGE: &str = "<p>{{PASSWORD_MSG}}</p>{{ERROR}}\
<form action=\"{{BASE}}/login?to={{TO}}\" method=\"post\"></form>\
<script>const options = \"{{OPTIONS}}\";</script>";

const EDITOR_PAGE: &str = "<!-- PROD_ONLY <link rel=\"prod\"> END_PROD_ONLY -->\
<script>\
window.product = \"{{PRODUCT_CONFIGURATION}}\";\
window.userData = \"{{REMOTE_USER_DATA_URI}}\";\
window.workbench = \"{{WORKBENCH_WEB_CONFIGURATION}}\";\
window.nls = \"{{NLS_CONFIGURATION}}\";\
window.options = \"{{OPTIONS}}\";\
</script>";

pub const ROBOTS: &str = "User-agent: *\nDisallow: /\n";

/// Resource root with every page the gateway renders.
pub fn assets() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let pages = dir.path().join("src").join("browser").join("pages");
    std::fs::create_dir_all(&pages).unwrap();
    std::fs::write(pages.join("error.html"), ERROR_PAGE).unwrap();
    std::fs::write(pages.join("login.html"), LOGIN_PAGE).unwrap();
    std::fs::write(pages.join("vscode.html"), EDITOR_PAGE).unwrap();
    std::fs::write(dir.path().join("src").join("browser").join("robots.txt"), ROBOTS).unwrap();
    std::fs::create_dir_all(dir.path().join("data")).unwrap();
    dir
}

/// Password-mode configuration rooted at `root`, with update checks off.
pub fn test_config(root: &Path) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.paths.root = root.canonicalize().unwrap();
    config.paths.data_dir = Some(config.paths.root.join("data"));
    config.auth.mode = AuthMode::Password;
    config.auth.password = Some(PASSWORD.to_string());
    config.update.enabled = false;
    config.build = BuildInfo {
        version: VERSION.to_string(),
        commit: "abc123".to_string(),
    };
    config
}

/// `Cookie` header value of a logged-in browser.
pub fn session_cookie() -> String {
    format!("key={}", hash(PASSWORD))
}

/// Editor backend answering from memory. Sessions echo text and binary
/// frames.
pub struct FakeEditor;

#[async_trait]
impl EditorBackend for FakeEditor {
    async fn initialize(
        &self,
        ctx: EditorContext,
        _query: &QueryMap,
    ) -> Result<WorkbenchOptions, BackendError> {
        let mut product = Map::new();
        product.insert("nameShort".to_string(), json!("Editor"));
        Ok(WorkbenchOptions {
            product_configuration: product,
            remote_user_data_uri: json!({ "scheme": "vscode-remote", "authority": ctx.remote_authority }),
            workbench_web_configuration: json!({ "folderUri": null }),
            nls_configuration: json!({ "locale": "en" }),
        })
    }

    async fn attach_websocket(
        &self,
        mut socket: WebSocket,
        _query: QueryMap,
    ) -> Result<(), BackendError> {
        while let Some(message) = socket.recv().await {
            match message? {
                Message::Close(_) => break,
                message @ (Message::Text(_) | Message::Binary(_)) => socket.send(message).await?,
                _ => {}
            }
        }
        Ok(())
    }
}

/// Editor backend that never initializes.
pub struct BrokenEditor;

#[async_trait]
impl EditorBackend for BrokenEditor {
    async fn initialize(
        &self,
        _ctx: EditorContext,
        _query: &QueryMap,
    ) -> Result<WorkbenchOptions, BackendError> {
        Err(BackendError::Url(url::ParseError::EmptyHost))
    }

    async fn attach_websocket(
        &self,
        _socket: WebSocket,
        _query: QueryMap,
    ) -> Result<(), BackendError> {
        Ok(())
    }
}

/// A gateway running on an ephemeral port. Stops when dropped.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub root: TempDir,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn spawn_gateway(root: TempDir, config: GatewayConfig) -> TestGateway {
    spawn_with(root, config, Arc::new(FakeEditor), Vec::new()).await
}

pub async fn spawn_with(
    root: TempDir,
    config: GatewayConfig,
    editor: Arc<dyn EditorBackend>,
    extensions: Vec<Arc<dyn RouteExtension>>,
) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::with_backend(config, editor, extensions);
    let shutdown = Shutdown::new();
    tokio::spawn(server.run(listener, shutdown.clone()));

    TestGateway {
        addr,
        shutdown,
        root,
    }
}

/// Password-mode gateway over fresh assets.
pub async fn default_gateway() -> TestGateway {
    let root = assets();
    let config = test_config(root.path());
    spawn_gateway(root, config).await
}

/// HTTP client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

/// Start an upstream that answers every request with its own path and query.
pub async fn start_echo_upstream() -> SocketAddr {
    use axum::extract::Request;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = axum::Router::new().fallback(|request: Request| async move {
        request
            .uri()
            .path_and_query()
            .map(|pq| pq.to_string())
            .unwrap_or_default()
    });
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Editor backend process stand-in: `/initialize` reports what it was asked
/// and `/` echoes WebSocket frames.
pub async fn start_editor_backend() -> SocketAddr {
    use std::collections::HashMap;

    use axum::extract::{Query, WebSocketUpgrade};
    use axum::routing::get;
    use axum::Json;

    async fn initialize(Query(query): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
        Json(json!({
            "productConfiguration": { "nameShort": "Remote" },
            "remoteUserDataUri": { "authority": query.get("remoteAuthority") },
            "workbenchWebConfiguration": { "folder": query.get("folder") },
            "nlsConfiguration": { "telemetry": query.get("disableTelemetry") },
        }))
    }

    async fn session(ws: WebSocketUpgrade) -> axum::response::Response {
        ws.on_upgrade(|mut socket| async move {
            while let Some(Ok(message)) = socket.recv().await {
                if matches!(message, Message::Close(_)) {
                    break;
                }
                if socket.send(message).await.is_err() {
                    break;
                }
            }
        })
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = axum::Router::new()
        .route("/initialize", get(initialize))
        .route("/", get(session));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
