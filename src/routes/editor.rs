//! Editor shell, session socket and resource routes.
//!
//! Mounted twice: at the root and under `/vscode`.

use std::path::{Path, PathBuf};

use axum::extract::{FromRequestParts, Request, State, WebSocketUpgrade};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde_json::{Map, Value};

use crate::editor::resource::uri_to_fs_path;
use crate::editor::{BackendError, EditorContext};
use crate::http::error::GatewayError;
use crate::http::paths::clean_path;
use crate::http::redirect::{overrides, redirect};
use crate::http::request::{Cookies, PathParams, RequestContext};
use crate::http::response::serve_file;
use crate::http::server::AppState;
use crate::security::auth::{is_authenticated, require_authenticated};
use crate::template::embed_json;

const WEBVIEW_ROOT: &str = "out/vs/workbench/contrib/webview/browser/pre";
const RESOURCE_MARKER: &str = "vscode-resource";

/// Editor routes below `mount` (`""` for the root).
pub fn router(mount: &'static str) -> Router<AppState> {
    let shell = move |state: State<AppState>, request: Request| editor(state, mount, request);

    let mut router = Router::new().route(if mount.is_empty() { "/" } else { mount }, get(shell.clone()));
    if !mount.is_empty() {
        router = router.route(&format!("{mount}/"), get(shell));
    }
    router
        .route(&format!("{mount}/resource"), get(resource))
        .route(&format!("{mount}/vscode-remote-resource"), get(resource))
        .route(&format!("{mount}/webview/{{*path}}"), get(webview))
}

async fn editor(
    State(state): State<AppState>,
    mount: &'static str,
    request: Request,
) -> Result<Response, GatewayError> {
    let (mut parts, _body) = request.into_parts();
    let ctx = RequestContext::from_parts(&parts);
    let cookies = Cookies::from_headers(&parts.headers);

    let upgrade = parts
        .headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"));

    if upgrade {
        require_authenticated(&state.config.auth, &cookies)?;
        let ws = WebSocketUpgrade::from_request_parts(&mut parts, &state)
            .await
            .map_err(|e| GatewayError::BadRequest(e.body_text()))?;
        return Ok(attach(state, ws, ctx));
    }

    if !is_authenticated(&state.config.auth, &cookies) {
        let to = if mount.is_empty() { "/" } else { mount };
        return redirect(&ctx, "login", &overrides([("to", Some(to.into()))]));
    }

    shell_page(&state, &ctx).await.map(IntoResponse::into_response)
}

fn attach(state: AppState, ws: WebSocketUpgrade, ctx: RequestContext) -> Response {
    let editor = state.editor.clone();
    let session = state.sessions.track();
    let query = ctx.query;

    ws.on_upgrade(move |socket| async move {
        let id = session.id();
        tracing::debug!(connection_id = %id, "Handing session to editor backend");
        if let Err(e) = editor.attach_websocket(socket, query).await {
            tracing::warn!(connection_id = %id, error = %e, "Editor session ended with error");
        }
        drop(session);
    })
}

async fn shell_page(state: &AppState, ctx: &RequestContext) -> Result<Html<String>, GatewayError> {
    let config = &state.config;
    let editor_ctx = EditorContext {
        remote_authority: ctx.host.clone().unwrap_or_default(),
        disable_telemetry: config.editor.disable_telemetry,
    };

    let (content, options) = tokio::try_join!(
        async { state.templates.load("vscode.html").await.map_err(GatewayError::from) },
        async {
            state
                .editor
                .initialize(editor_ctx, &ctx.query)
                .await
                .map_err(|e| load_failure(config.build.is_development(), e))
        },
    )?;

    let content = if config.build.is_development() {
        content
    } else {
        content.replace("<!-- PROD_ONLY", "").replace("END_PROD_ONLY -->", "")
    };

    let mut product = options.product_configuration;
    product.insert(
        "gatewayVersion".to_string(),
        Value::String(config.build.version.clone()),
    );

    let mut extra = Map::new();
    extra.insert(
        "disableTelemetry".to_string(),
        Value::Bool(config.editor.disable_telemetry),
    );

    let html = state
        .templates
        .render(ctx, &content, extra)
        .replacen("\"{{REMOTE_USER_DATA_URI}}\"", &embed_json(&options.remote_user_data_uri), 1)
        .replacen("\"{{PRODUCT_CONFIGURATION}}\"", &embed_json(&product), 1)
        .replacen(
            "\"{{WORKBENCH_WEB_CONFIGURATION}}\"",
            &embed_json(&options.workbench_web_configuration),
            1,
        )
        .replacen("\"{{NLS_CONFIGURATION}}\"", &embed_json(&options.nls_configuration), 1);
    Ok(Html(html))
}

fn load_failure(development: bool, error: BackendError) -> GatewayError {
    let hint = if development {
        "It might not have finished compiling."
    } else {
        ""
    };
    GatewayError::Editor(format!("VS Code failed to load. {hint} {error}"))
}

async fn resource(
    State(state): State<AppState>,
    cookies: Cookies,
    ctx: RequestContext,
) -> Result<Response, GatewayError> {
    require_authenticated(&state.config.auth, &cookies)?;
    let path = ctx
        .query_str("path")
        .ok_or_else(|| GatewayError::BadRequest("Missing path".into()))?;
    serve_file(&uri_to_fs_path(path), None).await
}

async fn webview(
    State(state): State<AppState>,
    cookies: Cookies,
    PathParams(path): PathParams<String>,
) -> Result<Response, GatewayError> {
    require_authenticated(&state.config.auth, &cookies)?;
    let file = webview_path(&state.config.editor_root(), &path)?;
    serve_file(&file, None).await
}

/// Local file for a webview asset. Resource-marked paths are absolute paths
/// on this machine; everything else is confined to the webview assets.
fn webview_path(editor_root: &Path, path: &str) -> Result<PathBuf, GatewayError> {
    if let Some(rest) = path.strip_prefix(RESOURCE_MARKER) {
        let rest = rest.strip_prefix("/file").unwrap_or(rest);
        return Ok(PathBuf::from(rest));
    }

    let base = clean_path(&editor_root.join(WEBVIEW_ROOT));
    let file = clean_path(&base.join(path));
    if !file.starts_with(&base) {
        return Err(GatewayError::Forbidden);
    }
    Ok(file)
}
