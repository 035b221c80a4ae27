//! Front door and terminal error stage.
//!
//! # Data Flow
//! ```text
//! render_errors ─┐
//!   front_door   │  heartbeat → HTTPS redirect → robots.txt
//!     router     │  editor, healthz, login, proxy, static, update, vscode,
//!                │  extensions, NotFound fallback
//!   ◀────────────┘  ErrorPage extension → error.html
//! ```

use std::any::Any;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};
use serde_json::Map;

use crate::http::error::{ErrorPage, GatewayError};
use crate::http::request::RequestContext;
use crate::http::response::serve_file;
use crate::http::server::AppState;
use crate::net::Transport;
use crate::template::escape_html;

/// Heartbeat, HTTPS enforcement and `robots.txt`, before any routing.
pub async fn front_door(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    state.heart.beat();

    let encrypted = request.extensions().get::<Transport>() == Some(&Transport::Tls);
    if state.config.listener.tls.is_some() && !encrypted {
        let ctx = RequestContext::new(request.uri(), request.headers());
        return https_redirect(&ctx);
    }

    if request.uri().path() == "/robots.txt" {
        let path = state.templates.root().join("src").join("browser").join("robots.txt");
        return serve_file(&path, None).await;
    }

    Ok(next.run(request).await)
}

/// Absolute `https://` URL for the same host, path and query. A proxy base
/// path from `X-Forwarded-Prefix` is kept.
pub fn https_location(ctx: &RequestContext) -> Result<String, GatewayError> {
    let host = ctx
        .host
        .as_deref()
        .ok_or_else(|| GatewayError::BadRequest("Missing Host header".into()))?;
    let prefix = ctx.forwarded_prefix.as_deref().unwrap_or("");
    Ok(format!("https://{host}{prefix}{}", ctx.original_url()))
}

fn https_redirect(ctx: &RequestContext) -> Result<Response, GatewayError> {
    let location = https_location(ctx)?;
    tracing::debug!(to = %location, "Redirecting to HTTPS");
    let value = HeaderValue::try_from(location)
        .map_err(|_| GatewayError::BadRequest("Invalid Host header".into()))?;
    Ok((StatusCode::FOUND, [(header::LOCATION, value)]).into_response())
}

/// Render any response carrying an [`ErrorPage`] through `error.html`.
pub async fn render_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let ctx = RequestContext::new(request.uri(), request.headers());
    let response = next.run(request).await;

    let Some(page) = response.extensions().get::<ErrorPage>().cloned() else {
        return response;
    };

    match state.templates.load("error.html").await {
        Ok(content) => {
            let code = page.status.as_u16().to_string();
            let html = state
                .templates
                .render(&ctx, &content, Map::new())
                .replace("{{ERROR_TITLE}}", &code)
                .replace("{{ERROR_HEADER}}", &code)
                .replace("{{ERROR_BODY}}", &escape_html(&page.message));
            (page.status, Html(html)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, status = %page.status, "Failed to load error page");
            page.fallback()
        }
    }
}

/// Unmatched routes.
pub async fn not_found() -> GatewayError {
    GatewayError::NotFound
}

/// Known routes hit with an unsupported method.
pub async fn method_not_allowed() -> GatewayError {
    GatewayError::MethodNotAllowed
}

/// Panics surface as a 500 error page instead of a dropped connection.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %message, "Handler panicked");
    GatewayError::Internal.into_response()
}
