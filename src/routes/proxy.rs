//! Local port forwarding.
//!
//! `/proxy/{port}/{*path}` forwards authenticated requests to
//! `http://127.0.0.1:{port}/{path}` with the query intact.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Uri, Version};
use axum::response::Response;
use axum::routing::any;
use axum::Router;

use crate::http::error::GatewayError;
use crate::http::request::{Cookies, PathParams};
use crate::http::server::AppState;
use crate::security::auth::require_authenticated;

/// Connection-scoped headers, never forwarded in either direction.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{port}", any(proxy_root))
        .route("/{port}/", any(proxy_root))
        .route("/{port}/{*path}", any(proxy_path))
}

async fn proxy_root(
    State(state): State<AppState>,
    cookies: Cookies,
    PathParams(port): PathParams<u16>,
    request: Request,
) -> Result<Response, GatewayError> {
    forward(&state, &cookies, port, "", request).await
}

async fn proxy_path(
    State(state): State<AppState>,
    cookies: Cookies,
    PathParams((port, path)): PathParams<(u16, String)>,
    request: Request,
) -> Result<Response, GatewayError> {
    forward(&state, &cookies, port, &path, request).await
}

async fn forward(
    state: &AppState,
    cookies: &Cookies,
    port: u16,
    path: &str,
    request: Request,
) -> Result<Response, GatewayError> {
    require_authenticated(&state.config.auth, cookies)?;

    let (mut parts, body) = request.into_parts();
    parts.uri = target_uri(port, path, parts.uri.query())?;
    parts.version = Version::HTTP_11;

    strip_hop_by_hop(&mut parts.headers);
    let authority = format!("127.0.0.1:{port}");
    if let Ok(host) = HeaderValue::from_str(&authority) {
        parts.headers.insert(header::HOST, host);
    }
    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        if let Ok(value) = HeaderValue::from_str(&addr.ip().to_string()) {
            parts.headers.append("x-forwarded-for", value);
        }
    }

    tracing::debug!(port, uri = %parts.uri, method = %parts.method, "Proxying request");
    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (mut parts, body) = response.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            Ok(Response::from_parts(parts, Body::new(body)))
        }
        Err(e) => {
            tracing::error!(port, error = %e, "Upstream error");
            Err(GatewayError::BadGateway(format!(
                "Nothing is answering on port {port}"
            )))
        }
    }
}

fn target_uri(port: u16, path: &str, query: Option<&str>) -> Result<Uri, GatewayError> {
    let uri = match query {
        Some(query) => format!("http://127.0.0.1:{port}/{path}?{query}"),
        None => format!("http://127.0.0.1:{port}/{path}"),
    };
    uri.parse()
        .map_err(|_| GatewayError::BadRequest("Invalid proxy path".into()))
}

/// Drops the fixed hop-by-hop set plus any header named in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in HOP_BY_HOP.iter().copied().chain(listed.iter().map(String::as_str)) {
        headers.remove(name);
    }
}
