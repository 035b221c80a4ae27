//! File responses.
//!
//! # Responsibilities
//! - Read files without blocking the runtime
//! - Infer the content type from the file extension
//! - Attach caching headers for immutable assets

use std::path::Path;

use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};

use crate::http::error::GatewayError;

/// Long-lived caching for assets addressed by build commit.
pub const IMMUTABLE_CACHE: &str = "public, max-age=31536000";

/// Read `path` into a response. Missing files become 404.
pub async fn serve_file(path: &Path, cache_control: Option<&'static str>) -> Result<Response, GatewayError> {
    let content = tokio::fs::read(path).await?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    tracing::trace!(path = %path.display(), mime = %mime, bytes = content.len(), "Serving file");

    let mut response = content.into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Some(cache_control) = cache_control {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
    }
    Ok(response)
}
