//! Same-origin relative redirects.
//!
//! Redirect targets are always relative to the current page's depth, never
//! absolute, so a redirect can only ever land on this gateway.

use std::collections::BTreeMap;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::http::error::GatewayError;
use crate::http::paths::{normalize, relative_root};
use crate::http::request::{encode_query, QueryValue, RequestContext};

/// Query changes applied on top of the current query. `None` removes the key.
pub type QueryOverrides = BTreeMap<String, Option<QueryValue>>;

/// Build overrides from `(key, value)` pairs.
pub fn overrides<I, K>(pairs: I) -> QueryOverrides
where
    I: IntoIterator<Item = (K, Option<QueryValue>)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Relative URL for `to`, keeping the current query merged with `overrides`.
pub fn build_redirect(ctx: &RequestContext, to: &str, overrides: &QueryOverrides) -> String {
    let mut query = ctx.query.clone();
    for (key, value) in overrides {
        match value {
            Some(value) => {
                query.insert(key.clone(), value.clone());
            }
            None => {
                query.remove(key);
            }
        }
    }

    let relative_path = normalize(&format!("{}/{}", relative_root(&ctx.path), to), true);
    let query_string = encode_query(&query);
    let location = if query_string.is_empty() {
        relative_path
    } else {
        format!("{relative_path}?{query_string}")
    };

    tracing::debug!(from = %ctx.original_url(), to = %location, "Redirecting");
    location
}

/// `302 Found` pointing at [`build_redirect`]'s URL.
pub fn redirect(
    ctx: &RequestContext,
    to: &str,
    overrides: &QueryOverrides,
) -> Result<Response, GatewayError> {
    let location = build_redirect(ctx, to, overrides);
    let value = HeaderValue::try_from(location)
        .map_err(|_| GatewayError::BadRequest("Invalid redirect target".into()))?;
    Ok((StatusCode::FOUND, [(header::LOCATION, value)]).into_response())
}
