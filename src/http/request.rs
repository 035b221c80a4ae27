//! Request context extraction.
//!
//! # Responsibilities
//! - Capture the original URL, query and host of a request
//! - Parse the `Cookie` header
//! - Accept JSON and URL-encoded bodies through one extractor
//! - Turn malformed path parameters into a 400 error page
//!
//! # Design Decisions
//! - The original URI is used even inside nested routers, since page
//!   depth is measured from what the browser sees
//! - Query values keep repeated keys as lists

use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;

use axum::extract::{FromRequest, FromRequestParts, OriginalUri, Path, Request};
use axum::http::{header, request::Parts, HeaderMap, Uri};
use axum::{Form, Json};
use serde::de::DeserializeOwned;
use url::form_urlencoded;

use crate::http::error::GatewayError;

/// Header set by reverse proxies that mount the gateway under a prefix.
pub const X_FORWARDED_PREFIX: &str = "x-forwarded-prefix";

/// A single query value. Repeated keys become a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Single(String),
    List(Vec<String>),
}

impl QueryValue {
    /// The value when the key appeared exactly once.
    pub fn as_single(&self) -> Option<&str> {
        match self {
            QueryValue::Single(value) => Some(value),
            QueryValue::List(_) => None,
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Single(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Single(value)
    }
}

/// Decoded query string, ordered by key so serialization is deterministic.
pub type QueryMap = BTreeMap<String, QueryValue>;

/// Decode a raw query string.
pub fn parse_query(raw: &str) -> QueryMap {
    let mut query = QueryMap::new();
    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        let value = value.into_owned();
        match query.remove(key.as_ref()) {
            None => {
                query.insert(key.into_owned(), QueryValue::Single(value));
            }
            Some(QueryValue::Single(first)) => {
                query.insert(key.into_owned(), QueryValue::List(vec![first, value]));
            }
            Some(QueryValue::List(mut values)) => {
                values.push(value);
                query.insert(key.into_owned(), QueryValue::List(values));
            }
        }
    }
    query
}

/// Encode a query map; lists are written as repeated keys.
pub fn encode_query(query: &QueryMap) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in query {
        match value {
            QueryValue::Single(value) => {
                serializer.append_pair(key, value);
            }
            QueryValue::List(values) => {
                for value in values {
                    serializer.append_pair(key, value);
                }
            }
        }
    }
    serializer.finish()
}

/// Read-only view of the inbound request used by paths, redirects and
/// templates.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Path as the client sent it, without the query.
    pub path: String,
    pub query: QueryMap,
    /// `Host` header, or the URI authority for HTTP/2.
    pub host: Option<String>,
    /// `X-Forwarded-Prefix`, when a proxy mounts us below a base path.
    pub forwarded_prefix: Option<String>,
    raw_query: Option<String>,
}

impl RequestContext {
    pub fn new(uri: &Uri, headers: &HeaderMap) -> Self {
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| uri.authority().map(|a| a.to_string()));
        let forwarded_prefix = headers
            .get(X_FORWARDED_PREFIX)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());

        Self {
            path: uri.path().to_string(),
            query: uri.query().map(parse_query).unwrap_or_default(),
            host,
            forwarded_prefix,
            raw_query: uri.query().map(str::to_string),
        }
    }

    /// Build from request parts, preferring the pre-nesting URI.
    pub fn from_parts(parts: &Parts) -> Self {
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| &original.0)
            .unwrap_or(&parts.uri);
        Self::new(uri, &parts.headers)
    }

    /// Path plus the untouched query string.
    pub fn original_url(&self) -> String {
        match &self.raw_query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// A single-valued, non-empty query parameter.
    pub fn query_str(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .and_then(QueryValue::as_single)
            .filter(|v| !v.is_empty())
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// Cookies sent with the request.
#[derive(Debug, Clone, Default)]
pub struct Cookies(HashMap<String, String>);

impl Cookies {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = HashMap::new();
        for value in headers.get_all(header::COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            for part in raw.split(';') {
                let Some((name, value)) = part.trim().split_once('=') else {
                    continue;
                };
                let value = value.trim().trim_matches('"');
                cookies
                    .entry(name.trim().to_string())
                    .or_insert_with(|| value.to_string());
            }
        }
        Self(cookies)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

impl<S> FromRequestParts<S> for Cookies
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Body extractor accepting `application/json` or URL-encoded forms.
#[derive(Debug, Clone)]
pub struct FormOrJson<T>(pub T);

impl<S, T> FromRequest<S> for FormOrJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = GatewayError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| GatewayError::BadRequest(e.body_text()))?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| GatewayError::BadRequest(e.body_text()))?;
            Ok(Self(value))
        }
    }
}

/// Path parameters whose rejection renders as a [`GatewayError`].
#[derive(Debug, Clone)]
pub struct PathParams<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| GatewayError::BadRequest(e.body_text()))?;
        Ok(Self(value))
    }
}
