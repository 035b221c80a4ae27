//! Request failures and their HTTP rendering.
//!
//! Handlers return [`GatewayError`]. Its response is bodyless and carries an
//! [`ErrorPage`] extension; the terminal error stage in `pipeline.rs` turns
//! that into the HTML error page. API routes wrap failures in [`ApiError`]
//! and answer with JSON instead.

use std::io;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing, invalid or mismatched credential.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    /// No route matched.
    #[error("Not Found")]
    NotFound,

    /// A route matched but not for this method.
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    BadRequest(String),

    /// Unusable configuration detected while handling a request.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The editor backend could not initialize or attach.
    #[error("{0}")]
    Editor(String),

    /// A proxied upstream did not answer.
    #[error("{0}")]
    BadGateway(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    /// A handler panicked.
    #[error("Internal Server Error")]
    Internal,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden => StatusCode::FORBIDDEN,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Io(e) if e.kind() == io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
            GatewayError::Configuration(_)
            | GatewayError::Editor(_)
            | GatewayError::Io(_)
            | GatewayError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// What the error page shows. Attached to error responses as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub message: String,
}

impl ErrorPage {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Plain `status message` body, used when the page itself is unavailable.
    pub fn fallback(&self) -> Response {
        (self.status, format!("{} {}", self.status.as_u16(), self.message)).into_response()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        let mut response = status.into_response();
        response
            .extensions_mut()
            .insert(ErrorPage::new(status, self.to_string()));
        response
    }
}

/// JSON-bodied failure for API-style routes.
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        (
            status,
            Json(json!({
                "error": self.0.to_string(),
                "status": status.as_u16(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(GatewayError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(GatewayError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            GatewayError::MethodNotAllowed.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            GatewayError::Io(io::Error::new(io::ErrorKind::NotFound, "gone")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "no")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::Editor("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_carries_error_page() {
        let response = GatewayError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.extensions().get::<ErrorPage>(),
            Some(&ErrorPage::new(StatusCode::NOT_FOUND, "Not Found"))
        );
    }

    #[test]
    fn api_error_has_no_page() {
        let response = ApiError(GatewayError::Unauthorized).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.extensions().get::<ErrorPage>().is_none());
    }
}
