//! Update check endpoints.
//!
//! Both routes answer JSON and fail with a JSON 401, never the login page.

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::http::error::ApiError;
use crate::http::request::Cookies;
use crate::http::server::AppState;
use crate::security::auth::require_authenticated;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    pub checked: u64,
    pub latest: String,
    pub current: String,
    pub is_latest: bool,
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/update", get(cached))
        .route("/update/", get(cached))
        .route("/update/check", get(check))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    require_authenticated(&state.config.auth, &cookies)?;
    Ok(next.run(request).await)
}

async fn cached(State(state): State<AppState>) -> Json<UpdateStatus> {
    Json(status(&state, false).await)
}

async fn check(State(state): State<AppState>) -> Json<UpdateStatus> {
    Json(status(&state, true).await)
}

async fn status(state: &AppState, force: bool) -> UpdateStatus {
    let update = state.updates.get_update(force).await;
    UpdateStatus {
        is_latest: state.updates.is_latest_version(&update),
        checked: update.checked,
        current: state.updates.current_version().to_string(),
        latest: update.version,
    }
}
