//! Build assets addressed by commit.
//!
//! `/static/{commit}/{*path}` serves the absolute file `/{path}` when it lies
//! below the resource root or the editor root.

use std::path::{Path, PathBuf};

use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use crate::http::error::GatewayError;
use crate::http::paths::clean_path;
use crate::http::request::PathParams;
use crate::http::response::{serve_file, IMMUTABLE_CACHE};
use crate::http::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/{commit}/{*path}", get(asset))
}

async fn asset(
    State(state): State<AppState>,
    PathParams((commit, path)): PathParams<(String, String)>,
) -> Result<Response, GatewayError> {
    let roots = [state.config.paths.root.clone(), state.config.editor_root()];
    let file = resolve(&path, &roots)?;

    let development = state.config.build.is_development() || commit == "development";
    serve_file(&file, (!development).then_some(IMMUTABLE_CACHE)).await
}

/// Absolute file for `path`, if it is inside one of `roots`.
fn resolve(path: &str, roots: &[PathBuf]) -> Result<PathBuf, GatewayError> {
    let file = clean_path(&Path::new("/").join(path));
    if roots.iter().any(|root| file.starts_with(clean_path(root))) {
        Ok(file)
    } else {
        tracing::debug!(path = %file.display(), "Static path outside served roots");
        Err(GatewayError::Forbidden)
    }
}
