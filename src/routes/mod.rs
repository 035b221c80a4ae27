//! Route registration.
//!
//! # Data Flow
//! ```text
//! /                     → editor.rs (shell page, websocket, resources)
//! /healthz[/]           → health.rs
//! /login[/]             → login.rs (password mode only)
//! /proxy/{port}/...     → proxy.rs
//! /static/{commit}/...  → static_files.rs
//! /update[/], /update/check → update.rs
//! /vscode               → editor.rs, second mount
//! extensions            → plugin.rs
//! wrong method          → MethodNotAllowed
//! anything else         → NotFound
//! ```

pub mod editor;
pub mod health;
pub mod login;
pub mod proxy;
pub mod static_files;
pub mod update;

use std::sync::Arc;

use axum::Router;

use crate::config::AuthMode;
use crate::http::pipeline;
use crate::http::server::AppState;
use crate::plugin::{load_extensions, RouteExtension};

/// Compose every route of the gateway. Built fresh per server.
pub fn register(state: &AppState, extensions: &[Arc<dyn RouteExtension>]) -> Router<AppState> {
    let mut router = Router::new()
        .merge(editor::router(""))
        .merge(health::router());

    if state.config.auth.mode == AuthMode::Password {
        router = router.merge(login::router(state.clone()));
    }

    let router = router
        .nest("/proxy", proxy::router())
        .nest("/static", static_files::router())
        .merge(update::router(state.clone()))
        .merge(editor::router("/vscode"));

    load_extensions(router, extensions, &state.config)
        .method_not_allowed_fallback(pipeline::method_not_allowed)
        .fallback(pipeline::not_found)
}
