//! Route extensions.
//!
//! Extensions are registered once, when the router is built, after the
//! built-in routes and before the NotFound fallback.

use std::sync::Arc;

use axum::Router;

use crate::config::GatewayConfig;
use crate::http::server::AppState;

/// Adds routes to the gateway.
pub trait RouteExtension: Send + Sync {
    fn name(&self) -> &str;

    fn register(&self, router: Router<AppState>, config: &GatewayConfig) -> Router<AppState>;
}

/// Apply every extension in order.
pub fn load_extensions(
    mut router: Router<AppState>,
    extensions: &[Arc<dyn RouteExtension>],
    config: &GatewayConfig,
) -> Router<AppState> {
    for extension in extensions {
        tracing::info!(extension = extension.name(), "Loading route extension");
        router = extension.register(router, config);
    }
    router
}
