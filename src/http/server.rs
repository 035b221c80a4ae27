//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build shared state and the Axum router
//! - Wire up middleware (request ID, tracing, limits, error pages)
//! - Serve plain HTTP, or HTTPS plus an optional redirect listener
//! - Stop every listener and the heartbeat keepalive on shutdown

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::{middleware, Extension, Router};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::editor::{EditorBackend, RemoteEditor};
use crate::health::Heart;
use crate::http::error::GatewayError;
use crate::http::pipeline;
use crate::lifecycle::shutdown::{self, Shutdown};
use crate::net::connection::ConnectionTracker;
use crate::net::{tls, Transport};
use crate::observability::metrics;
use crate::plugin::RouteExtension;
use crate::routes;
use crate::security::rate_limit::LoginRateLimiter;
use crate::template::TemplateRenderer;
use crate::update::UpdateProvider;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub heart: Arc<Heart>,
    pub templates: Arc<TemplateRenderer>,
    pub editor: Arc<dyn EditorBackend>,
    pub updates: Arc<UpdateProvider>,
    pub login_limiter: Arc<LoginRateLimiter>,
    pub client: Client<HttpConnector, Body>,
    pub sessions: ConnectionTracker,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: Arc<GatewayConfig>,
    heart: Arc<Heart>,
    sessions: ConnectionTracker,
}

impl HttpServer {
    /// Create a server talking to the editor backend named in `config`.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let editor = RemoteEditor::new(&config.editor.backend_url)
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;
        Ok(Self::with_backend(config, Arc::new(editor), Vec::new()))
    }

    /// Create a server with an explicit editor backend and route extensions.
    pub fn with_backend(
        config: GatewayConfig,
        editor: Arc<dyn EditorBackend>,
        extensions: Vec<Arc<dyn RouteExtension>>,
    ) -> Self {
        let config = Arc::new(config);
        let heart = Arc::new(Heart::new(config.data_dir().join("heartbeat")));
        let sessions = ConnectionTracker::new();

        let state = AppState {
            templates: Arc::new(TemplateRenderer::from_config(&config)),
            updates: Arc::new(UpdateProvider::new(&config)),
            login_limiter: Arc::new(LoginRateLimiter::new()),
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
            heart: heart.clone(),
            sessions: sessions.clone(),
            editor,
            config: config.clone(),
        };

        let router = Self::build_router(state, &extensions);
        Self {
            router,
            config,
            heart,
            sessions,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, extensions: &[Arc<dyn RouteExtension>]) -> Router {
        let listener = &state.config.listener;
        let timeout = Duration::from_secs(listener.request_timeout_secs);
        let body_limit = listener.max_body_size;

        routes::register(&state, extensions)
            .with_state(state.clone())
            .layer(CatchPanicLayer::custom(pipeline::handle_panic))
            .layer(middleware::from_fn_with_state(state.clone(), pipeline::front_door))
            .layer(middleware::from_fn_with_state(state, pipeline::render_errors))
            .layer(middleware::from_fn(metrics::track_requests))
            .layer(RequestBodyLimitLayer::new(body_limit))
            .layer(TimeoutLayer::new(timeout))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for serving on a custom listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn heart(&self) -> Arc<Heart> {
        self.heart.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> io::Result<()> {
        let addr = listener.local_addr()?;
        let keepalive = self
            .heart
            .clone()
            .spawn_keepalive(self.sessions.clone(), shutdown.subscribe());

        let result = match &self.config.listener.tls {
            Some(tls_config) => {
                let rustls = tls::load_tls_config(tls_config).await?;
                let redirect = match &self.config.listener.redirect_address {
                    Some(address) => {
                        let redirect_listener = TcpListener::bind(address).await?;
                        Some(tokio::spawn(serve_plain(
                            redirect_listener,
                            self.router.clone(),
                            shutdown.subscribe(),
                        )))
                    }
                    None => None,
                };

                tracing::info!(address = %addr, "HTTPS server starting");
                let handle = axum_server::Handle::new();
                let shutdown_handle = handle.clone();
                let signal = shutdown.subscribe();
                tokio::spawn(async move {
                    shutdown::wait(signal).await;
                    shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
                });

                let app = self
                    .router
                    .layer(Extension(Transport::Tls))
                    .into_make_service_with_connect_info::<SocketAddr>();
                let served = axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .handle(handle)
                    .serve(app)
                    .await;

                if let Some(redirect) = redirect {
                    match redirect.await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => tracing::error!(error = %e, "Redirect listener failed"),
                        Err(e) => tracing::error!(error = %e, "Redirect listener task failed"),
                    }
                }
                served
            }
            None => {
                tracing::info!(address = %addr, "HTTP server starting");
                serve_plain(listener, self.router, shutdown.subscribe()).await
            }
        };

        shutdown.trigger();
        let _ = keepalive.await;
        tracing::info!("HTTP server stopped");
        result
    }
}

async fn serve_plain(
    listener: TcpListener,
    router: Router,
    shutdown: broadcast::Receiver<()>,
) -> io::Result<()> {
    let app = router
        .layer(Extension(Transport::Plain))
        .into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::wait(shutdown))
        .await
}
