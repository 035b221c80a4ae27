//! Editor backend reached over the network.
//!
//! # Responsibilities
//! - Fetch workbench options from `GET {backend}/initialize`
//! - Open a backend WebSocket per client session
//! - Relay frames in both directions until either side closes
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Gateway ←──── WebSocket frames ────→ Editor
//! ```
//!
//! # Design Decisions
//! - Frame-level forwarding, no message buffering
//! - Close frames propagated in both directions; raw frames are dropped

use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{self, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::{BackendError, EditorBackend, EditorContext, WorkbenchOptions};
use crate::http::request::{encode_query, QueryMap};

pub struct RemoteEditor {
    base: Url,
    client: reqwest::Client,
}

impl RemoteEditor {
    pub fn new(backend_url: &str) -> Result<Self, BackendError> {
        let mut base = Url::parse(backend_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { base, client })
    }

    fn endpoint(&self, path: &str, query: &QueryMap) -> Result<Url, BackendError> {
        let mut url = self.base.join(path)?;
        let encoded = encode_query(query);
        url.set_query((!encoded.is_empty()).then_some(encoded.as_str()));
        Ok(url)
    }

    fn websocket_url(&self, query: &QueryMap) -> Result<Url, BackendError> {
        let mut url = self.endpoint("", query)?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        // http(s) → ws(s) is always a valid scheme change.
        let _ = url.set_scheme(scheme);
        Ok(url)
    }
}

#[async_trait]
impl EditorBackend for RemoteEditor {
    async fn initialize(
        &self,
        ctx: EditorContext,
        query: &QueryMap,
    ) -> Result<WorkbenchOptions, BackendError> {
        let mut url = self.endpoint("initialize", query)?;
        url.query_pairs_mut()
            .append_pair("remoteAuthority", &ctx.remote_authority)
            .append_pair("disableTelemetry", &ctx.disable_telemetry.to_string());

        tracing::debug!(url = %url, "Initializing editor workbench");
        let options = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(options)
    }

    async fn attach_websocket(
        &self,
        socket: WebSocket,
        query: QueryMap,
    ) -> Result<(), BackendError> {
        let url = self.websocket_url(&query)?;
        let (upstream, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
        tracing::debug!(url = %url, "Backend websocket connected");

        let (mut upstream_sink, mut upstream_stream) = upstream.split();
        let (mut client_sink, mut client_stream) = socket.split();

        let client_to_backend = async {
            while let Some(message) = client_stream.next().await {
                let message = message?;
                let closing = matches!(message, ws::Message::Close(_));
                upstream_sink.send(to_backend(message)).await?;
                if closing {
                    break;
                }
            }
            Ok::<_, BackendError>(())
        };

        let backend_to_client = async {
            while let Some(message) = upstream_stream.next().await {
                let Some(message) = to_client(message?) else {
                    continue;
                };
                let closing = matches!(message, ws::Message::Close(_));
                client_sink.send(message).await?;
                if closing {
                    break;
                }
            }
            Ok::<_, BackendError>(())
        };

        tokio::select! {
            result = client_to_backend => result,
            result = backend_to_client => result,
        }
    }
}

fn to_backend(message: ws::Message) -> Message {
    match message {
        ws::Message::Text(text) => Message::Text(text.as_str().to_owned().into()),
        ws::Message::Binary(data) => Message::Binary(data),
        ws::Message::Ping(data) => Message::Ping(data),
        ws::Message::Pong(data) => Message::Pong(data),
        ws::Message::Close(frame) => Message::Close(frame.map(|frame| CloseFrame {
            code: CloseCode::from(frame.code),
            reason: frame.reason.as_str().to_owned().into(),
        })),
    }
}

fn to_client(message: Message) -> Option<ws::Message> {
    let message = match message {
        Message::Text(text) => ws::Message::Text(text.as_str().to_owned().into()),
        Message::Binary(data) => ws::Message::Binary(data),
        Message::Ping(data) => ws::Message::Ping(data),
        Message::Pong(data) => ws::Message::Pong(data),
        Message::Close(frame) => ws::Message::Close(frame.map(|frame| ws::CloseFrame {
            code: frame.code.into(),
            reason: frame.reason.as_str().to_owned().into(),
        })),
        Message::Frame(_) => return None,
    };
    Some(message)
}
