//! Liveness heartbeat.
//!
//! # Responsibilities
//! - Record the last observed activity
//! - Persist it to a single-line file so an idle-shutdown watcher can read it
//! - Keep beating while WebSocket sessions stay attached
//!
//! # Design Decisions
//! - A beat inside the interval is a no-op; the file is touched at most once
//!   per interval
//! - Writes happen on a spawned task; a failed write is logged, never
//!   surfaced to the request

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;
use tokio::time;

use crate::net::connection::ConnectionTracker;

/// How long a single beat keeps the process alive.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Debug)]
pub struct Heart {
    path: PathBuf,
    interval: Duration,
    last_heartbeat: AtomicU64,
}

impl Heart {
    /// Create a heart backed by `path`, resuming from its timestamp if any.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_interval(path, HEARTBEAT_INTERVAL)
    }

    pub fn with_interval(path: impl Into<PathBuf>, interval: Duration) -> Self {
        let path = path.into();
        let last = read_timestamp(&path).unwrap_or(0);
        Self {
            path,
            interval,
            last_heartbeat: AtomicU64::new(last),
        }
    }

    /// Milliseconds since the epoch of the last recorded beat (0 if never).
    pub fn last_heartbeat(&self) -> u64 {
        self.last_heartbeat.load(Ordering::Relaxed)
    }

    pub fn alive(&self) -> bool {
        now_millis().saturating_sub(self.last_heartbeat()) <= self.interval.as_millis() as u64
    }

    /// Record activity. Fire-and-forget.
    pub fn beat(&self) {
        if self.alive() {
            return;
        }
        let now = now_millis();
        self.last_heartbeat.store(now, Ordering::Relaxed);
        tracing::trace!(timestamp = now, "Heartbeat");

        let path = self.path.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::fs::write(&path, format!("{now}\n")).await {
                tracing::warn!(path = %path.display(), error = %e, "Failed to write heartbeat");
            }
        });
    }

    /// Re-beat every interval while sessions are attached, until shutdown.
    pub fn spawn_keepalive(
        self: Arc<Self>,
        sessions: ConnectionTracker,
        mut shutdown: broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(self.interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let active = sessions.active_count();
                        tracing::trace!(active, "Keepalive tick");
                        if active > 0 {
                            self.beat();
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Keepalive received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }
}

fn read_timestamp(path: &Path) -> Option<u64> {
    let content = std::fs::read_to_string(path).ok()?;
    content.lines().next()?.trim().parse().ok()
}
