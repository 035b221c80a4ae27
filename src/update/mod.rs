//! Release update checks.
//!
//! # Data Flow
//! ```text
//! GET /update[/check]
//!     → UpdateProvider::get_update(force)
//!         → in-memory cache (mutex held across the fetch)
//!         → <data_dir>/update.json on first use
//!         → release endpoint when stale or forced
//!     → is_latest_version (semver)
//! ```
//!
//! # Design Decisions
//! - At most one fetch in flight: the cache lock is held while fetching
//! - Fetch failures are logged and reported as version "unknown", never
//!   retried here and never persisted

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::GatewayConfig;
use crate::health::heart::now_millis;

/// Result of an update check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    /// When the check ran, milliseconds since the epoch.
    pub checked: u64,
    /// Latest released version, or `unknown`.
    pub version: String,
}

#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: Option<String>,
    name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("release response has no version")]
    MissingVersion,
}

pub struct UpdateProvider {
    client: reqwest::Client,
    latest_url: Option<String>,
    interval: Duration,
    current: String,
    cache_path: PathBuf,
    cached: Mutex<Option<Update>>,
}

impl UpdateProvider {
    pub fn new(config: &GatewayConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("editor-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            client,
            latest_url: config
                .update
                .enabled
                .then(|| config.update.latest_url.clone()),
            interval: Duration::from_secs(config.update.check_interval_secs),
            current: config.build.version.clone(),
            cache_path: config.data_dir().join("update.json"),
            cached: Mutex::new(None),
        }
    }

    /// Version of the running build.
    pub fn current_version(&self) -> &str {
        &self.current
    }

    /// Cached update info, refreshed when stale or when `force` is set.
    pub async fn get_update(&self, force: bool) -> Update {
        let mut cached = self.cached.lock().await;
        if cached.is_none() {
            *cached = self.read_cache().await;
        }

        let now = now_millis();
        let interval = self.interval.as_millis() as u64;
        if let Some(update) = cached.as_ref() {
            let fresh = now.saturating_sub(update.checked) <= interval;
            if fresh && !force {
                return update.clone();
            }
        }

        let Some(url) = self.latest_url.as_deref() else {
            return cached.clone().unwrap_or_else(|| Update {
                checked: now,
                version: "unknown".to_string(),
            });
        };

        match self.fetch(url).await {
            Ok(version) => {
                let update = Update {
                    checked: now,
                    version,
                };
                self.write_cache(&update).await;
                *cached = Some(update.clone());
                update
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to get latest version");
                Update {
                    checked: now,
                    version: "unknown".to_string(),
                }
            }
        }
    }

    /// True unless `update` names a strictly newer version than this build.
    /// Unparsable versions count as latest.
    pub fn is_latest_version(&self, update: &Update) -> bool {
        is_latest(&update.version, &self.current)
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        tracing::debug!(url = %url, "Checking for updates");
        let release: LatestRelease = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let version = release
            .tag_name
            .or(release.name)
            .ok_or(FetchError::MissingVersion)?;
        Ok(version.trim_start_matches('v').to_string())
    }

    async fn read_cache(&self) -> Option<Update> {
        let content = tokio::fs::read(&self.cache_path).await.ok()?;
        serde_json::from_slice(&content).ok()
    }

    async fn write_cache(&self, update: &Update) {
        let result = match serde_json::to_vec(update) {
            Ok(bytes) => tokio::fs::write(&self.cache_path, bytes).await,
            Err(e) => Err(std::io::Error::other(e)),
        };
        if let Err(e) = result {
            tracing::warn!(path = %self.cache_path.display(), error = %e, "Failed to save update cache");
        }
    }
}

fn is_latest(latest: &str, current: &str) -> bool {
    match (semver::Version::parse(latest), semver::Version::parse(current)) {
        (Ok(latest), Ok(current)) => latest <= current,
        _ => true,
    }
}
