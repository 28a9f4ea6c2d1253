//! Access-token caching.
//!
//! Tokens live for about two hours and the token endpoint is rate limited,
//! so the last token is kept in a small JSON file in the user's home
//! directory and reused while at least [`EXPIRY_MARGIN_SECS`] of its lifetime
//! remains. The cache sits behind the [`TokenCache`] trait so tests (and
//! embedders) can substitute [`MemoryTokenCache`].
//!
//! Concurrent invocations race on the file; the last writer wins.

use crate::client::WeChatClient;
use crate::config::Credentials;
use crate::error::PressError;
use serde::{Deserialize, Deserializer, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// A cached token must have at least this many seconds left to be reused.
pub const EXPIRY_MARGIN_SECS: u64 = 300;

/// File name of the per-user cache, placed in the home directory.
pub const CACHE_FILE_NAME: &str = ".wechat_token_cache.json";

/// The single cached token record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    #[serde(rename = "appid")]
    pub owner_id: String,
    #[serde(rename = "access_token")]
    pub token: String,
    /// Unix timestamp, seconds. Fractional timestamps are floored on read.
    #[serde(deserialize_with = "epoch_secs")]
    pub expires_at: u64,
}

fn epoch_secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let secs = f64::deserialize(deserializer)?;
    Ok(if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    })
}

impl CachedToken {
    /// Usable for `owner_id` at time `now`, with the safety margin applied.
    pub fn is_fresh_for(&self, owner_id: &str, now: u64) -> bool {
        self.owner_id == owner_id && self.expires_at >= now.saturating_add(EXPIRY_MARGIN_SECS)
    }
}

/// Storage for the one cached token.
pub trait TokenCache: Send + Sync {
    /// The stored record, or `None` when absent or unreadable.
    fn get(&self) -> Option<CachedToken>;

    /// Replace the stored record.
    fn put(&self, token: &CachedToken) -> io::Result<()>;

    /// Remove the stored record. Clearing an empty cache succeeds.
    fn clear(&self) -> io::Result<()>;
}

/// JSON file cache at a fixed path.
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    path: PathBuf,
}

impl FileTokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache at `~/.wechat_token_cache.json`, or in the current directory
    /// when no home directory is known.
    pub fn default_location() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(CACHE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenCache for FileTokenCache {
    fn get(&self) -> Option<CachedToken> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(token) => Some(token),
            Err(e) => {
                debug!("Ignoring unreadable token cache {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn put(&self, token: &CachedToken) -> io::Result<()> {
        let json = serde_json::to_string(token)?;
        std::fs::write(&self.path, json)
    }

    fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// In-process cache.
#[derive(Debug, Default)]
pub struct MemoryTokenCache {
    slot: Mutex<Option<CachedToken>>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: CachedToken) -> Self {
        Self {
            slot: Mutex::new(Some(token)),
        }
    }
}

impl TokenCache for MemoryTokenCache {
    fn get(&self) -> Option<CachedToken> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    fn put(&self, token: &CachedToken) -> io::Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| io::Error::other("token cache lock poisoned"))?;
        *slot = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
        Ok(())
    }
}

/// Current Unix time in seconds.
pub fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Hands out access tokens, consulting the cache before the network.
#[derive(Clone)]
pub struct TokenManager {
    cache: Arc<dyn TokenCache>,
}

impl TokenManager {
    pub fn new(cache: Arc<dyn TokenCache>) -> Self {
        Self { cache }
    }

    /// Return a usable token for `credentials`.
    ///
    /// Without `force_refresh`, a cached token for the same AppID with at
    /// least [`EXPIRY_MARGIN_SECS`] remaining is returned without a request.
    /// Otherwise a new token is fetched and written to the cache; a failed
    /// cache write is logged and ignored. Endpoint errors are returned as
    /// [`PressError::Provider`] and never retried.
    pub async fn acquire(
        &self,
        client: &WeChatClient,
        credentials: &Credentials,
        force_refresh: bool,
    ) -> Result<String, PressError> {
        if !force_refresh {
            if let Some(cached) = self.cache.get() {
                if cached.is_fresh_for(&credentials.app_id, now_epoch_secs()) {
                    debug!("Reusing cached access token (expires at {})", cached.expires_at);
                    return Ok(cached.token);
                }
                debug!("Cached access token is stale or belongs to another account");
            }
        }

        info!("Requesting access token for {}", credentials.app_id);
        let grant = client.fetch_token(credentials).await?;

        let record = CachedToken {
            owner_id: credentials.app_id.clone(),
            token: grant.access_token,
            expires_at: now_epoch_secs().saturating_add(grant.expires_in),
        };
        if let Err(e) = self.cache.put(&record) {
            warn!("Could not persist access token: {}", e);
        }
        Ok(record.token)
    }

    /// Drop the cached token.
    pub fn clear(&self) -> Result<(), PressError> {
        self.cache
            .clear()
            .map_err(|e| PressError::Internal(format!("failed to clear token cache: {e}")))
    }
}
