//! Client settings (`settings.toml`) and per-invocation connection options.

use std::path::Path;
use std::time::Duration;

use armory_schema::VersionOrdering;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Cache entries older than this are refetched.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15 * 60);
/// Concurrent fetches per refresh phase.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;
/// Dependency chain length limit.
pub const DEFAULT_MAX_DEPENDENCY_DEPTH: usize = 10;

/// Persistent settings. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How long fetched entries stay fresh.
    pub cache_ttl_secs: u64,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Concurrent fetches per refresh phase.
    pub max_concurrency: usize,
    /// Longest dependency chain followed.
    pub max_dependency_depth: usize,
    /// How versions are compared when checking for updates.
    pub version_ordering: VersionOrdering,
    /// Proxy URL for every request.
    pub proxy: Option<String>,
    /// Skip TLS certificate verification.
    pub insecure: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_dependency_depth: DEFAULT_MAX_DEPENDENCY_DEPTH,
            version_ordering: VersionOrdering::default(),
            proxy: None,
            insecure: false,
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// `cache_ttl_secs` as a [`Duration`].
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// `timeout_secs` as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Options governing one invocation's network and cache behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Proxy URL for every request.
    pub proxy: Option<String>,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Bypass fresh cache entries.
    pub ignore_cache: bool,
    /// How long fetched entries stay fresh.
    pub cache_ttl: Duration,
    /// Concurrent fetches per refresh phase.
    pub max_concurrency: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl FetchOptions {
    /// Options from persisted settings, with the cache honoured.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            timeout: settings.timeout(),
            proxy: settings.proxy.clone(),
            insecure: settings.insecure,
            ignore_cache: false,
            cache_ttl: settings.cache_ttl(),
            max_concurrency: settings.max_concurrency.max(1),
        }
    }
}
