use std::{env, time::Duration};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Whether repository reads are cached (default: true)
    pub cache_enabled: bool,
    /// Cache TTL in seconds (default: 300)
    pub cache_ttl_seconds: u64,
    /// Prefix of every cache key (default: "repo")
    pub cache_prefix: String,
    /// Prefer tag flushes when the backend supports them (default: true)
    pub cache_use_tags: bool,
    /// Maximum number of cache entries (default: 10,000)
    pub cache_max_entries: usize,
    /// Redis connection URL (default: "redis://localhost:6379")
    /// Note: Only used when the `redis` feature is enabled.
    pub redis_url: String,
    /// Path to SQLite database file (default: "folio.db")
    /// Note: Only used when the `sqlite` feature is enabled.
    pub sqlite_path: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CACHE_ENABLED` - Cache reads (default: true)
    /// - `CACHE_TTL_SECONDS` - Cache TTL in seconds (default: 300)
    /// - `CACHE_PREFIX` - Cache key prefix (default: "repo")
    /// - `CACHE_USE_TAGS` - Use tag flushes when supported (default: true)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10,000)
    /// - `REDIS_URL` - Redis connection URL (default: "redis://localhost:6379")
    /// - `SQLITE_PATH` - SQLite database path (default: "folio.db")
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            cache_enabled: lookup("CACHE_ENABLED")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(true),
            cache_ttl_seconds: lookup("CACHE_TTL_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            cache_prefix: lookup("CACHE_PREFIX").unwrap_or_else(|| "repo".to_string()),
            cache_use_tags: lookup("CACHE_USE_TAGS")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(true),
            cache_max_entries: lookup("CACHE_MAX_ENTRIES")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(10_000),
            redis_url: lookup("REDIS_URL")
                .unwrap_or_else(|| "redis://localhost:6379".to_string()),
            sqlite_path: lookup("SQLITE_PATH").unwrap_or_else(|| "folio.db".to_string()),
        }
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// The settings consumed by the cache decorators.
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            enabled: self.cache_enabled,
            ttl: self.cache_ttl(),
            prefix: self.cache_prefix.clone(),
            use_tags: self.cache_use_tags,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Runtime switches of the caching layer.
///
/// Whether the backend supports tags is not configured here; it is probed
/// through `Cache::as_tagged`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl: Duration,
    pub prefix: String,
    pub use_tags: bool,
}

impl CacheSettings {
    /// Disables or enables caching.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the TTL of cached reads.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Enables or disables tag flushes.
    pub fn with_tags(mut self, use_tags: bool) -> Self {
        self.use_tags = use_tags;
        self
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(300),
            prefix: "repo".to_string(),
            use_tags: true,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
