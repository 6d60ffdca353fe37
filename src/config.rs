//! Feed configuration, read from a TOML file and the environment.
//!
//! The config file is optional; a missing file yields `FeedConfig::default()`.
//! Unknown keys are accepted but logged as a warning to catch typos.
//! Environment variables (`WEB_BASE_URL`, `IMAGES_HOST`, `SITE_NAME`,
//! `BLOG_CHARSET`) override file values.
use crate::content::MAX_POSTS;
use crate::image::ImageUrlResolver;
use crate::render::DEFAULT_PROXY_DOMAINS;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// Values parsed but cannot be used.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Settings shared by both feeds.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Blog name used in channel titles.
    pub site_name: String,

    /// Public base URL of the site; channel link and base for relative images.
    pub web_base_url: String,

    /// Host that replaces the host of every resolved image URL.
    pub images_host: Option<String>,

    /// Charset announced in the response content type.
    pub charset: String,

    /// Channel `<language>`.
    pub language: String,

    /// Items per feed, capped at [`MAX_POSTS`].
    pub max_items: usize,

    /// Public custom post types published alongside regular posts.
    pub extra_post_types: Vec<String>,

    /// Hosts that wrap third-party embeds.
    pub embed_proxy_domains: Vec<String>,

    pub probe: ProbeConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            site_name: String::new(),
            web_base_url: "http://localhost".to_string(),
            images_host: None,
            charset: "UTF-8".to_string(),
            language: "en-US".to_string(),
            max_items: MAX_POSTS,
            extra_post_types: Vec::new(),
            embed_proxy_domains: DEFAULT_PROXY_DOMAINS.iter().map(|d| d.to_string()).collect(),
            probe: ProbeConfig::default(),
        }
    }
}

/// Settings for the enclosure length lookup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Posts whose hero is looked up at the same time.
    pub concurrency: usize,

    /// Remembered lengths (0 disables the cache).
    pub cache_capacity: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            concurrency: 4,
            cache_capacity: 256,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    pub fn cache_capacity(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.cache_capacity)
    }
}

const KNOWN_KEYS: &[&str] = &[
    "site_name",
    "web_base_url",
    "images_host",
    "charset",
    "language",
    "max_items",
    "extra_post_types",
    "embed_proxy_domains",
    "probe",
];

const KNOWN_PROBE_KEYS: &[&str] = &["timeout_secs", "concurrency", "cache_capacity"];

impl FeedConfig {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(FeedConfig::default())`
    /// - Empty file → `Ok(FeedConfig::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check the size before reading a corrupted or hostile file into memory
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            warn_unknown_keys(&raw);
        }

        let config: FeedConfig = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            site = %config.site_name,
            base = %config.web_base_url,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Apply overrides from a variable lookup; blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("WEB_BASE_URL") {
            self.web_base_url = v;
        }
        if let Some(v) = var("IMAGES_HOST") {
            self.images_host = Some(v);
        }
        if let Some(v) = var("SITE_NAME") {
            self.site_name = v;
        }
        if let Some(v) = var("BLOG_CHARSET") {
            self.charset = v;
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Check the values the feeds cannot work without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site_name.trim().is_empty() {
            return Err(ConfigError::Invalid("site_name is empty".to_string()));
        }

        let base = Url::parse(self.site_base()).map_err(|e| {
            ConfigError::Invalid(format!("web_base_url {:?}: {e}", self.web_base_url))
        })?;
        if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
            return Err(ConfigError::Invalid(format!(
                "web_base_url must be an http(s) URL with a host, got {:?}",
                self.web_base_url
            )));
        }

        if self.charset.trim().is_empty() {
            return Err(ConfigError::Invalid("charset is empty".to_string()));
        }
        Ok(())
    }

    /// The base URL without trailing slashes.
    pub fn site_base(&self) -> &str {
        self.web_base_url.trim().trim_end_matches('/')
    }

    /// Items per feed, between 1 and [`MAX_POSTS`].
    pub fn item_limit(&self) -> usize {
        self.max_items.clamp(1, MAX_POSTS)
    }

    pub fn image_resolver(&self) -> ImageUrlResolver {
        ImageUrlResolver::new(self.site_base(), self.images_host.as_deref())
    }
}

fn warn_unknown_keys(raw: &toml::Table) {
    for key in raw.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            tracing::warn!(key = %key, "Unknown key in config file, ignoring");
        }
    }
    if let Some(toml::Value::Table(probe)) = raw.get("probe") {
        for key in probe.keys() {
            if !KNOWN_PROBE_KEYS.contains(&key.as_str()) {
                tracing::warn!(key = %key, "Unknown key in [probe], ignoring");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
