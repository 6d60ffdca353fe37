use crate::config::ProbeConfig;
use async_trait::async_trait;
use lru::LruCache;
use reqwest::header::CONTENT_LENGTH;
use reqwest::redirect::Policy;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Default time allowed for one HEAD request.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Best-effort lookup of a remote resource's size in bytes.
///
/// Used for the `length` attribute of MSN enclosures. Implementations swallow
/// every failure: `None` means "unknown" and the attribute is left empty.
#[async_trait]
pub trait ContentLengthProbe: Send + Sync {
    async fn content_length(&self, url: &str) -> Option<u64>;
}

/// Probe that never looks anything up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLengthProbe;

#[async_trait]
impl ContentLengthProbe for NoLengthProbe {
    async fn content_length(&self, _url: &str) -> Option<u64> {
        None
    }
}

/// Why a probe came back empty. Only ever logged.
#[derive(Debug, Error)]
enum ProbeError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Request timed out")]
    Timeout,
    /// Header absent or not a number
    #[error("No usable Content-Length header")]
    MissingLength,
}

/// Issues an HTTP HEAD request and reads `Content-Length`.
#[derive(Debug, Clone)]
pub struct HttpLengthProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpLengthProbe {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn head(&self, url: &str) -> Result<u64, ProbeError> {
        let response = tokio::time::timeout(self.timeout, self.client.head(url).send())
            .await
            .map_err(|_| ProbeError::Timeout)??;

        if !response.status().is_success() {
            return Err(ProbeError::HttpStatus(response.status().as_u16()));
        }

        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .ok_or(ProbeError::MissingLength)
    }
}

#[async_trait]
impl ContentLengthProbe for HttpLengthProbe {
    async fn content_length(&self, url: &str) -> Option<u64> {
        match self.head(url).await {
            Ok(length) => Some(length),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Content length unavailable");
                None
            }
        }
    }
}

/// HTTP client for HEAD probes: short redirect chains, loops refused.
pub fn probe_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(redirect_policy())
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .build()
}

fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );
        attempt.follow()
    })
}

/// The HTTP probe described by `config`, wrapped in a cache when one is
/// configured.
pub fn http_probe(config: &ProbeConfig) -> reqwest::Result<Arc<dyn ContentLengthProbe>> {
    let probe = HttpLengthProbe::new(probe_client()?).with_timeout(config.timeout());
    let probe: Arc<dyn ContentLengthProbe> = match config.cache_capacity() {
        Some(capacity) => Arc::new(CachedLengthProbe::new(probe, capacity)),
        None => Arc::new(probe),
    };
    Ok(probe)
}

/// Remembers successful lookups of an inner probe in a bounded LRU.
///
/// Failures are not cached, so a flaky image host is retried next time.
pub struct CachedLengthProbe<P> {
    inner: P,
    cache: Mutex<LruCache<String, u64>>,
}

impl<P: ContentLengthProbe> CachedLengthProbe<P> {
    pub fn new(inner: P, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn cached(&self, url: &str) -> Option<u64> {
        match self.cache.lock() {
            Ok(mut cache) => cache.get(url).copied(),
            Err(_) => None,
        }
    }
}

#[async_trait]
impl<P: ContentLengthProbe> ContentLengthProbe for CachedLengthProbe<P> {
    async fn content_length(&self, url: &str) -> Option<u64> {
        if let Some(length) = self.cached(url) {
            tracing::trace!(url = %url, length = length, "Content length cache hit");
            return Some(length);
        }

        let length = self.inner.content_length(url).await?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(url.to_string(), length);
        }
        Some(length)
    }
}
