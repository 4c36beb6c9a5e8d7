//! TTL cache for fetched pages.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use stash_core::constants::{url_counter_key, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_PAGE_TTL_SECS};
use stash_core::error::{Result, StashError};
use stash_core::traits::{Fetcher, KeyValueBackend};
use stash_core::Value;

/// Web cache configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebCacheConfig {
    /// How long fetched content stays cached, in seconds
    pub ttl_seconds: u64,
    /// Deadline for a single fetch, in milliseconds
    pub timeout_ms: u64,
}

impl Default for WebCacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_PAGE_TTL_SECS,
            timeout_ms: DEFAULT_FETCH_TIMEOUT_SECS * 1000,
        }
    }
}

impl WebCacheConfig {
    /// Sets the content TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_seconds = ttl.as_secs().max(1);
        self
    }

    /// Sets the fetch deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        self
    }

    /// Content TTL as a `Duration`.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Fetch deadline as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Memoizes page fetches in a key-value backend.
///
/// Content is cached under the URL itself. Every call, hit or miss, bumps the
/// URL's access counter at `count:{url}` before the cache is consulted.
pub struct WebCache {
    backend: Arc<dyn KeyValueBackend>,
    fetcher: Arc<dyn Fetcher>,
    config: WebCacheConfig,
}

impl WebCache {
    /// Creates a web cache with default configuration.
    pub fn new(backend: Arc<dyn KeyValueBackend>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_config(backend, fetcher, WebCacheConfig::default())
    }

    /// Creates a web cache with custom configuration.
    pub fn with_config(
        backend: Arc<dyn KeyValueBackend>,
        fetcher: Arc<dyn Fetcher>,
        config: WebCacheConfig,
    ) -> Self {
        Self {
            backend,
            fetcher,
            config,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &WebCacheConfig {
        &self.config
    }

    /// Returns the page at `url`, caching it for the configured TTL.
    pub async fn cached_fetch(&self, url: &str) -> Result<String> {
        self.cached_fetch_with_ttl(url, self.config.ttl()).await
    }

    /// Returns the page at `url`, caching a fresh fetch for `ttl`.
    ///
    /// A hit performs no network access. A failed or timed-out fetch leaves
    /// the cache untouched and is returned to the caller.
    #[instrument(skip(self))]
    pub async fn cached_fetch_with_ttl(&self, url: &str, ttl: Duration) -> Result<String> {
        validate_url(url)?;
        if ttl.is_zero() {
            return Err(StashError::InvalidTtl);
        }

        let accesses = self.backend.increment(&url_counter_key(url))?;

        if let Some(cached) = self.backend.get(url)? {
            debug!(url, accesses, "Cache hit");
            return into_text(url, cached);
        }

        debug!(url, accesses, "Cache miss, fetching");

        let timeout = self.config.timeout();
        let content = tokio::time::timeout(timeout, self.fetcher.fetch(url, timeout))
            .await
            .map_err(|_| StashError::FetchTimeout {
                url: url.to_string(),
                timeout,
            })??;

        self.backend
            .set_with_ttl(url, Value::from(content.as_str()), ttl)?;

        info!(url, bytes = content.len(), "Cached page");
        Ok(content)
    }

    /// Returns how many times `url` was requested through this cache.
    pub fn access_count(&self, url: &str) -> Result<u64> {
        let count = self
            .backend
            .get(&url_counter_key(url))?
            .and_then(|value| value.as_integer())
            .unwrap_or(0);
        Ok(count.max(0) as u64)
    }

    /// Drops cached content for `url`. The access counter is kept.
    pub fn invalidate(&self, url: &str) -> Result<bool> {
        self.backend.delete(url)
    }
}

fn validate_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url).map_err(|e| StashError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(StashError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

fn into_text(url: &str, value: Value) -> Result<String> {
    match value {
        Value::Str(text) => Ok(text),
        other => String::from_utf8(other.to_bytes().into_owned())
            .map_err(|e| StashError::decode(url, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use stash_store::KeyValueStore;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::HttpFetcher;

    /// Serves a fixed body and counts fetches.
    struct StubFetcher {
        body: String,
        fetches: AtomicUsize,
        fail: bool,
    }

    impl StubFetcher {
        fn new(body: &str) -> Self {
            Self {
                body: body.to_string(),
                fetches: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new("")
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &str, _timeout: Duration) -> Result<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StashError::FetchError {
                    url: url.to_string(),
                    reason: "connection refused".into(),
                });
            }
            Ok(self.body.clone())
        }
    }

    /// Never answers.
    struct HangingFetcher;

    #[async_trait]
    impl Fetcher for HangingFetcher {
        async fn fetch(&self, _url: &str, _timeout: Duration) -> Result<String> {
            std::future::pending().await
        }
    }

    const URL: &str = "http://example.com/page";

    #[tokio::test]
    async fn test_hit_skips_fetch() {
        let store = Arc::new(KeyValueStore::new());
        let fetcher = Arc::new(StubFetcher::new("<p>hello</p>"));
        let cache = WebCache::new(store.clone(), fetcher.clone());

        assert_eq!(cache.cached_fetch(URL).await.unwrap(), "<p>hello</p>");
        assert_eq!(cache.cached_fetch(URL).await.unwrap(), "<p>hello</p>");

        assert_eq!(fetcher.fetches(), 1);
        assert_eq!(cache.access_count(URL).unwrap(), 2);
        assert!(store.ttl(URL).unwrap().unwrap() <= Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_expired_content_is_refetched() {
        let store = Arc::new(KeyValueStore::new());
        let fetcher = Arc::new(StubFetcher::new("body"));
        let cache = WebCache::new(store, fetcher.clone());

        let ttl = Duration::from_millis(50);
        cache.cached_fetch_with_ttl(URL, ttl).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        cache.cached_fetch_with_ttl(URL, ttl).await.unwrap();

        assert_eq!(fetcher.fetches(), 2);
        assert_eq!(cache.access_count(URL).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let store = Arc::new(KeyValueStore::new());
        let cache = WebCache::new(store.clone(), Arc::new(StubFetcher::failing()));

        let err = cache.cached_fetch(URL).await.unwrap_err();
        assert!(matches!(err, StashError::FetchError { .. }));
        assert_eq!(store.get(URL).unwrap(), None);
        assert_eq!(cache.access_count(URL).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_timeout_applies_to_any_fetcher() {
        let store = Arc::new(KeyValueStore::new());
        let config = WebCacheConfig::default().with_timeout(Duration::from_millis(30));
        let cache = WebCache::with_config(store.clone(), Arc::new(HangingFetcher), config);

        let err = cache.cached_fetch(URL).await.unwrap_err();
        assert!(matches!(err, StashError::FetchTimeout { .. }));
        assert_eq!(store.get(URL).unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_urls_rejected() {
        let store = Arc::new(KeyValueStore::new());
        let fetcher = Arc::new(StubFetcher::new("x"));
        let cache = WebCache::new(store, fetcher.clone());

        assert!(matches!(
            cache.cached_fetch("not a url").await,
            Err(StashError::InvalidUrl { .. })
        ));
        assert!(matches!(
            cache.cached_fetch("ftp://example.com/file").await,
            Err(StashError::InvalidUrl { .. })
        ));
        assert_eq!(fetcher.fetches(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_keeps_counter() {
        let store = Arc::new(KeyValueStore::new());
        let fetcher = Arc::new(StubFetcher::new("x"));
        let cache = WebCache::new(store, fetcher.clone());

        cache.cached_fetch(URL).await.unwrap();
        assert!(cache.invalidate(URL).unwrap());
        cache.cached_fetch(URL).await.unwrap();

        assert_eq!(fetcher.fetches(), 2);
        assert_eq!(cache.access_count(URL).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_closed_backend_surfaces_unavailable() {
        let store = Arc::new(KeyValueStore::new());
        let cache = WebCache::new(store.clone(), Arc::new(StubFetcher::new("x")));
        store.close();

        let err = cache.cached_fetch(URL).await.unwrap_err();
        assert!(matches!(err, StashError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_over_http_fetches_once_within_ttl() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>news</h1>"))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(KeyValueStore::new());
        let cache = WebCache::new(store, Arc::new(HttpFetcher::new().unwrap()));
        let url = format!("{}/article", server.uri());

        assert_eq!(cache.cached_fetch(&url).await.unwrap(), "<h1>news</h1>");
        assert_eq!(cache.cached_fetch(&url).await.unwrap(), "<h1>news</h1>");
        assert_eq!(cache.access_count(&url).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_over_http_timeout_leaves_cache_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let store = Arc::new(KeyValueStore::new());
        let config = WebCacheConfig::default().with_timeout(Duration::from_millis(50));
        let cache = WebCache::with_config(store.clone(), Arc::new(HttpFetcher::new().unwrap()), config);
        let url = format!("{}/slow", server.uri());

        let err = cache.cached_fetch(&url).await.unwrap_err();
        assert!(matches!(err, StashError::FetchTimeout { .. }));
        assert_eq!(store.get(&url).unwrap(), None);
    }

    #[test]
    fn test_config() {
        let config = WebCacheConfig::default();
        assert_eq!(config.ttl(), Duration::from_secs(10));
        assert_eq!(config.timeout(), Duration::from_secs(5));

        let config = config.with_ttl(Duration::from_secs(30));
        assert_eq!(config.ttl_seconds, 30);
    }

    #[test]
    fn test_timeout_saturates_instead_of_wrapping() {
        let config = WebCacheConfig::default().with_timeout(Duration::MAX);
        assert_eq!(config.timeout_ms, u64::MAX);

        let config = WebCacheConfig::default().with_timeout(Duration::ZERO);
        assert_eq!(config.timeout_ms, 1);
    }
}
