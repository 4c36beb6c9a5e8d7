//! Page fetching with TTL caching for stash.
//!
//! [`WebCache`] memoizes page bodies under their URL for a fixed TTL and keeps
//! a per-URL access counter (`count:{url}`) in the same backend.

mod cache;
mod fetcher;

pub use cache::{WebCache, WebCacheConfig};
pub use fetcher::HttpFetcher;
