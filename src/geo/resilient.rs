use crate::geo::{GeoError, GeoInfo, GeoLookup};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Timeout and retry settings for a single lookup.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Deadline for each attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (1-based), doubling up to `max_backoff`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

/// Applies a per-attempt timeout and retries `Unavailable` failures with
/// exponential backoff. `NotFound` is returned immediately.
pub struct ResilientLookup<L> {
    inner: L,
    policy: RetryPolicy,
}

impl<L: GeoLookup> ResilientLookup<L> {
    pub fn new(inner: L, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<L: GeoLookup> GeoLookup for ResilientLookup<L> {
    async fn resolve(&self, place_name: &str) -> Result<GeoInfo, GeoError> {
        let mut attempt = 0u32;
        loop {
            let outcome = match tokio::time::timeout(self.policy.timeout, self.inner.resolve(place_name)).await {
                Ok(result) => result,
                Err(_) => Err(GeoError::unavailable(
                    place_name,
                    format!("timed out after {:?}", self.policy.timeout),
                )),
            };

            match outcome {
                Err(err) if err.is_retryable() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    let delay = self.policy.backoff(attempt);
                    warn!(place = place_name, attempt, ?delay, error = %err, "retrying country lookup");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

/// Memoizes successful lookups by case-folded name for the lifetime of the value.
pub struct CachedLookup<L> {
    inner: L,
    cache: Mutex<HashMap<String, GeoInfo>>,
}

impl<L: GeoLookup> CachedLookup<L> {
    pub fn new(inner: L) -> Self {
        Self { inner, cache: Mutex::new(HashMap::new()) }
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.lock().await.len()
    }
}

#[async_trait]
impl<L: GeoLookup> GeoLookup for CachedLookup<L> {
    async fn resolve(&self, place_name: &str) -> Result<GeoInfo, GeoError> {
        let key = place_name.to_lowercase();
        if let Some(hit) = self.cache.lock().await.get(&key) {
            debug!(place = place_name, "country lookup cache hit");
            return Ok(hit.clone());
        }
        let info = self.inner.resolve(place_name).await?;
        self.cache.lock().await.insert(key, info.clone());
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with `Unavailable` for the first `failures` calls.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl GeoLookup for Flaky {
        async fn resolve(&self, place_name: &str) -> Result<GeoInfo, GeoError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(GeoError::unavailable(place_name, "connection reset"))
            } else {
                Ok(GeoInfo::new("Capital", 1.0, 2.0))
            }
        }
    }

    struct Missing;

    #[async_trait]
    impl GeoLookup for Missing {
        async fn resolve(&self, place_name: &str) -> Result<GeoInfo, GeoError> {
            Err(GeoError::NotFound(place_name.to_string()))
        }
    }

    struct Slow;

    #[async_trait]
    impl GeoLookup for Slow {
        async fn resolve(&self, _place_name: &str) -> Result<GeoInfo, GeoError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(GeoInfo::new("never", 0.0, 0.0))
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            timeout: Duration::from_millis(50),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(350));
        assert_eq!(policy.backoff(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let lookup = ResilientLookup::new(Flaky { failures: 2, calls: AtomicU32::new(0) }, fast_policy(3));
        let info = lookup.resolve("usa").await.unwrap();
        assert_eq!(info.capital, "Capital");
        assert_eq!(lookup.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let lookup = ResilientLookup::new(Flaky { failures: 10, calls: AtomicU32::new(0) }, fast_policy(2));
        let err = lookup.resolve("usa").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(lookup.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let lookup = ResilientLookup::new(Missing, fast_policy(5));
        assert_eq!(lookup.resolve("atlantis").await, Err(GeoError::NotFound("atlantis".into())));
    }

    #[tokio::test]
    async fn test_timeout_becomes_unavailable() {
        let lookup = ResilientLookup::new(Slow, fast_policy(0));
        let err = lookup.resolve("usa").await.unwrap_err();
        assert!(matches!(err, GeoError::Unavailable { ref reason, .. } if reason.contains("timed out")));
    }

    #[tokio::test]
    async fn test_cache_hits_are_case_insensitive() {
        let lookup = CachedLookup::new(Flaky { failures: 0, calls: AtomicU32::new(0) });
        lookup.resolve("UK").await.unwrap();
        lookup.resolve("uk").await.unwrap();
        assert_eq!(lookup.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(lookup.cached_len().await, 1);
    }
}
