//! Pregame odds provider (§10.5) and the pregame cache (§3).
//!
//! The pregame odds vendor's HTTP client is out of scope as an
//! implementation, but the engine needs a concrete trait and a real
//! `HttpPregameProvider` to exercise the startup/refresh path end to end,
//! following the `EspnClient`/`KalshiClient` shape: timeout, circuit
//! breaker, `is_available()`/`record_success()`/`record_failure()`.

use crate::circuit_breaker::{ApiCircuitBreaker, ApiCircuitBreakerConfig};
use crate::types::PregameOdds;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[async_trait]
pub trait PregameProvider: Send + Sync {
    async fn fetch(&self) -> Result<Vec<PregameOdds>>;
}

pub struct HttpPregameProvider {
    client: Client,
    endpoint: String,
    circuit_breaker: Arc<ApiCircuitBreaker>,
}

impl HttpPregameProvider {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(45))
                .build()
                .unwrap_or_else(|_| Client::new()),
            endpoint,
            circuit_breaker: Arc::new(ApiCircuitBreaker::new(
                "pregame-odds",
                ApiCircuitBreakerConfig {
                    failure_threshold: 5,
                    recovery_timeout: Duration::from_secs(60),
                    success_threshold: 2,
                },
            )),
        }
    }

    pub fn is_available(&self) -> bool {
        self.circuit_breaker.is_available()
    }
}

#[async_trait]
impl PregameProvider for HttpPregameProvider {
    async fn fetch(&self) -> Result<Vec<PregameOdds>> {
        if !self.circuit_breaker.is_available() {
            return Err(anyhow!("pregame odds circuit breaker is open"));
        }

        let result = self.fetch_internal().await;
        match &result {
            Ok(_) => self.circuit_breaker.record_success(),
            Err(_) => self.circuit_breaker.record_failure(),
        }
        result
    }
}

impl HttpPregameProvider {
    async fn fetch_internal(&self) -> Result<Vec<PregameOdds>> {
        let resp = self.client.get(&self.endpoint).send().await?;
        let odds: Vec<PregameOdds> = resp.json().await?;
        Ok(odds)
    }
}

/// Fetch with exponential back-off: `init_max_attempts` tries, `init_retry_base`
/// doubling each attempt (§4.7.7).
pub async fn fetch_with_backoff(
    provider: &dyn PregameProvider,
    max_attempts: u32,
    retry_base: Duration,
) -> Result<Vec<PregameOdds>> {
    let mut attempt = 0;
    let mut delay = retry_base;
    loop {
        attempt += 1;
        match provider.fetch().await {
            Ok(odds) => return Ok(odds),
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(e) => {
                log::warn!("pregame fetch attempt {attempt} failed: {e}, retrying in {delay:?}");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }
}

/// Process-level resource owned by the engine (or one per sport); never a
/// language-level singleton, always passed explicitly.
pub struct PregameCache {
    cache: RwLock<Vec<PregameOdds>>,
    last_fetch_time: RwLock<Option<Instant>>,
    last_attempt_time: RwLock<Option<Instant>>,
    ttl: Duration,
    retry_cool: Duration,
}

impl PregameCache {
    pub fn new(ttl: Duration, retry_cool: Duration) -> Self {
        Self {
            cache: RwLock::new(Vec::new()),
            last_fetch_time: RwLock::new(None),
            last_attempt_time: RwLock::new(None),
            ttl,
            retry_cool,
        }
    }

    /// Snapshot read used during in-game event routing; never triggers a fetch.
    pub async fn snapshot(&self) -> Vec<PregameOdds> {
        self.cache.read().await.clone()
    }

    fn is_stale(last_fetch: Option<Instant>, ttl: Duration, now: Instant) -> bool {
        match last_fetch {
            None => true,
            Some(t) => now.duration_since(t) > ttl,
        }
    }

    fn can_attempt(last_attempt: Option<Instant>, cool: Duration, now: Instant) -> bool {
        match last_attempt {
            None => true,
            Some(t) => now.duration_since(t) > cool,
        }
    }

    /// Refresh if the cache is stale, guarded from hammering by the retry
    /// cooldown. Returns true if a fetch was actually attempted.
    pub async fn maybe_refresh(&self, provider: &dyn PregameProvider) -> Result<bool> {
        let now = Instant::now();
        let last_fetch = *self.last_fetch_time.read().await;
        if !Self::is_stale(last_fetch, self.ttl, now) {
            return Ok(false);
        }

        let last_attempt = *self.last_attempt_time.read().await;
        if !Self::can_attempt(last_attempt, self.retry_cool, now) {
            return Ok(false);
        }

        *self.last_attempt_time.write().await = Some(now);
        let odds = provider.fetch().await?;
        *self.cache.write().await = odds;
        *self.last_fetch_time.write().await = Some(now);
        Ok(true)
    }
}

#[cfg(test)]
pub struct FakePregameProvider {
    pub odds: Vec<PregameOdds>,
    pub fail_times: std::sync::atomic::AtomicU32,
}

#[cfg(test)]
#[async_trait]
impl PregameProvider for FakePregameProvider {
    async fn fetch(&self) -> Result<Vec<PregameOdds>> {
        use std::sync::atomic::Ordering;
        if self.fail_times.load(Ordering::SeqCst) > 0 {
            self.fail_times.fetch_sub(1, Ordering::SeqCst);
            return Err(anyhow!("simulated transient failure"));
        }
        Ok(self.odds.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn sample_odds() -> Vec<PregameOdds> {
        vec![PregameOdds {
            home_team: "Arsenal".into(),
            away_team: "Chelsea".into(),
            home_strength: 0.45,
            draw_pct: 0.28,
            away_strength: 0.27,
            g0: Some(2.6),
        }]
    }

    #[tokio::test]
    async fn maybe_refresh_fetches_when_stale() {
        let cache = PregameCache::new(Duration::from_secs(0), Duration::from_secs(0));
        let provider = FakePregameProvider {
            odds: sample_odds(),
            fail_times: AtomicU32::new(0),
        };
        let refreshed = cache.maybe_refresh(&provider).await.unwrap();
        assert!(refreshed);
        assert_eq!(cache.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn maybe_refresh_skips_when_fresh() {
        let cache = PregameCache::new(Duration::from_secs(3600), Duration::from_secs(0));
        let provider = FakePregameProvider {
            odds: sample_odds(),
            fail_times: AtomicU32::new(0),
        };
        assert!(cache.maybe_refresh(&provider).await.unwrap());
        assert!(!cache.maybe_refresh(&provider).await.unwrap());
    }

    #[tokio::test]
    async fn fetch_with_backoff_retries_then_succeeds() {
        let provider = FakePregameProvider {
            odds: sample_odds(),
            fail_times: AtomicU32::new(2),
        };
        let result = fetch_with_backoff(&provider, 5, Duration::from_millis(1)).await;
        assert!(result.is_ok());
        assert_eq!(result.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fetch_with_backoff_gives_up_after_max_attempts() {
        let provider = FakePregameProvider {
            odds: sample_odds(),
            fail_times: AtomicU32::new(10),
        };
        let result = fetch_with_backoff(&provider, 3, Duration::from_millis(1)).await;
        assert!(result.is_err());
    }
}
