use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration, Instant};

use crate::errors::AppError;

/// Paces calls to a quota-limited upstream.
///
/// Alpha Vantage's free tier allows 5 requests per minute, so the FX refresh
/// spaces its 20 pair lookups 13 seconds apart.
pub struct RateLimiter {
    /// Semaphore to limit concurrent requests
    semaphore: Arc<Semaphore>,
    /// When the previous permit was handed out
    last_request: Arc<Mutex<Option<Instant>>>,
    min_delay: Duration,
}

impl RateLimiter {
    /// # Arguments
    /// * `max_concurrent` - Maximum number of in-flight requests
    /// * `min_delay` - Minimum gap between two consecutive requests
    pub fn new(max_concurrent: usize, min_delay: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            last_request: Arc::new(Mutex::new(None)),
            min_delay,
        }
    }

    /// One request at a time, `min_delay` apart.
    pub fn paced(min_delay: Duration) -> Self {
        Self::new(1, min_delay)
    }

    pub fn per_minute(max_concurrent: usize, requests_per_minute: u32) -> Self {
        let min_delay_ms = 60_000 / u64::from(requests_per_minute.max(1));
        Self::new(max_concurrent, Duration::from_millis(min_delay_ms))
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Waits for a free slot and for `min_delay` to pass since the previous
    /// request. The first request goes through immediately.
    ///
    /// Returns a guard that releases the permit when dropped.
    pub async fn acquire(&self) -> Result<RateLimitGuard, AppError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::External(format!("rate limiter closed: {}", e)))?;

        let wait_time = {
            let last = self.last_request.lock();
            last.and_then(|at| self.min_delay.checked_sub(at.elapsed()))
        };

        if let Some(delay) = wait_time {
            sleep(delay).await;
        }

        *self.last_request.lock() = Some(Instant::now());

        Ok(RateLimitGuard { _permit: permit })
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Guard that holds a rate limit permit
pub struct RateLimitGuard {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant as StdInstant;

    #[tokio::test]
    async fn test_rate_limiter_enforces_delay() {
        let limiter = RateLimiter::paced(Duration::from_millis(200));

        let start = StdInstant::now();

        let guard1 = limiter.acquire().await.unwrap();
        assert!(start.elapsed().as_millis() < 100, "First request should be immediate");
        drop(guard1);

        let _guard2 = limiter.acquire().await.unwrap();
        assert!(start.elapsed().as_millis() >= 180, "Second request should wait ~200ms");
    }

    #[tokio::test]
    async fn test_per_minute_delay() {
        let limiter = RateLimiter::per_minute(1, 5);
        assert_eq!(limiter.min_delay(), Duration::from_secs(12));
    }

    #[tokio::test]
    async fn test_concurrent_limit() {
        let limiter = Arc::new(RateLimiter::new(2, Duration::from_millis(10)));

        let guard = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available_permits(), 1);

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    let _guard = limiter.acquire().await.unwrap();
                    sleep(Duration::from_millis(20)).await;
                })
            })
            .collect();

        drop(guard);
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(limiter.available_permits(), 2);
    }
}
