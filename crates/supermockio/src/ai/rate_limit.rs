//! Token-bucket limiter for AI calls.
//!
//! Waiters queue on a fair async mutex, so admission is FIFO. The waiting
//! caller holds the queue while it sleeps for the next token; there is no
//! cancellation or priority.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    /// Tokens per second
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(tokens_per_interval: u32, interval: Duration) -> Self {
        let capacity = f64::from(tokens_per_interval.max(1));
        Self {
            tokens: capacity,
            capacity,
            refill_rate: capacity / interval.as_secs_f64(),
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn time_until_token(&self) -> Duration {
        let missing = (1.0 - self.tokens).max(0.0);
        Duration::from_secs_f64(missing / self.refill_rate)
    }
}

/// Rate limiter with `tokens_per_minute` capacity.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
}

impl RateLimiter {
    pub fn per_minute(tokens_per_minute: u32) -> Self {
        Self::new(tokens_per_minute, Duration::from_secs(60))
    }

    pub fn new(tokens_per_interval: u32, interval: Duration) -> Self {
        Self {
            bucket: Mutex::new(TokenBucket::new(tokens_per_interval, interval)),
        }
    }

    /// Wait until a token is available and take it.
    pub async fn acquire(&self) {
        let mut bucket = self.bucket.lock().await;
        while !bucket.try_consume() {
            let wait = bucket.time_until_token();
            debug!("AI rate limit reached, waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_wait() {
        let limiter = RateLimiter::per_minute(2);
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(29));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_admission() {
        let limiter = Arc::new(RateLimiter::per_minute(1));
        limiter.acquire().await;

        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for id in 0..3 {
            let limiter = Arc::clone(&limiter);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                order.lock().push(id);
            }));
            // Let each task enqueue before spawning the next
            tokio::task::yield_now().await;
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }
}
