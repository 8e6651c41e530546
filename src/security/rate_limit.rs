//! Process-wide token bucket rate limiting.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::config::RateLimitConfig;

/// Default sustained rate, requests per second.
pub const DEFAULT_RATE: u32 = 1;
/// Default burst capacity.
pub const DEFAULT_BURST: u32 = 4;

/// Time source for the limiter.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

/// `Instant::now()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A simple token bucket.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn try_acquire(&mut self, now: Instant, capacity: f64, refill_rate: f64) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        // Refill tokens. A stale `now` must not rewind the refill point.
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = self.last_update.max(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Gate shared by every request. Starts full.
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    burst: f64,
    bucket: Mutex<TokenBucket>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(rate: u32, burst: u32) -> Self {
        Self::with_clock(rate, burst, Arc::new(MonotonicClock))
    }

    /// Build with an explicit time source.
    pub fn with_clock(rate: u32, burst: u32, clock: Arc<dyn Clock>) -> Self {
        let burst = f64::from(burst);
        Self {
            rate: f64::from(rate),
            burst,
            bucket: Mutex::new(TokenBucket {
                tokens: burst,
                last_update: clock.now(),
            }),
            clock,
        }
    }

    /// Build from configuration. Non-positive values keep the defaults.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::from_config_with_clock(config, Arc::new(MonotonicClock))
    }

    pub fn from_config_with_clock(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        let rate = positive_or_default("requests_per_second", config.requests_per_second, DEFAULT_RATE);
        let burst = positive_or_default("burst_size", config.burst_size, DEFAULT_BURST);
        tracing::info!(rate, burst, "Rate limiter configured");
        Self::with_clock(rate, burst, clock)
    }

    /// Take one token if available.
    pub fn allow(&self) -> bool {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();
        bucket.try_acquire(now, self.burst, self.rate)
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn burst(&self) -> f64 {
        self.burst
    }
}

fn positive_or_default(field: &str, value: i64, default: u32) -> u32 {
    if value <= 0 {
        tracing::warn!(field, value, default, "Ignoring non-positive rate limit setting");
        return default;
    }
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug)]
    struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Instant::now()),
            })
        }

        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }

    #[test]
    fn burst_then_deny_then_refill() {
        let clock = ManualClock::new();
        let limiter = RateLimiter::with_clock(1, 4, clock.clone());

        let allowed = (0..5).filter(|_| limiter.allow()).count();
        assert_eq!(allowed, 4);
        assert!(!limiter.allow());

        clock.advance(Duration::from_secs(1));
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }

    #[test]
    fn refill_is_continuous() {
        let clock = ManualClock::new();
        let limiter = RateLimiter::with_clock(2, 1, clock.clone());
        assert!(limiter.allow());
        assert!(!limiter.allow());

        clock.advance(Duration::from_millis(250));
        assert!(!limiter.allow());
        clock.advance(Duration::from_millis(250));
        assert!(limiter.allow());
    }

    #[test]
    fn refill_never_exceeds_burst() {
        let clock = ManualClock::new();
        let limiter = RateLimiter::with_clock(10, 3, clock.clone());
        clock.advance(Duration::from_secs(60));
        assert_eq!((0..10).filter(|_| limiter.allow()).count(), 3);
    }

    #[test]
    fn non_positive_config_keeps_defaults() {
        let limiter = RateLimiter::from_config(&RateLimitConfig {
            requests_per_second: 0,
            burst_size: -5,
        });
        assert_eq!(limiter.rate(), f64::from(DEFAULT_RATE));
        assert_eq!(limiter.burst(), f64::from(DEFAULT_BURST));

        let limiter = RateLimiter::from_config(&RateLimitConfig {
            requests_per_second: 50,
            burst_size: 100,
        });
        assert_eq!(limiter.rate(), 50.0);
        assert_eq!(limiter.burst(), 100.0);
    }

    /// Hands out instants from a fixed script, in order.
    #[derive(Debug)]
    struct ScriptedClock {
        script: Mutex<std::collections::VecDeque<Instant>>,
    }

    impl Clock for ScriptedClock {
        fn now(&self) -> Instant {
            self.script.lock().unwrap().pop_front().unwrap()
        }
    }

    #[test]
    fn out_of_order_reading_does_not_refill_twice() {
        let t0 = Instant::now();
        let secs = |n| t0 + Duration::from_secs(n);
        // construction, four draining calls, then T+2, a late T+1, and T+2 again
        let script = [0, 0, 0, 0, 0, 2, 1, 2].map(secs);
        let clock = Arc::new(ScriptedClock {
            script: Mutex::new(script.into_iter().collect()),
        });
        let limiter = RateLimiter::with_clock(1, 4, clock);

        assert_eq!((0..4).filter(|_| limiter.allow()).count(), 4);
        let granted = (0..3).filter(|_| limiter.allow()).count();
        assert_eq!(granted, 2, "1 req/s may grant at most 2 tokens over 2 seconds");
    }

    #[test]
    fn bucket_ignores_stale_timestamps() {
        let t0 = Instant::now();
        let mut bucket = TokenBucket {
            tokens: 0.0,
            last_update: t0,
        };
        assert!(bucket.try_acquire(t0 + Duration::from_secs(2), 4.0, 1.0));
        assert!(bucket.try_acquire(t0 + Duration::from_secs(1), 4.0, 1.0));
        assert_eq!(bucket.last_update, t0 + Duration::from_secs(2));
        assert!(!bucket.try_acquire(t0 + Duration::from_secs(2), 4.0, 1.0));
    }

    #[test]
    fn concurrent_callers_share_one_bucket() {
        let clock = ManualClock::new();
        let limiter = Arc::new(RateLimiter::with_clock(1, 40, clock));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || (0..20).filter(|_| limiter.allow()).count())
            })
            .collect();

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 40);
    }
}
