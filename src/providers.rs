//! Shared provider traits for dependency injection.
//!
//! This module contains the traits the orchestrator uses to reach the clock
//! and the timer. Production code uses the system clock and tokio's timer;
//! tests inject fixed clocks and sleepers that only record what was asked.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Trait for providing timestamps.
///
/// This abstraction enables deterministic testing of session records by
/// allowing injection of mock time providers.
///
/// # Example
///
/// ```
/// use patrick_push::providers::{TimeProvider, SystemTimeProvider};
///
/// let provider = SystemTimeProvider;
/// let timestamp = provider.now();
/// assert!(timestamp.timestamp() > 0);
/// ```
pub trait TimeProvider: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Default time provider using system time.
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Trait for suspending the current task for a fixed duration.
///
/// Every deliberate delay in the attempt loop (the inter-attempt pause and the
/// rate-limit backoff) goes through this trait.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by `tokio::time::sleep`.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
