use std::time::Duration;

/// Exponential backoff between render attempts.
///
/// An explicit bounded loop in the runner consults this policy rather than
/// wrapping calls in a retry combinator, so tests can drive it with a
/// paused tokio clock.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Automatic re-attempts beyond the first try.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(5),
            multiplier: 2.0,
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}
