//! Reconnection delay policy
//!
//! Fixed delay by default; exponential growth and jitter are opt-in through
//! [`ReconnectConfig`].

use rand::Rng;
use std::time::Duration;

/// Reconnection behavior
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt
    pub initial_delay: Duration,
    /// Cap on the delay between attempts
    pub max_delay: Duration,
    /// Growth factor per failed attempt (1.0 keeps the delay fixed)
    pub multiplier: f64,
    /// Jitter as a fraction of the delay (0.1 = +/-10%)
    pub jitter_factor: f64,
    /// Consecutive failed attempts before giving up (0 = never)
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            multiplier: 1.0,
            jitter_factor: 0.0,
            max_attempts: 0,
        }
    }
}

impl ReconnectConfig {
    /// Fixed delay, unlimited attempts
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            ..Self::default()
        }
    }

    /// Exponential backoff with +/-10% jitter, unlimited attempts
    pub fn exponential(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier: 2.0,
            jitter_factor: 0.1,
            max_attempts: 0,
        }
    }
}

/// Tracks delays across consecutive failed attempts
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    current_delay: Duration,
    attempt_count: u32,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        let current_delay = config.initial_delay;
        Self {
            config,
            current_delay,
            attempt_count: 0,
        }
    }

    /// Delay before the next attempt, or `None` once attempts are exhausted
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.config.max_attempts > 0 && self.attempt_count >= self.config.max_attempts {
            return None;
        }
        self.attempt_count += 1;

        let delay = self.apply_jitter(self.current_delay);

        let cap = self.config.max_delay.max(self.config.initial_delay);
        let scaled =
            (self.current_delay.as_nanos() as f64 * self.config.multiplier.max(1.0)).round();
        self.current_delay = if scaled.is_finite() && scaled < cap.as_nanos() as f64 {
            Duration::from_nanos(scaled as u64)
        } else {
            cap
        };

        Some(delay)
    }

    /// Forget failed attempts after a successful connection
    pub fn reset(&mut self) {
        self.current_delay = self.config.initial_delay;
        self.attempt_count = 0;
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 || delay.is_zero() {
            return delay;
        }

        let base = delay.as_secs_f64();
        let range = base * self.config.jitter_factor.min(1.0);
        let jitter: f64 = rand::rng().random_range(-range..=range);
        Duration::from_secs_f64((base + jitter).max(0.001))
    }
}
