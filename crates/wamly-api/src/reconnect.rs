//! Capped exponential backoff for speaker reconnection.
//!
//! The delay before attempt `k` (zero-based) is `min(initial · 2^k, max)`.
//! There is no jitter: speakers sit on a LAN and a deterministic sequence
//! is easier to reason about when a link flaps.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for speaker reconnection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: Some(10),
        }
    }
}

impl ReconnectConfig {
    /// Delay before the given zero-based attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

// ── Backoff ──────────────────────────────────────────────────────────

/// Stateful iterator over [`ReconnectConfig`] delays.
///
/// A link keeps one of these across failures and calls
/// [`reset`](Self::reset) whenever it reaches `Connected` again.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: ReconnectConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Delay to wait before the next attempt, or `None` once
    /// `max_retries` attempts have been handed out.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.config.max_retries {
            if self.attempt >= max {
                return None;
            }
        }
        let delay = self.config.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        Some(delay)
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn config(&self) -> &ReconnectConfig {
        &self.config
    }
}
