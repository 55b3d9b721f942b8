use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_EXPONENT: u32 = 30;

fn default_factor() -> f64 {
    2.0
}

/// Delay schedule between failed connect (or fetch) attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconnectPolicy {
    /// Same delay after every failure.
    Fixed {
        delay_ms: u64,
        #[serde(default)]
        max_attempts: Option<u32>,
    },
    /// Capped exponential backoff; `jitter` is the share of each delay (0..=1)
    /// that may be randomly shaved off.
    Backoff {
        base_ms: u64,
        max_ms: u64,
        #[serde(default = "default_factor")]
        factor: f64,
        #[serde(default)]
        jitter: f64,
        #[serde(default)]
        max_attempts: Option<u32>,
    },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Fixed {
            delay_ms: 3000,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration) -> Self {
        ReconnectPolicy::Fixed {
            delay_ms: delay.as_millis() as u64,
            max_attempts: None,
        }
    }

    pub fn max_attempts(&self) -> Option<u32> {
        match self {
            ReconnectPolicy::Fixed { max_attempts, .. }
            | ReconnectPolicy::Backoff { max_attempts, .. } => *max_attempts,
        }
    }

    /// Whether another attempt is allowed after `failures` consecutive failures.
    pub fn should_retry(&self, failures: u32) -> bool {
        self.max_attempts().map_or(true, |max| failures < max)
    }

    /// Wait before the next attempt, given `failures` consecutive failures (1-based).
    pub fn delay<R: Rng>(&self, failures: u32, rng: &mut R) -> Duration {
        match self {
            ReconnectPolicy::Fixed { delay_ms, .. } => Duration::from_millis(*delay_ms),
            ReconnectPolicy::Backoff {
                base_ms,
                max_ms,
                factor,
                jitter,
                ..
            } => {
                let exponent = failures.saturating_sub(1).min(MAX_EXPONENT) as i32;
                let raw = (*base_ms as f64 * factor.max(1.0).powi(exponent)).min(*max_ms as f64);
                let jitter = jitter.clamp(0.0, 1.0);
                let shaved = if jitter > 0.0 {
                    raw * jitter * rng.gen::<f64>()
                } else {
                    0.0
                };
                Duration::from_millis((raw - shaved).max(0.0).round() as u64)
            }
        }
    }
}
