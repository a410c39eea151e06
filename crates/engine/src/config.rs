// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine and recovery configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded retry on optimistic-concurrency conflicts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts per mutation, including the first
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `n * backoff` before retrying
    #[serde(with = "humantime_serde")]
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(10),
        }
    }
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after failed attempt `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub retry: RetryPolicy,
}

/// Stuck-claim recovery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Time between passes when run periodically
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Active consumers held longer than this are reclaimed
    #[serde(with = "humantime_serde")]
    pub max_hold: Option<Duration>,
    /// Re-sweep every unit with blocked consumers on each pass
    pub sweep_blocked: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_hold: None,
            sweep_blocked: true,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
