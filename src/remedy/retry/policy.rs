// SPDX-License-Identifier: MIT

//! Retry and backoff policy

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::runtime::error::ConfigError;

/// Growth of the delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    #[default]
    Fixed,
    Linear,
    Exponential,
}

/// Observable result of one action attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure,
    Timeout,
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub id: String,
    #[serde(default)]
    pub max_retries: u32,
    pub retry_interval_seconds: u64,
    #[serde(default)]
    pub backoff_strategy: BackoffStrategy,
    pub timeout_seconds: u64,
}

impl RetryPolicy {
    pub fn new(id: impl Into<String>, max_retries: u32, retry_interval_seconds: u64) -> Self {
        Self {
            id: id.into(),
            max_retries,
            retry_interval_seconds,
            backoff_strategy: BackoffStrategy::Fixed,
            timeout_seconds: 30,
        }
    }

    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff_strategy = strategy;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    ///
    /// Saturates instead of overflowing for large attempt numbers.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let n = attempt.max(1);
        let secs = match self.backoff_strategy {
            BackoffStrategy::Fixed => self.retry_interval_seconds,
            BackoffStrategy::Linear => self.retry_interval_seconds.saturating_mul(n as u64),
            BackoffStrategy::Exponential => {
                let factor = 2u64.checked_pow(n - 1).unwrap_or(u64::MAX);
                self.retry_interval_seconds.saturating_mul(factor)
            }
        };
        Duration::from_secs(secs)
    }

    /// Whether another attempt follows attempt number `attempt`
    pub fn should_retry(&self, attempt: u32, outcome: AttemptOutcome) -> bool {
        !outcome.is_success() && attempt <= self.max_retries
    }

    /// Bound on a single attempt
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidRetryPolicy {
            id: self.id.clone(),
            reason: reason.to_string(),
        };
        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if self.retry_interval_seconds == 0 {
            return Err(invalid("retry_interval_seconds must be greater than 0"));
        }
        if self.timeout_seconds == 0 {
            return Err(invalid("timeout_seconds must be greater than 0"));
        }
        Ok(())
    }
}
