//! Configuration management for the booking engine.
//!
//! Loads configuration from environment variables with sensible defaults.

use booking_engine_runtime::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Delay before a new request automatically moves to pending, in milliseconds
    pub auto_pending_delay_ms: u64,
    /// Upper bound for a single collaborator call, in milliseconds
    pub collaborator_timeout_ms: u64,
    /// Attempts per collaborator call, including the first
    pub retry_max_attempts: u32,
    /// Backoff before the first retry, in milliseconds
    pub retry_initial_delay_ms: u64,
    /// Backoff cap, in milliseconds
    pub retry_max_delay_ms: u64,
    /// Legal terms version customers must accept
    pub terms_version: String,
    /// Days before and after the preferred date searched for alternatives
    pub alternative_search_days: u32,
    /// Maximum alternative slots offered to the losing booking
    pub max_alternatives: usize,
    /// Session length assumed when none was requested
    pub default_duration_minutes: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_pending_delay_ms: 2000,
            collaborator_timeout_ms: 5000,
            retry_max_attempts: 4,
            retry_initial_delay_ms: 100,
            retry_max_delay_ms: 5000,
            terms_version: "2024-01".to_string(),
            alternative_search_days: 7,
            max_alternatives: 5,
            default_duration_minutes: 60,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Missing variables use the default; unparsable ones are logged and
    /// also fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            auto_pending_delay_ms: parse_or(
                "BOOKING_AUTO_PENDING_DELAY_MS",
                defaults.auto_pending_delay_ms,
            ),
            collaborator_timeout_ms: parse_or(
                "BOOKING_COLLABORATOR_TIMEOUT_MS",
                defaults.collaborator_timeout_ms,
            ),
            retry_max_attempts: parse_or("BOOKING_RETRY_MAX_ATTEMPTS", defaults.retry_max_attempts),
            retry_initial_delay_ms: parse_or(
                "BOOKING_RETRY_INITIAL_DELAY_MS",
                defaults.retry_initial_delay_ms,
            ),
            retry_max_delay_ms: parse_or("BOOKING_RETRY_MAX_DELAY_MS", defaults.retry_max_delay_ms),
            terms_version: env::var("BOOKING_TERMS_VERSION")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.terms_version),
            alternative_search_days: parse_or(
                "BOOKING_ALTERNATIVE_SEARCH_DAYS",
                defaults.alternative_search_days,
            ),
            max_alternatives: parse_or("BOOKING_MAX_ALTERNATIVES", defaults.max_alternatives),
            default_duration_minutes: parse_or(
                "BOOKING_DEFAULT_DURATION_MINUTES",
                defaults.default_duration_minutes,
            ),
        }
    }

    /// Delay before the automatic requested → pending move.
    #[must_use]
    pub const fn auto_pending_delay(&self) -> Duration {
        Duration::from_millis(self.auto_pending_delay_ms)
    }

    /// Upper bound for a single collaborator call.
    #[must_use]
    pub const fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }

    /// Retry policy applied to every collaborator call.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_attempts(self.retry_max_attempts)
            .initial_delay(Duration::from_millis(self.retry_initial_delay_ms))
            .max_delay(Duration::from_millis(self.retry_max_delay_ms))
            .attempt_timeout(self.collaborator_timeout())
            .build()
    }
}

fn parse_or<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, default = %default, "Invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}
