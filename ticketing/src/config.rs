//! Configuration management for the ticketing application.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use turnstile_runtime::{LifecycleConfig, RetryPolicy};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Ticket lifecycle configuration
    pub tickets: TicketConfig,
    /// Public-facing server configuration
    pub server: ServerConfig,
    /// Demo binary configuration
    pub demo: DemoConfig,
}

/// Ticket lifecycle configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketConfig {
    /// Identifiers tried per issuance before giving up
    pub max_id_attempts: usize,
    /// Extra token attempts before a redemption reports `busy` (0 = fail fast)
    pub redeem_lock_retries: usize,
    /// First backoff delay in milliseconds
    pub redeem_lock_initial_delay_ms: u64,
    /// Backoff cap in milliseconds
    pub redeem_lock_max_delay_ms: u64,
}

/// Public-facing server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Origin prepended to QR verification links
    pub public_base_url: String,
    /// Log filter (trace, debug, info, warn, error, or an `EnvFilter` directive)
    pub log_level: String,
}

/// Demo binary configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Number of simultaneous redemptions fired at one ticket
    pub concurrent_scans: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing or unparsable values fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            tickets: TicketConfig {
                max_id_attempts: parsed(&lookup, "TICKET_ID_MAX_ATTEMPTS", 5),
                redeem_lock_retries: parsed(&lookup, "REDEEM_LOCK_RETRIES", 0),
                redeem_lock_initial_delay_ms: parsed(&lookup, "REDEEM_LOCK_INITIAL_DELAY_MS", 10),
                redeem_lock_max_delay_ms: parsed(&lookup, "REDEEM_LOCK_MAX_DELAY_MS", 200),
            },
            server: ServerConfig {
                public_base_url: lookup("PUBLIC_BASE_URL")
                    .unwrap_or_else(|| "http://localhost:3000".to_string()),
                log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            },
            demo: DemoConfig {
                concurrent_scans: parsed(&lookup, "DEMO_CONCURRENT_SCANS", 16),
            },
        }
    }

    /// Lifecycle tunables derived from this configuration.
    #[must_use]
    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig {
            max_id_attempts: self.tickets.max_id_attempts,
            lock_retry: RetryPolicy::builder()
                .max_retries(self.tickets.redeem_lock_retries)
                .initial_delay(Duration::from_millis(self.tickets.redeem_lock_initial_delay_ms))
                .max_delay(Duration::from_millis(self.tickets.redeem_lock_max_delay_ms))
                .build(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
