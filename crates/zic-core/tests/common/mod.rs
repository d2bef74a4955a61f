#![allow(dead_code)]

pub mod fake;
pub mod range_server;

use std::time::Duration;

use zic_core::config::ZicConfig;
use zic_core::retry::RetryPolicy;

/// Defaults with retry pauses removed.
pub fn fast_config() -> ZicConfig {
    ZicConfig {
        min_retry_delay_secs: 0,
        max_retry_delay_secs: 0,
        ..ZicConfig::default()
    }
}

pub fn no_pause() -> RetryPolicy {
    RetryPolicy {
        min_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
        max_attempts: None,
    }
}
