//! Worker loop configuration.

use serde::{Deserialize, Serialize};

const fn default_batch_size() -> usize {
    100
}

const fn default_flush_interval_secs() -> u64 {
    5
}

const fn default_sleep_ms() -> u64 {
    500
}

const fn default_memory_limit_mb() -> u64 {
    128
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Flush once the batch holds this many events.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Flush once this many seconds passed since the last flush.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,

    /// Idle sleep after an empty pop, in milliseconds.
    #[serde(default = "default_sleep_ms")]
    pub sleep_ms: u64,

    /// Advisory ceiling for the in-memory batch, in megabytes. Exceeding it
    /// only logs a warning. `0` disables the check.
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            flush_interval_secs: default_flush_interval_secs(),
            sleep_ms: default_sleep_ms(),
            memory_limit_mb: default_memory_limit_mb(),
        }
    }
}
