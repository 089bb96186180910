//! # tally-config
//!
//! Layered configuration loading for Tally using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`TALLY_*` prefix, `__` as separator)
//! 2. An explicit file passed with `--config`
//! 3. Project-level `.tally/config.toml`
//! 4. User-level `~/.config/tally/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `TALLY_WORKER__BATCH_SIZE` -> `worker.batch_size`,
//! `TALLY_DISPATCH__MODE` -> `dispatch.mode`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use tally_config::TallyConfig;
//!
//! let config = TallyConfig::load_with_dotenv(None).expect("config");
//! println!("batch size: {}", config.worker.batch_size);
//! ```

mod dispatch;
mod error;
mod queue;
mod retention;
mod storage;
mod worker;

pub use dispatch::DispatchConfig;
pub use error::ConfigError;
pub use queue::{DEFAULT_CONNECTION, QueueConfig};
pub use retention::{MAX_PRUNE_DAYS, RetentionConfig};
pub use storage::StorageConfig;
pub use worker::WorkerConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TallyConfig {
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl TallyConfig {
    /// Load configuration from all sources and validate it.
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or a value is out of range.
    pub fn load(extra_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(extra_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.env` from the current directory, then [`Self::load`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or a value is out of range.
    pub fn load_with_dotenv(extra_file: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load(extra_file)
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or layer more
    /// providers on top.
    pub fn figment(extra_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        let local_path = PathBuf::from(".tally/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        if let Some(path) = extra_file {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed("TALLY_").split("__"))
    }

    /// Reject values the worker cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "worker.batch_size".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.worker.flush_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "worker.flush_interval_secs".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        if self.retention.prune_days == 0 || self.retention.prune_days > MAX_PRUNE_DAYS {
            return Err(ConfigError::InvalidValue {
                field: "retention.prune_days".into(),
                reason: format!("must be between 1 and {MAX_PRUNE_DAYS}"),
            });
        }
        if self.queue.key.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "queue.key".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tally").join("config.toml"))
    }
}
