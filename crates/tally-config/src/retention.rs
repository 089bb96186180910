//! Data retention configuration.

use serde::{Deserialize, Serialize};

/// Longest accepted retention window, about one hundred years.
pub const MAX_PRUNE_DAYS: u32 = 36_500;

const fn default_prune_days() -> u32 {
    90
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    /// Records older than this many days are removed by `tally prune`
    /// unless `--days` overrides it.
    #[serde(default = "default_prune_days")]
    pub prune_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            prune_days: default_prune_days(),
        }
    }
}

impl RetentionConfig {
    /// An explicit override always wins over the configured default.
    pub fn resolve(&self, days_override: Option<u32>) -> u32 {
        days_override.unwrap_or(self.prune_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_takes_precedence() {
        let config = RetentionConfig { prune_days: 30 };
        assert_eq!(config.resolve(None), 30);
        assert_eq!(config.resolve(Some(10)), 10);
        assert_eq!(RetentionConfig::default().resolve(None), 90);
    }
}
