//! Store database and rescue directory locations.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_database_path() -> String {
    ".tally/audit.db".to_string()
}

fn default_rescue_dir() -> String {
    ".tally/rescue".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// libSQL database file for the `audits` table (`:memory:` for tests).
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory holding `audit_rescue_*.json` files.
    #[serde(default = "default_rescue_dir")]
    pub rescue_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            rescue_dir: default_rescue_dir(),
        }
    }
}

impl StorageConfig {
    pub fn rescue_dir(&self) -> PathBuf {
        PathBuf::from(&self.rescue_dir)
    }
}
