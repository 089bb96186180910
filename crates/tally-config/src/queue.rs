//! Durable queue configuration.

use serde::{Deserialize, Serialize};

/// Connection name meaning "the store database".
pub const DEFAULT_CONNECTION: &str = "default";

fn default_connection() -> String {
    DEFAULT_CONNECTION.to_string()
}

fn default_key() -> String {
    "audit_pkg:buffer".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// `"default"` for the store database, otherwise a path to a separate
    /// libSQL database file holding the queue table.
    #[serde(default = "default_connection")]
    pub connection: String,

    /// Logical queue name. Several queues can share one table.
    #[serde(default = "default_key")]
    pub key: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            connection: default_connection(),
            key: default_key(),
        }
    }
}

impl QueueConfig {
    /// Whether the queue lives in the store database.
    pub fn uses_store_connection(&self) -> bool {
        self.connection.is_empty() || self.connection == DEFAULT_CONNECTION
    }
}
