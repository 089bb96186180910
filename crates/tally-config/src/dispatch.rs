//! Dispatcher configuration.

use serde::{Deserialize, Serialize};
use tally_core::DispatchMode;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DispatchConfig {
    /// `direct` inserts each event synchronously; `queued` buffers through
    /// the durable queue.
    #[serde(default)]
    pub mode: DispatchMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_queued() {
        assert_eq!(DispatchConfig::default().mode, DispatchMode::Queued);
    }
}
