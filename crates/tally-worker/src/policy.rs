//! When a buffered batch must be written out.

use std::time::Duration;

/// Which threshold fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Size,
    Interval,
}

/// Size-or-interval flush rule.
///
/// An empty batch never triggers a flush, whatever the elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    pub batch_size: usize,
    pub interval: Duration,
}

impl FlushPolicy {
    #[must_use]
    pub const fn new(batch_size: usize, interval: Duration) -> Self {
        Self {
            batch_size,
            interval,
        }
    }

    /// The threshold a batch of `batch_len` events has crossed, if any.
    #[must_use]
    pub fn trigger(&self, batch_len: usize, since_last_flush: Duration) -> Option<FlushTrigger> {
        if batch_len == 0 {
            None
        } else if batch_len >= self.batch_size {
            Some(FlushTrigger::Size)
        } else if since_last_flush >= self.interval {
            Some(FlushTrigger::Interval)
        } else {
            None
        }
    }

    #[must_use]
    pub fn should_flush(&self, batch_len: usize, since_last_flush: Duration) -> bool {
        self.trigger(batch_len, since_last_flush).is_some()
    }
}
