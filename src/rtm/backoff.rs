use std::time::Duration;

use super::constants::{BACKOFF_BASE_MS, MAX_RECONNECT_ATTEMPTS};

/// Exponential backoff for gateway reconnects. Delays double per attempt
/// and cap at eight times the base.
pub(crate) struct Backoff {
    attempt: u32,
}

impl Backoff {
    pub(crate) fn new() -> Self {
        Self { attempt: 0 }
    }

    /// Delay to sleep before the next attempt.
    pub(crate) fn next(&mut self) -> Duration {
        self.attempt += 1;
        Duration::from_millis(BACKOFF_BASE_MS * 2u64.pow((self.attempt - 1).min(3)))
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.attempt >= MAX_RECONNECT_ATTEMPTS
    }

    /// A session that reached `hello` counts as healthy again.
    pub(crate) fn reset(&mut self) {
        self.attempt = 0;
    }
}
