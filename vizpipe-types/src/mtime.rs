use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A value of the process-wide modification clock. `0` means "never modified".
pub type MTime = u64;

static MODIFIED_TIME: AtomicU64 = AtomicU64::new(0);

/// Returns the next tick of the modification clock. Strictly increasing across threads.
pub fn next_modified_time() -> MTime {
    MODIFIED_TIME.fetch_add(1, Ordering::SeqCst) + 1
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Records when its owner was last modified.
pub struct TimeStamp {
    time: MTime,
}

impl TimeStamp {
    pub fn new() -> Self {
        Self { time: 0 }
    }

    /// A stamp that is already modified.
    pub fn now() -> Self {
        Self {
            time: next_modified_time(),
        }
    }

    pub fn modified(&mut self) {
        self.time = next_modified_time();
    }

    pub fn get(&self) -> MTime {
        self.time
    }

    pub fn is_modified(&self) -> bool {
        self.time != 0
    }

    pub fn reset(&mut self) {
        self.time = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modified_is_monotonic() {
        let mut first = TimeStamp::new();
        assert!(!first.is_modified());
        first.modified();
        let second = TimeStamp::now();
        assert!(second.get() > first.get());
        first.modified();
        assert!(first.get() > second.get());
    }
}
