use std::sync::atomic::{AtomicU64, Ordering};

use vizpipe_types::log::error;

use crate::errors::ExecutionError;

/// `ErrorManager` records and counts the failed executions of a pipeline.
///
/// Once more errors than the threshold have been recorded, [`check`](Self::check) refuses
/// further updates until the manager is reset.
#[derive(Debug)]
pub struct ErrorManager {
    threshold: Option<u64>,
    count: AtomicU64,
}

impl ErrorManager {
    pub fn new_threshold(threshold: u64) -> Self {
        Self {
            threshold: Some(threshold),
            count: AtomicU64::new(0),
        }
    }

    pub fn new_unlimited() -> Self {
        Self {
            threshold: None,
            count: AtomicU64::new(0),
        }
    }

    pub fn new(threshold: Option<u64>) -> Self {
        match threshold {
            Some(threshold) => Self::new_threshold(threshold),
            None => Self::new_unlimited(),
        }
    }

    pub fn report(&self, error: &ExecutionError) {
        error!("{}", error);
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn check(&self) -> Result<(), ExecutionError> {
        match self.threshold {
            Some(threshold) if self.count() > threshold => {
                Err(ExecutionError::ErrorThresholdReached(threshold))
            }
            _ => Ok(()),
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}
