use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use vizpipe_types::log::trace;
use vizpipe_types::node::NodeHandle;
use vizpipe_types::thiserror::Error;

use crate::data_object::DataObjectFactory;

#[derive(Debug, Clone, Default)]
/// Cooperative abort flag shared between the caller and a running update.
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Execution was aborted")]
/// Returned by [`ExecutionContext::check_abort`]. Algorithms propagate it with `?`.
pub struct Aborted;

#[derive(Debug, Clone, Copy)]
/// What an algorithm sees of the executive while one of its requests runs.
pub struct ExecutionContext<'a> {
    factory: &'a DataObjectFactory,
    token: &'a CancellationToken,
    node: &'a NodeHandle,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        factory: &'a DataObjectFactory,
        token: &'a CancellationToken,
        node: &'a NodeHandle,
    ) -> Self {
        Self {
            factory,
            token,
            node,
        }
    }

    /// Fails once the caller requested an abort. Long-running algorithms call this
    /// periodically.
    pub fn check_abort(&self) -> Result<(), Aborted> {
        if self.token.is_cancelled() {
            Err(Aborted)
        } else {
            Ok(())
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn factory(&self) -> &'a DataObjectFactory {
        self.factory
    }

    pub fn node(&self) -> &'a NodeHandle {
        self.node
    }

    /// Reports the fraction of the current request that is done.
    pub fn update_progress(&self, progress: f64) {
        trace!("{}: {:.0}%", self.node, progress.clamp(0.0, 1.0) * 100.0);
    }
}
