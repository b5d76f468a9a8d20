use std::error::Error;

/// Error type returned by algorithm handlers and other user-provided callbacks.
pub type BoxedError = Box<dyn Error + Send + Sync + 'static>;
