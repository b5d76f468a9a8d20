mod telemetry;
pub use telemetry::{init_telemetry, init_telemetry_closure, try_init_telemetry};

use vizpipe_types::thiserror;

#[derive(thiserror::Error, Debug)]
pub enum TracingError {
    #[error("Invalid log filter {0:?}: {1}")]
    InvalidFilter(String, #[source] tracing_subscriber::filter::ParseError),
    #[error("A global subscriber is already installed: {0}")]
    AlreadyInstalled(#[source] tracing_subscriber::util::TryInitError),
}
