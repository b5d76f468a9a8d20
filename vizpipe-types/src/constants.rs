/// Environment variable holding the log filter directive.
pub const LOG_FILTER_ENV: &str = "RUST_LOG";

/// Default log filter used when neither the environment nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default application name used by telemetry.
pub const DEFAULT_APP_NAME: &str = "vizpipe";
