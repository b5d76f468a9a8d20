use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Filter directive, e.g. `vizpipe_core=debug`. `RUST_LOG` takes precedence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,

    #[serde(default)]
    pub format: LogFormat,

    /// Print the event target (module path) with each line.
    #[serde(default)]
    pub with_target: bool,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}
