use std::path::Path;

use super::telemetry::TelemetryConfig;
use crate::errors::config::ConfigError;
use prettytable::Table as PrettyTable;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
/// The configuration of a pipeline executor
pub struct PipelineConfig {
    /// reuse per-block outputs when executing an algorithm over composite input; Default: true
    #[serde(default = "default_data_caching")]
    pub data_caching: bool,

    /// release every output once its consumers have executed; Default: false
    #[serde(default)]
    pub release_data: bool,

    /// number of failed executions tolerated before updates are refused; Default: unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_threshold: Option<u64>,

    /// break reference cycles when the executive drops a data object; Default: true
    #[serde(default = "default_collect_garbage")]
    pub collect_garbage: bool,

    /// logging setup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<TelemetryConfig>,
}

pub fn default_data_caching() -> bool {
    true
}

pub fn default_collect_garbage() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_caching: default_data_caching(),
            release_data: false,
            error_threshold: None,
            collect_garbage: default_collect_garbage(),
            telemetry: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileSystem(path.to_path_buf(), e))?;
        Self::from_yaml(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(telemetry) = &self.telemetry {
            if matches!(&telemetry.log_filter, Some(filter) if filter.trim().is_empty()) {
                return Err(ConfigError::Invalid(
                    "telemetry.log_filter must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn convert_to_table(&self) -> PrettyTable {
        let mut table = table!();

        table.add_row(row!["data_caching", self.data_caching]);
        table.add_row(row!["release_data", self.release_data]);
        table.add_row(row![
            "error_threshold",
            self.error_threshold
                .map_or("unlimited".to_string(), |t| t.to_string())
        ]);
        table.add_row(row!["collect_garbage", self.collect_garbage]);
        if let Some(filter) = self
            .telemetry
            .as_ref()
            .and_then(|t| t.log_filter.as_ref())
        {
            table.add_row(row!["log_filter", filter]);
        }

        table
    }
}
