use crate::TracingError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};
use vizpipe_types::constants::{DEFAULT_APP_NAME, DEFAULT_LOG_FILTER, LOG_FILTER_ENV};
use vizpipe_types::models::telemetry::{LogFormat, TelemetryConfig};
use vizpipe_types::tracing::{self, info};

fn build_filter(telemetry_config: Option<&TelemetryConfig>) -> Result<EnvFilter, TracingError> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_FILTER_ENV) {
        return Ok(filter);
    }
    let directive = telemetry_config
        .and_then(|c| c.log_filter.clone())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    EnvFilter::try_new(&directive).map_err(|e| TracingError::InvalidFilter(directive, e))
}

// Init telemetry by setting a global handler
pub fn try_init_telemetry(
    app_name: Option<&str>,
    telemetry_config: Option<TelemetryConfig>,
) -> Result<(), TracingError> {
    let app_name = app_name.unwrap_or(DEFAULT_APP_NAME);
    let fmt_filter = build_filter(telemetry_config.as_ref())?;

    let format = telemetry_config
        .as_ref()
        .map(|c| c.format)
        .unwrap_or_default();
    let with_target = telemetry_config.as_ref().is_some_and(|c| c.with_target);
    let fmt_layer = match format {
        LogFormat::Full => fmt::layer().with_target(with_target).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(with_target).boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(TracingError::AlreadyInstalled)?;

    info!("Initialized telemetry for {app_name}");
    Ok(())
}

pub fn init_telemetry(app_name: Option<&str>, telemetry_config: Option<TelemetryConfig>) {
    if let Err(e) = try_init_telemetry(app_name, telemetry_config) {
        eprintln!("Failed to initialize telemetry: {e}");
    }
}

// Init telemetry with a closure without setting a global subscriber
pub fn init_telemetry_closure<T>(
    telemetry_config: Option<TelemetryConfig>,
    closure: impl FnOnce() -> T,
) -> Result<T, TracingError> {
    let fmt_filter = build_filter(telemetry_config.as_ref())?;
    let with_target = telemetry_config.as_ref().is_some_and(|c| c.with_target);

    let subscriber = tracing_subscriber::registry()
        .with(fmt_filter)
        .with(fmt::layer().with_test_writer().with_target(with_target));

    Ok(tracing::subscriber::with_default(subscriber, closure))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_scoped_subscriber() {
        let config = TelemetryConfig {
            log_filter: Some("debug".to_string()),
            ..Default::default()
        };
        let value = init_telemetry_closure(Some(config), || {
            tracing::debug!("inside scoped subscriber");
            42
        })
        .unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_invalid_filter_is_reported() {
        if std::env::var(LOG_FILTER_ENV).is_ok() {
            return;
        }
        let config = TelemetryConfig {
            log_filter: Some("vizpipe=notalevel".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            init_telemetry_closure(Some(config), || ()),
            Err(TracingError::InvalidFilter(_, _))
        ));
    }
}
