//! Tracing subscriber setup

use crate::config::{LogFormat, LoggingConfig};
use survey_core::{SurveyError, SurveyResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured filter. Returns `Ok(false)` when a
/// subscriber was already installed, so repeated calls are harmless.
pub fn init_tracing(config: &LoggingConfig) -> SurveyResult<bool> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| SurveyError::Config(format!("logging.filter: {e}")))?;

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
    };
    Ok(installed.is_ok())
}
