//! Log output for the runner, written to stderr so reports on stdout stay
//! machine-readable.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LogConfig;
use crate::error::{Result, RunnerError};

pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = create_env_filter(&config.level)?;

    if config.json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter);
        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| RunnerError::Config(format!("Failed to initialise logging: {e}")))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter);
        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| RunnerError::Config(format!("Failed to initialise logging: {e}")))?;
    }

    Ok(())
}

pub fn create_env_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| RunnerError::Config(format!("Invalid log level `{directive}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_levels_and_directives() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("apiflow=debug,reqwest=warn").is_ok());
    }

    #[test]
    fn rejects_malformed_directive() {
        let err = create_env_filter("apiflow=loud").unwrap_err();
        assert!(matches!(err, RunnerError::Config(_)));
    }
}
