//! Structured logging setup using the `tracing` crate.
//!
//! Logs always go to stderr so stdout stays reserved for command output.
//! The filter comes from the resolved `log-level` (itself overridable by
//! `VOGUE_LOG`), and accepts full `EnvFilter` directives such as
//! `vogue::sync=debug,info`.

use crate::config::{LogFormat, ResolvedConfig};
use crate::{Error, Result};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Build the filter for a level or directive string.
pub fn build_env_filter(level: &str) -> Result<EnvFilter> {
    let level = level.trim();
    if level.eq_ignore_ascii_case("off") {
        return Ok(EnvFilter::new("off"));
    }
    EnvFilter::try_new(level)
        .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", level, e)))
}

/// Install the global subscriber.
///
/// Fails if the filter is invalid or a subscriber is already installed.
pub fn init_logging(config: &ResolvedConfig) -> Result<()> {
    let filter = build_env_filter(&config.log_level.value)?;
    let base = Registry::default().with(filter);

    let installed = match config.log_format.value {
        LogFormat::Json => base
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Text => base
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    installed.map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_env_filter_accepts_levels_and_directives() {
        assert!(build_env_filter("info").is_ok());
        assert!(build_env_filter("OFF").is_ok());
        assert!(build_env_filter("vogue::sync=debug,warn").is_ok());
    }

    #[test]
    fn test_build_env_filter_rejects_garbage() {
        assert!(matches!(
            build_env_filter("vogue=notalevel"),
            Err(Error::Config(_))
        ));
    }
}
