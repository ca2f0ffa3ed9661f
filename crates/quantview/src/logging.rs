//! Logging setup for binaries embedding the crate.
//!
//! Library code logs through the `log` facade and opens `tracing` spans
//! around polling. `init_logging` installs one `tracing-subscriber` registry
//! and bridges `log` records into it with `LogTracer`, so span context shows
//! up on every line.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::{QuantviewError, Result};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "jsonl" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber, writing to stderr. Fails if a
/// subscriber or logger is already installed.
pub fn init_logging(format: LogFormat) -> Result<()> {
    let layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_span_list(true)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .compact()
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(layer.with_filter(env_filter()));
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| QuantviewError::Logging(e.to_string()))?;
    tracing_log::LogTracer::init().map_err(|e| QuantviewError::Logging(e.to_string()))?;

    tracing::debug!("Logging initialized ({:?})", format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSONL "), LogFormat::Json);
        assert_eq!(LogFormat::parse("text"), LogFormat::Text);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Text);
    }

    #[test]
    fn test_second_init_fails() {
        // Only this test installs a global subscriber in the test binary.
        assert!(init_logging(LogFormat::Text).is_ok());
        assert!(matches!(
            init_logging(LogFormat::Json),
            Err(QuantviewError::Logging(_))
        ));
    }
}
