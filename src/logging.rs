//! Diagnostic logging setup.
//!
//! Logs go to stderr so the probe report on stdout stays readable.
//! `RUST_LOG` takes priority over the configured level.

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// error, warn, info, debug or trace
    pub level: String,
    /// pretty, compact or json
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "warn".to_string(), format: "compact".to_string() }
    }
}

pub fn init_logging(config: &LogConfig) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(parse_level(&config.level).as_str())
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let _ = match config.format.as_str() {
        "json" => tracing::subscriber::set_global_default(registry.with(layer.json())),
        "pretty" => tracing::subscriber::set_global_default(registry.with(layer.pretty())),
        _ => tracing::subscriber::set_global_default(registry.with(layer.compact())),
    };
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::WARN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("error"), Level::ERROR);
        assert_eq!(parse_level("INFO"), Level::INFO);
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("verbose"), Level::WARN);
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, "compact");
    }
}
