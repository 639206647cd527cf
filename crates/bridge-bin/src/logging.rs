// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Logging and tracing initialization.
//!
//! The filter comes from `RUST_LOG` when set, else from the command line,
//! else from the configured `logging.level`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, LogFormat};
use bridge_config::LoggingConfig;

/// Filter directives applied under the main level.
const QUIET_DEPENDENCIES: &[&str] = &["opcua=warn", "tokio=info"];

// =============================================================================
// Logging Initialization
// =============================================================================

/// Initializes the global subscriber.
///
/// Calling it again is a no-op, so tests and embedders may call it freely.
pub fn init_logging(level: &str, format: LogFormat) {
    let filter = build_filter(level);

    let result = match format {
        LogFormat::Text => {
            let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stdout());
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true).with_ansi(is_terminal))
                .try_init()
        }
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init(),
        LogFormat::Compact => {
            let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stdout());
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_target(false).with_ansi(is_terminal))
                .try_init()
        }
    };

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}

/// Initializes logging from the command line and the loaded configuration.
pub fn init_from(cli: &Cli, logging: Option<&LoggingConfig>) {
    let (level, format) = resolve(cli, logging);
    init_logging(&level, format);
}

/// Resolves the level and format, command line first.
pub fn resolve(cli: &Cli, logging: Option<&LoggingConfig>) -> (String, LogFormat) {
    let level = cli
        .cli_log_level()
        .map(str::to_string)
        .or_else(|| logging.map(|l| l.level.as_str().to_string()))
        .unwrap_or_else(|| "info".to_string());
    let format = cli
        .log_format
        .or_else(|| logging.map(|l| l.format.into()))
        .unwrap_or_default();
    (level, format)
}

fn build_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let mut filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    for directive in QUIET_DEPENDENCIES {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_config::{LogFormat as ConfigFormat, LogLevel};
    use clap::Parser;

    #[test]
    fn test_resolve_prefers_cli() {
        let config = LoggingConfig {
            level: LogLevel::Warn,
            format: ConfigFormat::Json,
        };

        let cli = Cli::parse_from(["opc-bridge"]);
        assert_eq!(resolve(&cli, Some(&config)), ("warn".to_string(), LogFormat::Json));

        let cli = Cli::parse_from(["opc-bridge", "-l", "trace", "--log-format", "compact"]);
        assert_eq!(resolve(&cli, Some(&config)), ("trace".to_string(), LogFormat::Compact));
    }

    #[test]
    fn test_resolve_without_config() {
        let cli = Cli::parse_from(["opc-bridge"]);
        assert_eq!(resolve(&cli, None), ("info".to_string(), LogFormat::Text));
    }
}
