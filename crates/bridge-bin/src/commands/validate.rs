// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use std::sync::Arc;

use bridge_config::BridgeConfig;
use bridge_core::AddressSpace;

use crate::adapters;
use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Loads and validates the configuration, then prints a summary.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config_path = &cli.config;
    let config = bridge_config::load_config(config_path)
        .map_err(|e| BinError::from(e).with_context("Configuration validation failed"))?;
    let warnings = collect_warnings(&config)?;

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", config_path.display());
            println!();
            println!("Summary:");
            println!("  Sources:   {}", config.sources.len());
            for source in &config.sources {
                println!(
                    "    - {}{}",
                    source.url,
                    if source.simulated { " (simulated)" } else { "" }
                );
            }
            println!("  Groups:    {}", config.groups.len());
            println!("  Variables: {}", config.variable_count());
            println!(
                "  Server:    {}",
                if config.server.enabled {
                    format!("{}:{}", config.server.host, config.server.port)
                } else {
                    "disabled".to_string()
                }
            );
            println!("  Interval:  {}ms", config.supervisor.interval_ms);

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!("{}", to_pretty_json(&config)?);
            }
        }
        OutputFormat::Json => {
            let parsed = args.show_config.then_some(&config);
            let output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": {
                    "sources": config.sources.len(),
                    "groups": config.groups.len(),
                    "variables": config.variable_count(),
                    "server_enabled": config.server.enabled,
                    "interval_ms": config.supervisor.interval_ms,
                },
                "warnings": warnings,
                "config": parsed,
            });
            println!("{}", to_pretty_json(&output)?);
        }
    }

    Ok(())
}

/// Lists configuration that is valid but probably not intended.
pub fn collect_warnings(config: &BridgeConfig) -> BinResult<Vec<String>> {
    let mut warnings = Vec::new();

    if config.sources.is_empty() {
        warnings.push("No sources configured".to_string());
    }
    if config.groups.is_empty() {
        warnings.push("No variable groups configured".to_string());
    }
    if config.server.enabled && !cfg!(feature = "ua-server") {
        warnings.push("UA server enabled but not compiled in; the bridge will run headless".to_string());
    }

    let space = Arc::new(AddressSpace::build(&config.groups)?);
    let dispatcher = adapters::build_dispatcher(&space);
    for address in config.resolve_sources()? {
        if dispatcher.adapters_for(&address).next().is_none() {
            warnings.push(format!("No adapter reads from source '{}'", address));
        }
    }

    Ok(warnings)
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> BinResult<String> {
    serde_json::to_string_pretty(value).map_err(BinError::output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_config::SourceConfig;
    use bridge_core::GroupDefinition;

    #[test]
    fn test_empty_config_warnings() {
        let warnings = collect_warnings(&BridgeConfig::default()).unwrap();
        assert!(warnings.iter().any(|w| w.contains("No sources")));
        assert!(warnings.iter().any(|w| w.contains("No variable groups")));
    }

    #[test]
    fn test_unadapted_source_warns() {
        let config = BridgeConfig {
            sources: vec![
                SourceConfig::new(adapters::pasteurization::SOURCE_URL),
                SourceConfig::new("opc.tcp://plc:4840"),
            ],
            groups: vec![GroupDefinition::new("Pasteurization", "").with_variable("Switch", "")],
            ..Default::default()
        };

        let warnings = collect_warnings(&config).unwrap();
        assert!(warnings.iter().any(|w| w.contains("opc.tcp://plc:4840")));
        assert!(!warnings.iter().any(|w| w.contains("Matrikon")));
    }
}
