// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `tree` command.

use bridge_core::AddressSpace;

use crate::cli::{Cli, OutputFormat, TreeArgs};
use crate::error::{BinError, BinResult};

/// Prints the address space the configuration builds.
pub fn tree(cli: &Cli, args: TreeArgs) -> BinResult<()> {
    let config = bridge_config::load_config(&cli.config)?;
    let space = AddressSpace::build(&config.groups)?;
    println!("{}", render(&space, args.format)?);
    Ok(())
}

/// Renders the tree in the requested format.
pub fn render(space: &AddressSpace, format: OutputFormat) -> BinResult<String> {
    match format {
        OutputFormat::Text => {
            let mut out = String::from("Objects");
            for group in space.groups() {
                out.push_str(&format!("\n└── {}", group.node_id()));
                if !group.description().is_empty() {
                    out.push_str(&format!("  ({})", group.description()));
                }
                for variable in group.variables() {
                    out.push_str(&format!("\n    ├── {}", variable.node_id()));
                    if !variable.description().is_empty() {
                        out.push_str(&format!("  ({})", variable.description()));
                    }
                }
            }
            Ok(out)
        }
        OutputFormat::Json => {
            let groups: Vec<_> = space
                .groups()
                .iter()
                .map(|group| {
                    serde_json::json!({
                        "node_id": group.node_id().as_str(),
                        "description": group.description(),
                        "variables": group
                            .variables()
                            .iter()
                            .map(|v| serde_json::json!({
                                "node_id": v.node_id().as_str(),
                                "name": v.name(),
                                "description": v.description(),
                                "access_level": v.access_level(),
                                "historizing": v.historizing(),
                            }))
                            .collect::<Vec<_>>(),
                    })
                })
                .collect();
            serde_json::to_string_pretty(&groups).map_err(BinError::output)
        }
    }
}
