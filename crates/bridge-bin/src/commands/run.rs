// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use crate::cli::{Cli, RunArgs};
use crate::error::{BinError, BinResult};
use crate::logging;
use crate::runtime::RuntimeBuilder;

/// Loads the configuration, initializes logging from it and runs the bridge
/// until a shutdown signal arrives.
pub async fn run(cli: &Cli, args: RunArgs) -> BinResult<()> {
    let config = bridge_config::load_config(&cli.config)
        .map_err(|e| BinError::from(e).with_context(format!("loading {}", cli.config.display())))?;
    logging::init_from(cli, Some(&config.logging));

    let runtime = RuntimeBuilder::new()
        .config(config)
        .simulate_all(args.simulate)
        .headless(args.headless)
        .build()?;

    runtime.run().await
}
