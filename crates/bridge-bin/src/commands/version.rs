// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use crate::cli::Cli;
use crate::error::BinResult;

/// Prints version and build information.
pub fn version(_cli: &Cli) -> BinResult<()> {
    println!("OPC bridge");
    println!();
    println!("Version Information:");
    println!("  bridge-bin:  {}", crate::VERSION);
    println!("  bridge-core: {}", bridge_core::VERSION);
    println!();
    println!("Build Information:");
    println!("  Target:       {}", std::env::consts::ARCH);
    println!("  OS:           {}", std::env::consts::OS);
    println!();
    println!("Features:");
    println!("  UA client:    {}", feature_state(cfg!(feature = "real-transport")));
    println!("  UA server:    {}", feature_state(cfg!(feature = "ua-server")));
    println!();
    println!("License: PolyForm Noncommercial License 1.0.0");
    println!("Copyright (c) 2025 Sylvex. All rights reserved.");

    Ok(())
}

fn feature_state(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}
