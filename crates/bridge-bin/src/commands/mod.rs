// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `run`: Start the bridge
//! - `validate`: Validate the configuration file
//! - `tree`: Print the address space
//! - `version`: Show version information

mod run;
mod tree;
mod validate;
mod version;

pub use run::run;
pub use tree::tree;
pub use validate::validate;
pub use version::version;

use crate::cli::{Cli, Commands};
use crate::error::BinResult;
use crate::logging;

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match cli.effective_command() {
        Commands::Run(args) => run::run(&cli, args).await,
        Commands::Validate(args) => {
            logging::init_from(&cli, None);
            validate::validate(&cli, args)
        }
        Commands::Tree(args) => {
            logging::init_from(&cli, None);
            tree::tree(&cli, args)
        }
        Commands::Version => version::version(&cli),
    }
}
