// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # bridge-bin
//!
//! Executable for the OPC bridge.
//!
//! This crate wires the library crates into a running process:
//!
//! - CLI argument parsing with clap
//! - Runtime orchestration (address space, front end, supervisor)
//! - Registered adapters
//! - Graceful shutdown handling
//! - Logging initialization
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         main.rs                              │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//!                    ┌──────▼──────┐
//!                    │    cli.rs   │
//!                    └──────┬──────┘
//!                           │
//!               ┌───────────┼───────────┐
//!               ▼           ▼           ▼
//!        ┌──────────┐ ┌──────────┐ ┌──────────┐
//!        │ commands │ │ runtime  │ │ logging  │
//!        └──────────┘ └────┬─────┘ └──────────┘
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!     ┌──────────┐   ┌───────────┐  ┌──────────┐
//!     │ adapters │   │ front_end │  │ shutdown │
//!     └──────────┘   └───────────┘  └──────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the bridge (default command)
//! opc-bridge
//!
//! # Start with a custom config, every source simulated
//! opc-bridge -c /etc/opc-bridge/bridge.yaml run --simulate
//!
//! # Validate configuration
//! opc-bridge validate --show-config
//!
//! # Print the address space
//! opc-bridge tree --format json
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod error;
pub mod front_end;
pub mod logging;
pub mod runtime;
pub mod shutdown;

// =============================================================================
// Re-exports
// =============================================================================

pub use adapters::PasteurizationAdapter;
pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use front_end::TracingFrontEnd;
pub use logging::init_logging;
pub use runtime::{BridgeRuntime, RuntimeBuilder, RuntimeOptions};
pub use shutdown::ShutdownCoordinator;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
