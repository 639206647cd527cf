// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Bridge Integration Tests
//!
//! Integration tests for the OPC bridge, plus the shared utilities they use.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: Source addresses, group definitions and configuration text
//!   - `mocks`: Recording adapters and front ends
//!   - `harness`: A supervisor wired to simulated servers
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p bridge-tests
//!
//! # Run a specific suite
//! cargo test -p bridge-tests --test integration_supervisor
//! cargo test -p bridge-tests --test integration_client
//! cargo test -p bridge-tests --test integration_address_space
//! cargo test -p bridge-tests --test integration_config
//! ```
//!
//! ## Test Categories
//!
//! ### Supervisor Tests (`integration_supervisor.rs`)
//! - First connect, loss and recovery of a source
//! - Adapter invocation counts
//! - Shutdown disposal
//!
//! ### Client Tests (`integration_client.rs`)
//! - Read, typed read and write
//! - Snapshot and change monitoring
//! - Error taxonomy at the client boundary
//!
//! ### Address Space Tests (`integration_address_space.rs`)
//! - Groups and variables built from definitions
//! - Value updates, quality and timestamps
//!
//! ### Config Tests (`integration_config.rs`)
//! - Loading from files in every format
//! - Validation rules and environment overrides
//!
//! ## Using the Harness
//!
//! ```rust,ignore
//! use bridge_tests::prelude::*;
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_something() {
//!     let harness = SupervisorHarness::builder()
//!         .source(SourceFixtures::classic())
//!         .build();
//!     harness.start().await;
//!     harness.advance(Duration::from_secs(1)).await;
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::fixtures::*;
    pub use crate::common::harness::*;
    pub use crate::common::mocks::*;
    pub use crate::common::init_test_logging;
}
