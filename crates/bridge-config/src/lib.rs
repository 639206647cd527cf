// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # bridge-config
//!
//! Configuration management for the OPC bridge.
//!
//! ## Features
//!
//! - **Schema Definition**: sources, variable groups, supervisor timings,
//!   client settings, front-end server and logging
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Environment Placeholders**: `${VAR}` and `${VAR:default}` in the raw document
//! - **Environment Overrides**: `BRIDGE_*` variables applied after parsing
//!
//! ## Quick Start
//!
//! ```no_run
//! use bridge_config::load_config;
//!
//! let config = load_config("bridge.yaml").unwrap();
//! for address in config.resolve_sources().unwrap() {
//!     println!("{} ({})", address, address.kind());
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    default_config_path, load_config, load_config_str, ConfigFormat, ConfigLoader,
    ConfigLoaderBuilder, DEFAULT_CONFIG_FILE, DEFAULT_ENV_PREFIX,
};
pub use schema::{
    BridgeConfig, ClientSection, LogFormat, LogLevel, LoggingConfig, ServerConfig, SourceConfig,
    SupervisorSection,
};
