// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # bridge-core
//!
//! Core of the OPC Classic / OPC UA bridge.
//!
//! This crate is protocol agnostic. It provides:
//!
//! - **Client**: the [`Client`] trait every protocol family implements
//! - **Registry**: [`ClientRegistry`], at most one live client per source
//! - **Supervisor**: Ping/Patrol health supervision per source
//! - **Dispatcher**: ordered [`Adapter`] invocation on reconnect
//! - **Address Space**: groups and variables exposed by the bridge server
//! - **Error**: the unified error hierarchy
//!
//! ## Example
//!
//! ```rust,ignore
//! use bridge_core::{AddressSpace, GroupDefinition};
//!
//! let space = AddressSpace::build(&[
//!     GroupDefinition::new("Pasteurization", "").with_variable("Switch", "Pump switch"),
//! ])?;
//! space.set_value("Pasteurization.Switch", true)?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod error;
pub mod types;
pub mod value;

// =============================================================================
// Client & Supervision Modules
// =============================================================================

pub mod client;
pub mod dispatcher;
pub mod registry;
pub mod scheduler;
pub mod supervisor;

// =============================================================================
// Server Modules
// =============================================================================

pub mod address_space;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use error::*;
pub use types::*;
pub use value::{FromValue, Value};

pub use client::{
    dedup_tags, monitor_callback, BoxFuture, Client, ClientEvent, ClientExt, ClientFactory,
    ClientStats, ClientStatsSnapshot, MonitorBatch, MonitorCallback, MonitorHandle, MonitorId,
    MonitorMode, Teardown,
};

pub use registry::{dispose_with_grace, AddressGuard, ClientRegistry, DEFAULT_DISPOSE_TIMEOUT};

pub use scheduler::{RecurringTask, TaskKey, TaskKind, TaskScheduler};

pub use dispatcher::{AdaptationDispatcher, Adapter, DispatchReport};

pub use supervisor::{
    HealthState, PatrolOutcome, PingOutcome, SourceHealth, Supervisor, SupervisorConfig,
};

pub use address_space::{
    AccessLevel, AddressSpace, FrontEnd, GroupDefinition, NodeId, NodeRef, Variable,
    VariableChange, VariableDefinition, VariableGroup, VariableSnapshot,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
