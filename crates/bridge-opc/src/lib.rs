// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # bridge-opc
//!
//! OPC Classic (DA) and OPC UA clients for the bridge.
//!
//! ```text
//! OpcClientFactory::create(address)
//!        │ ClientKind
//!        ├── Classic ──▶ ClassicClient ─┐
//!        └── Unified ──▶ UnifiedClient ─┴──▶ SessionConnector ──▶ Session
//!                                              ├── SimulatedConnector
//!                                              ├── UaConnector      (real-transport)
//!                                              └── host supplied    (e.g. DA over COM)
//! ```
//!
//! ## Feature Flags
//!
//! - `real-transport`: UA sessions through the `opcua` crate
//! - `ua-server`: [`server::UaServerFrontEnd`], serving the address space
//!
//! ## Example
//!
//! ```rust,ignore
//! use bridge_opc::{ClientSettings, OpcClientFactory, SimulatedConnector, SimulatedServer};
//!
//! let server = SimulatedServer::new();
//! server.insert("Pasteurization.TestSwitch", true);
//!
//! let factory = OpcClientFactory::new(ClientSettings::default());
//! factory.set_source_connector(address.clone(), Arc::new(SimulatedConnector::new(server)));
//! let client = factory.create(&address)?;
//! client.connect().await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod endpoint;
pub mod factory;
pub mod session;
pub mod simulated;

#[cfg(any(feature = "real-transport", feature = "ua-server"))]
pub mod convert;

#[cfg(feature = "real-transport")]
pub mod real;

#[cfg(feature = "ua-server")]
pub mod server;

pub use client::{ClassicClient, ClientSettings, UnifiedClient, DEFAULT_MONITOR_INTERVAL};
pub use endpoint::{ClassicEndpoint, Endpoint, Identity, UnifiedEndpoint};
pub use factory::OpcClientFactory;
pub use session::{
    ChangeSink, RawRead, ServerState, Session, SessionConnector, SubscriptionId,
    UnavailableConnector,
};
pub use simulated::{SimulatedConnector, SimulatedServer};

#[cfg(feature = "real-transport")]
pub use real::UaConnector;

#[cfg(feature = "ua-server")]
pub use server::{UaServerFrontEnd, UaServerSettings};
