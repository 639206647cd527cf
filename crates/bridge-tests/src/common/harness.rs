// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! A [`Supervisor`] wired to one [`SimulatedServer`] per source, using the
//! production client factory. Tests run with a paused clock and move time
//! forward with [`SupervisorHarness::advance`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bridge_core::{
    AdaptationDispatcher, Adapter, ClientRegistry, HealthState, SourceAddress, Supervisor,
    SupervisorConfig, TaskKind,
};
use bridge_opc::{ClientSettings, OpcClientFactory, SimulatedConnector, SimulatedServer};

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`SupervisorHarness`].
#[derive(Default)]
pub struct SupervisorHarnessBuilder {
    config: SupervisorConfig,
    sources: Vec<SourceAddress>,
    adapters: Vec<Arc<dyn Adapter>>,
}

impl SupervisorHarnessBuilder {
    /// Sets the supervisor timing.
    pub fn config(mut self, config: SupervisorConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a source backed by its own simulated server.
    pub fn source(mut self, address: SourceAddress) -> Self {
        self.sources.push(address);
        self
    }

    /// Registers an adapter.
    pub fn adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Builds the harness. Nothing is scheduled until [`SupervisorHarness::start`].
    pub fn build(self) -> SupervisorHarness {
        let factory = OpcClientFactory::new(ClientSettings::default());
        let mut servers = HashMap::new();
        for address in &self.sources {
            let server = SimulatedServer::new();
            factory.set_source_connector(
                address.clone(),
                Arc::new(SimulatedConnector::new(server.clone())),
            );
            servers.insert(address.clone(), server);
        }

        let mut dispatcher = AdaptationDispatcher::new();
        for adapter in self.adapters {
            dispatcher.register(adapter);
        }

        let registry = Arc::new(ClientRegistry::with_dispose_timeout(self.config.dispose_timeout));
        let supervisor = Supervisor::new(
            self.config,
            registry,
            Arc::new(factory),
            Arc::new(dispatcher),
        );

        SupervisorHarness {
            supervisor,
            sources: self.sources,
            servers,
        }
    }
}

// =============================================================================
// Harness
// =============================================================================

/// A supervisor over simulated sources.
pub struct SupervisorHarness {
    supervisor: Supervisor,
    sources: Vec<SourceAddress>,
    servers: HashMap<SourceAddress, Arc<SimulatedServer>>,
}

impl SupervisorHarness {
    /// Creates a builder.
    pub fn builder() -> SupervisorHarnessBuilder {
        SupervisorHarnessBuilder::default()
    }

    /// Starts supervision of every source.
    pub async fn start(&self) {
        self.supervisor
            .start(&self.sources)
            .await
            .expect("supervisor should start");
        tokio::task::yield_now().await;
    }

    /// Stops supervision.
    pub async fn stop(&self) {
        self.supervisor.stop().await;
    }

    /// Lets `duration` of (paused) time pass.
    pub async fn advance(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Returns the supervisor.
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Returns the simulated server behind `address`.
    pub fn server(&self, address: &SourceAddress) -> &Arc<SimulatedServer> {
        self.servers
            .get(address)
            .expect("source was not added to the harness")
    }

    /// Returns the health of `address`.
    pub fn state(&self, address: &SourceAddress) -> Option<HealthState> {
        self.supervisor.health(address)
    }

    /// Returns the unpaused task of `address`.
    pub fn active_task(&self, address: &SourceAddress) -> Option<TaskKind> {
        self.supervisor.active_task(address)
    }

    /// Returns `true` if the registry holds a connected client for `address`.
    pub fn is_connected(&self, address: &SourceAddress) -> bool {
        self.supervisor.registry().get_connected(address).is_some()
    }
}
