// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Bridge runtime orchestration.
//!
//! ```text
//! start: build address space ─▶ attach + start front end ─▶ supervisor.start(sources)
//! stop:  supervisor.stop (clear tasks, dispose clients within grace) ─▶ front end stop
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_config::{load_config, BridgeConfig};
use bridge_core::{
    AddressSpace, BridgeResult, ClientRegistry, FrontEnd, SourceAddress, SourceHealth, Supervisor,
    Value,
};
use bridge_opc::{ClientSettings, OpcClientFactory, SimulatedConnector, SimulatedServer};
use tracing::info;

use crate::adapters;
use crate::error::{BinError, BinResult};
use crate::front_end::TracingFrontEnd;
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// BridgeRuntime
// =============================================================================

/// Owns every component of a running bridge.
pub struct BridgeRuntime {
    config: Arc<BridgeConfig>,
    space: Arc<AddressSpace>,
    front_end: Arc<dyn FrontEnd>,
    supervisor: Supervisor,
    sources: Vec<SourceAddress>,
    simulated: HashMap<SourceAddress, Arc<SimulatedServer>>,
    shutdown: ShutdownCoordinator,
}

impl BridgeRuntime {
    /// Builds every component. Nothing connects until [`start`](Self::start).
    pub fn new(config: BridgeConfig, options: RuntimeOptions) -> BinResult<Self> {
        let sources = config.resolve_sources()?;

        let space = Arc::new(AddressSpace::build(&config.groups)?);
        let front_end = build_front_end(&config, options.headless).map_err(BinError::FrontEnd)?;
        space.attach(front_end.clone())?;

        let settings = ClientSettings {
            monitor_interval: config.client.monitor_interval(),
            application_name: config.client.application_name.clone(),
            session_timeout: config.client.session_timeout(),
        };
        let factory = OpcClientFactory::new(settings);

        let mut simulated = HashMap::new();
        for (source, address) in config.sources.iter().zip(&sources) {
            if !(source.simulated || options.simulate_all) {
                continue;
            }
            let server = SimulatedServer::new();
            for (tag, value) in &source.initial_values {
                server.insert(tag.as_str(), Value::from(value.clone()));
            }
            factory.set_source_connector(
                address.clone(),
                Arc::new(SimulatedConnector::new(server.clone())),
            );
            info!(address = %address, tags = source.initial_values.len(), "Source simulated");
            simulated.insert(address.clone(), server);
        }

        let supervisor_config = config.supervisor.to_supervisor_config();
        let supervisor = Supervisor::new(
            supervisor_config,
            Arc::new(ClientRegistry::with_dispose_timeout(supervisor_config.dispose_timeout)),
            Arc::new(factory),
            Arc::new(adapters::build_dispatcher(&space)),
        );

        Ok(Self {
            config: Arc::new(config),
            space,
            front_end,
            supervisor,
            sources,
            simulated,
            shutdown: ShutdownCoordinator::new(),
        })
    }

    /// Starts the front end, then supervision of every source.
    pub async fn start(&self) -> BinResult<()> {
        self.front_end.start().await.map_err(BinError::FrontEnd)?;
        self.supervisor
            .start(&self.sources)
            .await
            .map_err(BinError::Supervisor)?;
        info!(
            sources = self.sources.len(),
            variables = self.space.variable_count(),
            front_end = self.front_end.name(),
            "Bridge started"
        );
        Ok(())
    }

    /// Stops supervision, disposes every client, then stops the front end.
    pub async fn stop(&self) {
        self.supervisor.stop().await;
        self.front_end.stop().await;
        info!("Bridge stopped");
    }

    /// Starts, waits for shutdown, then stops.
    pub async fn run(self) -> BinResult<()> {
        info!(version = bridge_core::VERSION, "Starting OPC bridge");
        if let Err(e) = self.start().await {
            self.stop().await;
            return Err(e);
        }

        self.shutdown.wait_for_shutdown().await;
        info!("Shutdown initiated, cleaning up");
        self.stop().await;
        Ok(())
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns the address space.
    pub fn space(&self) -> &Arc<AddressSpace> {
        &self.space
    }

    /// Returns the supervisor.
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Returns the per-source health.
    pub fn health(&self) -> Vec<SourceHealth> {
        self.supervisor.snapshot()
    }

    /// Returns the simulated server behind `address`, if any.
    pub fn simulated(&self, address: &SourceAddress) -> Option<&Arc<SimulatedServer>> {
        self.simulated.get(address)
    }

    /// Returns the shutdown coordinator.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }
}

impl std::fmt::Debug for BridgeRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeRuntime")
            .field("sources", &self.sources)
            .field("front_end", &self.front_end.name())
            .field("simulated", &self.simulated.len())
            .finish()
    }
}

#[cfg(feature = "ua-server")]
fn build_front_end(config: &BridgeConfig, headless: bool) -> BridgeResult<Arc<dyn FrontEnd>> {
    if !config.server.enabled || headless {
        return Ok(Arc::new(TracingFrontEnd::new()));
    }
    let settings = bridge_opc::UaServerSettings {
        application_name: config.server.application_name.clone(),
        host: config.server.host.clone(),
        port: config.server.port,
        namespace_uri: config.server.namespace_uri.clone(),
    };
    Ok(Arc::new(bridge_opc::UaServerFrontEnd::new(&settings)?))
}

#[cfg(not(feature = "ua-server"))]
fn build_front_end(config: &BridgeConfig, headless: bool) -> BridgeResult<Arc<dyn FrontEnd>> {
    if config.server.enabled && !headless {
        tracing::warn!("UA server requested but not compiled in, running headless");
    }
    Ok(Arc::new(TracingFrontEnd::new()))
}

// =============================================================================
// RuntimeOptions / RuntimeBuilder
// =============================================================================

/// Command-line switches that alter the runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Serve every source from the simulated stack.
    pub simulate_all: bool,
    /// Never start the UA server.
    pub headless: bool,
}

/// Builder for constructing the runtime.
#[derive(Debug, Default)]
pub struct RuntimeBuilder {
    config_path: Option<PathBuf>,
    config: Option<BridgeConfig>,
    options: RuntimeOptions,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration file path.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Serves every source from the simulated stack.
    pub fn simulate_all(mut self, enabled: bool) -> Self {
        self.options.simulate_all = enabled;
        self
    }

    /// Never starts the UA server.
    pub fn headless(mut self, enabled: bool) -> Self {
        self.options.headless = enabled;
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> BinResult<BridgeRuntime> {
        let config = match self.config {
            Some(config) => config,
            None => {
                let path = self
                    .config_path
                    .ok_or(BinError::NoConfiguration)?;
                load_config(&path)
                    .map_err(|e| BinError::from(e).with_context(format!("loading {}", path.display())))?
            }
        };

        BridgeRuntime::new(config, self.options)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_config::{ServerConfig, SourceConfig};
    use bridge_core::{GroupDefinition, HealthState};
    use std::time::Duration;

    fn plant_config() -> BridgeConfig {
        let mut source = SourceConfig::new(adapters::pasteurization::SOURCE_URL);
        source.simulated = true;
        source
            .initial_values
            .insert("Pasteurization.TestMonitor".to_string(), serde_json::json!(4.5));
        source
            .initial_values
            .insert("Pasteurization.TestSwitch".to_string(), serde_json::json!(true));

        BridgeConfig {
            server: ServerConfig {
                enabled: false,
                ..Default::default()
            },
            sources: vec![source],
            groups: vec![GroupDefinition::new("Pasteurization", "").with_variable("Switch", "")],
            ..Default::default()
        }
    }

    #[test]
    fn test_builder_requires_config() {
        let err = RuntimeBuilder::new().build().unwrap_err();
        assert!(matches!(err, BinError::NoConfiguration));
    }

    #[test]
    fn test_duplicate_group_fails_at_address_space() {
        let mut config = plant_config();
        config.groups.push(GroupDefinition::new("Pasteurization", ""));

        let err = RuntimeBuilder::new().config(config).build().unwrap_err();
        assert!(matches!(err, BinError::AddressSpace(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_builder_rejects_missing_file() {
        let err = RuntimeBuilder::new()
            .config_path("/nonexistent/bridge.yaml")
            .build()
            .unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_projects_simulated_source() {
        let runtime = RuntimeBuilder::new().config(plant_config()).build().unwrap();
        runtime.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let health = runtime.health();
        assert_eq!(health.len(), 1);
        assert_eq!(health[0].state, HealthState::Reachable);
        assert_eq!(
            runtime.space().variable("Pasteurization.Switch").unwrap().value(),
            Value::Bool(true)
        );

        runtime.stop().await;
        assert!(runtime.supervisor().registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulate_all_covers_unflagged_sources() {
        let mut config = plant_config();
        config.sources[0].simulated = false;
        config.sources[0].initial_values.clear();

        let runtime = RuntimeBuilder::new()
            .config(config)
            .simulate_all(true)
            .build()
            .unwrap();
        let address = runtime.config().resolve_sources().unwrap().remove(0);
        assert!(runtime.simulated(&address).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let runtime = RuntimeBuilder::new().config(plant_config()).build().unwrap();
        let shutdown = runtime.shutdown().clone();
        let task = tokio::spawn(runtime.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.initiate_shutdown();
        task.await.unwrap().unwrap();
    }
}
