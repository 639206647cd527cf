// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client factory.
//!
//! Resolves the protocol family of a source into a concrete client. The
//! session connector is chosen per source first, then per family:
//!
//! ```text
//! create(address)
//!   ├── source override?   (simulated sources, host-supplied stacks)
//!   └── family default
//!         ├── Classic → host-supplied DA connector, else unavailable
//!         └── Unified → `opcua` connector (real-transport), else unavailable
//! ```

use std::sync::Arc;

use bridge_core::{Client, ClientFactory, ClientKind, ClientResult, SourceAddress};
use dashmap::DashMap;

use crate::client::{ClassicClient, ClientSettings, UnifiedClient};
use crate::session::{SessionConnector, UnavailableConnector};

/// Creates [`ClassicClient`]s and [`UnifiedClient`]s.
pub struct OpcClientFactory {
    settings: ClientSettings,
    classic: Arc<dyn SessionConnector>,
    unified: Arc<dyn SessionConnector>,
    sources: DashMap<SourceAddress, Arc<dyn SessionConnector>>,
}

impl OpcClientFactory {
    /// Creates a factory with the default connector of each family.
    pub fn new(settings: ClientSettings) -> Self {
        let classic: Arc<dyn SessionConnector> = Arc::new(UnavailableConnector::new(
            "no OPC DA session connector is installed on this host",
        ));
        let unified = default_unified_connector(&settings);

        Self {
            settings,
            classic,
            unified,
            sources: DashMap::new(),
        }
    }

    /// Replaces the default connector of a family.
    pub fn with_family_connector(mut self, kind: ClientKind, connector: Arc<dyn SessionConnector>) -> Self {
        match kind {
            ClientKind::Classic => self.classic = connector,
            ClientKind::Unified => self.unified = connector,
        }
        self
    }

    /// Routes one source through `connector`.
    pub fn set_source_connector(&self, address: SourceAddress, connector: Arc<dyn SessionConnector>) {
        tracing::debug!(address = %address, connector = connector.name(), "Source connector set");
        self.sources.insert(address, connector);
    }

    /// Returns the client settings.
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn connector_for(&self, address: &SourceAddress) -> Arc<dyn SessionConnector> {
        if let Some(connector) = self.sources.get(address) {
            return connector.clone();
        }
        match address.kind() {
            ClientKind::Classic => self.classic.clone(),
            ClientKind::Unified => self.unified.clone(),
        }
    }
}

impl ClientFactory for OpcClientFactory {
    fn create(&self, address: &SourceAddress) -> ClientResult<Arc<dyn Client>> {
        let connector = self.connector_for(address);
        let settings = self.settings.clone();

        let client: Arc<dyn Client> = match address.kind() {
            ClientKind::Classic => Arc::new(ClassicClient::new(address.clone(), connector, settings)?),
            ClientKind::Unified => Arc::new(UnifiedClient::new(address.clone(), connector, settings)?),
        };
        Ok(client)
    }
}

impl std::fmt::Debug for OpcClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpcClientFactory")
            .field("classic", &self.classic.name())
            .field("unified", &self.unified.name())
            .field("source_overrides", &self.sources.len())
            .finish()
    }
}

#[cfg(feature = "real-transport")]
fn default_unified_connector(settings: &ClientSettings) -> Arc<dyn SessionConnector> {
    Arc::new(crate::real::UaConnector::new(settings.clone()))
}

#[cfg(not(feature = "real-transport"))]
fn default_unified_connector(_settings: &ClientSettings) -> Arc<dyn SessionConnector> {
    Arc::new(UnavailableConnector::new(
        "built without the real-transport feature",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::{SimulatedConnector, SimulatedServer};
    use bridge_core::ClientError;

    #[tokio::test]
    async fn test_classic_without_connector_fails_to_connect() {
        let factory = OpcClientFactory::new(ClientSettings::default());
        let address = SourceAddress::new("opcda://localhost/Vendor.Server.1", ClientKind::Classic);

        let client = factory.create(&address).unwrap();
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, ClientError::Connection { .. }));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_source_override_wins() {
        let server = SimulatedServer::new();
        let factory = OpcClientFactory::new(ClientSettings::default());
        let address = SourceAddress::new("opcda://localhost/Vendor.Server.1", ClientKind::Classic);
        factory.set_source_connector(address.clone(), Arc::new(SimulatedConnector::new(server.clone())));

        let client = factory.create(&address).unwrap();
        client.connect().await.unwrap();
        assert_eq!(server.connect_count(), 1);
        assert_eq!(client.address(), &address);
    }

    #[tokio::test]
    async fn test_family_connector() {
        let server = SimulatedServer::new();
        let factory = OpcClientFactory::new(ClientSettings::default())
            .with_family_connector(ClientKind::Unified, Arc::new(SimulatedConnector::new(server.clone())));

        let client = factory
            .create(&SourceAddress::new("opc.tcp://plc:4840", ClientKind::Unified))
            .unwrap();
        client.connect().await.unwrap();
        assert!(client.is_connected());
    }

    #[test]
    fn test_malformed_classic_url() {
        let factory = OpcClientFactory::new(ClientSettings::default());
        let address = SourceAddress::new("opcda://hostonly", ClientKind::Classic);
        assert!(factory.create(&address).is_err());
    }
}
