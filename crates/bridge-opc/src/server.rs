// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Serves the address space over OPC UA through the `opcua` server.
//!
//! Groups become folders under `Objects`, variables become writable
//! variables organized by their group folder. Node ids are string ids in
//! the bridge namespace, equal to the bridge node ids.

use std::sync::Arc;
use std::thread::JoinHandle;

use async_trait::async_trait;
use bridge_core::{
    AddressSpaceError, AddressSpaceResult, BridgeError, BridgeResult, FrontEnd, NodeRef, Quality,
    Variable,
};
use opcua::server::prelude::{
    DataTypeId, DateTime, NodeId, ObjectId, Server, ServerBuilder, StatusCode, VariableBuilder,
};
use opcua::sync::RwLock as UaRwLock;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::convert::to_variant;

/// Settings of the UA server front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UaServerSettings {
    /// Application name.
    pub application_name: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Namespace of the bridge nodes.
    pub namespace_uri: String,
}

impl Default for UaServerSettings {
    fn default() -> Self {
        Self {
            application_name: "OPC Bridge".to_string(),
            host: "0.0.0.0".to_string(),
            port: 4840,
            namespace_uri: "urn:opc-bridge".to_string(),
        }
    }
}

/// OPC UA server front end.
pub struct UaServerFrontEnd {
    server: Arc<UaRwLock<Server>>,
    namespace: u16,
    endpoint: String,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl UaServerFrontEnd {
    /// Builds the server. Nothing is bound until [`FrontEnd::start`].
    pub fn new(settings: &UaServerSettings) -> BridgeResult<Self> {
        let endpoint = format!("opc.tcp://{}:{}/", settings.host, settings.port);
        let server = ServerBuilder::new_anonymous(&settings.application_name)
            .application_uri(&settings.namespace_uri)
            .host_and_port(&settings.host, settings.port)
            .discovery_urls(vec![endpoint.clone()])
            .create_sample_keypair(true)
            .server()
            .ok_or_else(|| BridgeError::internal("invalid UA server configuration"))?;

        let namespace = {
            let space = server.address_space();
            let mut space = space.write();
            space
                .register_namespace(&settings.namespace_uri)
                .map_err(|_| BridgeError::internal("cannot register bridge namespace"))?
        };

        Ok(Self {
            server: Arc::new(UaRwLock::new(server)),
            namespace,
            endpoint,
            worker: Mutex::new(None),
        })
    }

    fn node_id(&self, id: &str) -> NodeId {
        NodeId::new(self.namespace, id)
    }
}

#[async_trait]
impl FrontEnd for UaServerFrontEnd {
    fn name(&self) -> &str {
        "opcua-server"
    }

    fn register_node(&self, node: NodeRef<'_>) -> AddressSpaceResult<()> {
        let space = self.server.read().address_space();
        let mut space = space.write();

        let inserted = match node {
            NodeRef::Group(group) => space.add_folder_with_id(
                &self.node_id(group.node_id().as_str()),
                group.name(),
                group.name(),
                &NodeId::from(ObjectId::ObjectsFolder),
            ),
            NodeRef::Variable(variable) => {
                VariableBuilder::new(
                    &self.node_id(variable.node_id().as_str()),
                    variable.name(),
                    variable.name(),
                )
                .description(variable.description())
                .data_type(DataTypeId::BaseDataType)
                .value(to_variant(&variable.value()))
                .writable()
                .organized_by(&self.node_id(variable.group_id().as_str()))
                .insert(&mut space)
            }
        };

        if inserted {
            Ok(())
        } else {
            Err(AddressSpaceError::front_end(node.node_id(), "rejected by UA address space"))
        }
    }

    fn notify_changed(&self, variable: &Variable) {
        let snapshot = variable.snapshot();
        let status = match snapshot.quality {
            Quality::Good => StatusCode::Good,
            Quality::Bad => StatusCode::Bad,
        };
        let source = DateTime::from(snapshot.timestamp);
        let now = DateTime::now();

        let space = self.server.read().address_space();
        let mut space = space.write();
        match space.find_variable_mut(self.node_id(variable.node_id().as_str())) {
            Some(node) => node.set_value_direct(to_variant(&snapshot.value), status, &source, &now),
            None => tracing::debug!(node_id = %variable.node_id(), "Variable not served"),
        }
    }

    async fn start(&self) -> BridgeResult<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }
        let server = self.server.clone();
        let handle = std::thread::Builder::new()
            .name("opcua-server".to_string())
            .spawn(move || Server::run_server(server))
            .map_err(|e| BridgeError::internal(format!("cannot start UA server: {}", e)))?;
        *worker = Some(handle);

        tracing::info!(endpoint = %self.endpoint, namespace = self.namespace, "UA server started");
        Ok(())
    }

    async fn stop(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            self.server.write().abort();
            let _ = tokio::task::spawn_blocking(move || worker.join()).await;
            tracing::info!(endpoint = %self.endpoint, "UA server stopped");
        }
    }
}

impl std::fmt::Debug for UaServerFrontEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UaServerFrontEnd")
            .field("endpoint", &self.endpoint)
            .field("namespace", &self.namespace)
            .finish()
    }
}
