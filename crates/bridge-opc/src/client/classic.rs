// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC Classic (DA) client.

use std::fmt;
use std::sync::Arc;

use bridge_core::{ClientError, ClientKind, ClientResult, SourceAddress};

use super::base::SessionClient;
use super::{delegate_client, ClientSettings};
use crate::endpoint::{ClassicEndpoint, Endpoint};
use crate::session::SessionConnector;

/// Client for an OPC Classic (DA) server.
///
/// DA servers are COM objects, so sessions come from whatever connector the
/// host supplies; tag identifiers are DA item ids such as
/// `Pasteurization.TestSwitch`.
pub struct ClassicClient {
    inner: SessionClient,
    endpoint: ClassicEndpoint,
}

impl ClassicClient {
    /// Creates a client for `address`.
    ///
    /// # Errors
    ///
    /// - `ClientError::UnknownProtocolFamily` - `address` is not Classic
    /// - `ClientError::Connection` - the URL is not `opcda://host/ProgId`
    pub fn new(
        address: SourceAddress,
        connector: Arc<dyn SessionConnector>,
        settings: ClientSettings,
    ) -> ClientResult<Self> {
        if address.kind() != ClientKind::Classic {
            return Err(ClientError::unknown_family(address.kind().as_str()));
        }
        let endpoint = Endpoint::parse(&address)?;
        let Endpoint::Classic(classic) = endpoint.clone() else {
            return Err(ClientError::unknown_family(endpoint.kind().as_str()));
        };
        Ok(Self {
            inner: SessionClient::new(address, endpoint, connector, settings),
            endpoint: classic,
        })
    }

    /// Returns the DA endpoint.
    pub fn endpoint(&self) -> &ClassicEndpoint {
        &self.endpoint
    }

    /// Returns the server ProgId.
    pub fn prog_id(&self) -> &str {
        &self.endpoint().prog_id
    }

    /// Returns the client settings.
    pub fn settings(&self) -> &ClientSettings {
        self.inner.settings()
    }
}

delegate_client!(ClassicClient);

impl fmt::Debug for ClassicClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassicClient")
            .field("address", self.inner.address())
            .field("prog_id", &self.endpoint.prog_id)
            .field("status", &self.inner.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::{SimulatedConnector, SimulatedServer};
    use bridge_core::{Client, ClientExt, TagId, Value};

    const URL: &str = "opcda://192.168.0.153/Matrikon.OPC.Simulation.1";

    fn client(server: &Arc<SimulatedServer>) -> ClassicClient {
        ClassicClient::new(
            SourceAddress::new(URL, ClientKind::Classic),
            Arc::new(SimulatedConnector::new(server.clone())),
            ClientSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_unified_address() {
        let server = SimulatedServer::new();
        let result = ClassicClient::new(
            SourceAddress::new("opc.tcp://plc:4840", ClientKind::Unified),
            Arc::new(SimulatedConnector::new(server)),
            ClientSettings::default(),
        );
        assert!(matches!(result, Err(ClientError::UnknownProtocolFamily { .. })));
    }

    #[tokio::test]
    async fn test_prog_id_and_typed_read() {
        let server = SimulatedServer::new();
        server.insert("Pasteurization.TestSwitch", true);
        let client = client(&server);

        assert_eq!(client.prog_id(), "Matrikon.OPC.Simulation.1");
        client.connect().await.unwrap();

        let switch: bool = client.read_as(&TagId::new("Pasteurization.TestSwitch")).await.unwrap();
        assert!(switch);

        let err = client
            .read_as::<f64>(&TagId::new("Pasteurization.TestSwitch"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::TagCast { expected: "float64", actual: "bool", .. }));
        assert_eq!(
            client.data_type(&TagId::new("Pasteurization.TestSwitch")).await.unwrap(),
            Value::Bool(true).type_name()
        );
    }
}
