// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA client.

use std::fmt;
use std::sync::Arc;

use bridge_core::{ClientError, ClientKind, ClientResult, SourceAddress};

use super::base::SessionClient;
use super::{delegate_client, ClientSettings};
use crate::endpoint::{Endpoint, Identity, UnifiedEndpoint};
use crate::session::SessionConnector;

/// Client for an OPC UA server.
///
/// Tag identifiers are node ids in their string form, for example
/// `ns=2;s=Line1.Temperature`.
pub struct UnifiedClient {
    inner: SessionClient,
    endpoint: UnifiedEndpoint,
}

impl UnifiedClient {
    /// Creates a client for `address`.
    ///
    /// User credentials embedded in the URL become the session identity.
    ///
    /// # Errors
    ///
    /// - `ClientError::UnknownProtocolFamily` - `address` is not Unified
    /// - `ClientError::Connection` - the URL cannot be parsed
    pub fn new(
        address: SourceAddress,
        connector: Arc<dyn SessionConnector>,
        settings: ClientSettings,
    ) -> ClientResult<Self> {
        if address.kind() != ClientKind::Unified {
            return Err(ClientError::unknown_family(address.kind().as_str()));
        }
        let endpoint = Endpoint::parse(&address)?;
        let Endpoint::Unified(unified) = endpoint.clone() else {
            return Err(ClientError::unknown_family(endpoint.kind().as_str()));
        };
        Ok(Self {
            inner: SessionClient::new(address, endpoint, connector, settings),
            endpoint: unified,
        })
    }

    /// Returns the UA endpoint.
    pub fn endpoint(&self) -> &UnifiedEndpoint {
        &self.endpoint
    }

    /// Returns the session identity.
    pub fn identity(&self) -> &Identity {
        &self.endpoint.identity
    }

    /// Returns the client settings.
    pub fn settings(&self) -> &ClientSettings {
        self.inner.settings()
    }
}

delegate_client!(UnifiedClient);

impl fmt::Debug for UnifiedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnifiedClient")
            .field("endpoint", &self.endpoint.url)
            .field("identity", &self.endpoint.identity)
            .field("status", &self.inner.status())
            .finish()
    }
}
