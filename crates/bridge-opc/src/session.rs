// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Boundary to the external protocol stack.
//!
//! Protocol-family clients never talk to a wire library directly. They go
//! through a [`SessionConnector`] that opens [`Session`]s, which keeps the
//! clients testable and lets hosts plug in whatever stack their platform
//! offers (an OPC DA COM bridge, the `opcua` crate, the simulated server).
//!
//! ```text
//! ClassicClient / UnifiedClient
//!          │ connect(endpoint)
//!          ▼
//!   SessionConnector ──────▶ Session
//!                             ├── read / write
//!                             ├── subscribe ──▶ mpsc batches of RawRead
//!                             ├── state()   ──▶ watch<ServerState>
//!                             └── close
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_core::{ClientError, ClientResult, StatusCode, TagId, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

use crate::endpoint::Endpoint;

// =============================================================================
// Wire Types
// =============================================================================

/// One value as reported by the protocol stack.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRead {
    /// Tag the value belongs to.
    pub tag: TagId,
    /// Reported value.
    pub value: Value,
    /// Reported status.
    pub status: StatusCode,
    /// Timestamp assigned by the data source.
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Timestamp assigned by the server.
    pub server_timestamp: Option<DateTime<Utc>>,
}

impl RawRead {
    /// Creates a good value stamped now.
    pub fn good(tag: TagId, value: Value) -> Self {
        let now = Utc::now();
        Self {
            tag,
            value,
            status: StatusCode::GOOD,
            source_timestamp: Some(now),
            server_timestamp: Some(now),
        }
    }
}

/// Sink receiving change batches of a subscription.
pub type ChangeSink = mpsc::UnboundedSender<Vec<RawRead>>;

/// Session-scoped subscription identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub u32);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server state as reported by the session keep-alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    /// The server reports a running state.
    Running,

    /// The keep-alive failed or the server left the running state.
    Lost {
        /// Reason reported by the stack.
        reason: String,
    },
}

impl ServerState {
    /// Returns `true` while running.
    pub fn is_running(&self) -> bool {
        matches!(self, ServerState::Running)
    }
}

// =============================================================================
// Traits
// =============================================================================

/// An open session with a server.
#[async_trait]
pub trait Session: Send + Sync {
    /// Reads the current value of a tag.
    async fn read(&self, tag: &TagId) -> ClientResult<RawRead>;

    /// Writes a value and returns the status reported by the server.
    async fn write(&self, tag: &TagId, value: Value) -> ClientResult<StatusCode>;

    /// Subscribes to `tags`, sampled at `interval`.
    ///
    /// Change batches are pushed to `sink` until the subscription is removed
    /// or the session closes, at which point the sink is dropped.
    async fn subscribe(
        &self,
        tags: &[TagId],
        interval: Duration,
        sink: ChangeSink,
    ) -> ClientResult<SubscriptionId>;

    /// Removes a subscription.
    async fn unsubscribe(&self, id: SubscriptionId) -> ClientResult<()>;

    /// Watches the server state.
    fn state(&self) -> watch::Receiver<ServerState>;

    /// Closes the session. Safe to call more than once.
    async fn close(&self);
}

/// Opens sessions for endpoints.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// Returns a name for logging.
    fn name(&self) -> &str;

    /// Opens a session.
    ///
    /// # Errors
    ///
    /// `ClientError::Connection` if the server cannot be reached or refuses
    /// the session.
    async fn connect(&self, endpoint: &Endpoint) -> ClientResult<Arc<dyn Session>>;
}

// =============================================================================
// UnavailableConnector
// =============================================================================

/// Connector for a family that has no stack on this build or platform.
///
/// Every connect fails with `ClientError::Connection`, so the supervisor keeps
/// the source unreachable and retries on its normal cadence.
#[derive(Debug, Clone)]
pub struct UnavailableConnector {
    reason: String,
}

impl UnavailableConnector {
    /// Creates a connector failing with `reason`.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl SessionConnector for UnavailableConnector {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn connect(&self, endpoint: &Endpoint) -> ClientResult<Arc<dyn Session>> {
        Err(ClientError::connection(endpoint.to_string(), self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::{ClientKind, SourceAddress};

    #[tokio::test]
    async fn test_unavailable_connector_fails() {
        let address = SourceAddress::new("opcda://localhost/Vendor.Server.1", ClientKind::Classic);
        let endpoint = Endpoint::parse(&address).unwrap();
        let connector = UnavailableConnector::new("no DA stack");

        let err = connector.connect(&endpoint).await.err().unwrap();
        assert!(matches!(err, ClientError::Connection { .. }));
        assert!(err.to_string().contains("no DA stack"));
    }
}
