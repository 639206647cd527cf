// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA sessions through the `opcua` crate.
//!
//! The `opcua` client API is blocking and runs its own runtime, so every
//! call is made from a dedicated OS thread and awaited through a oneshot.
//! Keep-alive failures reported by the stack's connection status callback
//! surface as [`ServerState::Lost`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_core::{ClientError, ClientResult, StatusCode, TagId, Value};
use dashmap::DashMap;
use opcua::client::prelude::{
    AttributeId, ClientBuilder, ConnectionStatusCallback, DataChangeCallback, DataValue,
    ExtensionObject, IdentityToken, MessageSecurityMode, MonitoredItemCreateRequest,
    MonitoringMode, MonitoringParameters, MonitoredItemService, QualifiedName, ReadValueId,
    Session as UaInnerSession, SessionCommand, SubscriptionService, TimestampsToReturn,
    UAString, AttributeService, WriteValue,
};
use opcua::sync::RwLock as UaRwLock;
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};

use crate::client::ClientSettings;
use crate::convert::{from_data_value, tag_to_node_id, to_variant};
use crate::endpoint::{Endpoint, Identity, UnifiedEndpoint};
use crate::session::{ChangeSink, RawRead, ServerState, Session, SessionConnector, SubscriptionId};

const SUBSCRIPTION_LIFETIME_COUNT: u32 = 60;
const SUBSCRIPTION_KEEPALIVE_COUNT: u32 = 10;
const MONITORED_ITEM_QUEUE_SIZE: u32 = 10;

/// Runs a blocking `opcua` call off the async runtime.
async fn run_blocking<T, F>(operation: &'static str, f: F) -> ClientResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ClientResult<T> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new()
        .name(format!("opcua-{}", operation))
        .spawn(move || {
            let _ = tx.send(f());
        })
        .map_err(|e| ClientError::connection_with(operation, "cannot spawn worker thread", e))?;

    rx.await
        .map_err(|_| ClientError::connection(operation, "worker thread ended without a result"))?
}

// =============================================================================
// UaConnector
// =============================================================================

/// Opens UA sessions with security mode None.
#[derive(Debug, Clone)]
pub struct UaConnector {
    settings: ClientSettings,
}

impl UaConnector {
    /// Creates a connector.
    pub fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SessionConnector for UaConnector {
    fn name(&self) -> &str {
        "opcua"
    }

    async fn connect(&self, endpoint: &Endpoint) -> ClientResult<Arc<dyn Session>> {
        let Endpoint::Unified(endpoint) = endpoint else {
            return Err(ClientError::unknown_family(endpoint.kind().as_str()));
        };
        let endpoint = endpoint.clone();
        let settings = self.settings.clone();

        let session = run_blocking("connect", move || open_session(&endpoint, &settings)).await?;
        Ok(Arc::new(session))
    }
}

fn open_session(endpoint: &UnifiedEndpoint, settings: &ClientSettings) -> ClientResult<UaSession> {
    let url = endpoint.url.as_str();
    let mut client = ClientBuilder::new()
        .application_name(&settings.application_name)
        .application_uri("urn:opc-bridge")
        .create_sample_keypair(true)
        .trust_server_certs(true)
        .session_retry_limit(0)
        .session_timeout(settings.session_timeout.as_millis() as u32)
        .client()
        .ok_or_else(|| ClientError::connection(url, "invalid client configuration"))?;

    let endpoints = client
        .get_server_endpoints_from_url(url)
        .map_err(|status| ClientError::connection(url, format!("endpoint discovery failed: {}", status)))?;
    let description = endpoints
        .into_iter()
        .find(|e| e.security_mode == MessageSecurityMode::None)
        .ok_or_else(|| ClientError::connection(url, "server offers no unsecured endpoint"))?;

    let identity = match &endpoint.identity {
        Identity::Anonymous => IdentityToken::Anonymous,
        Identity::UserName { user, password } => IdentityToken::UserName(user.clone(), password.clone()),
    };

    let session = client
        .connect_to_endpoint(description, identity)
        .map_err(|status| ClientError::connection(url, format!("session refused: {}", status)))?;

    let (state_tx, state_rx) = watch::channel(ServerState::Running);
    session
        .write()
        .set_connection_status_callback(ConnectionStatusCallback::new(move |connected| {
            if !connected {
                let _ = state_tx.send(ServerState::Lost {
                    reason: "keep-alive failed".to_string(),
                });
            }
        }));
    let stop = UaInnerSession::run_async(session.clone());

    Ok(UaSession {
        url: url.to_string(),
        session,
        stop: Mutex::new(Some(stop)),
        state: state_rx,
        subscriptions: DashMap::new(),
        next_subscription: AtomicU32::new(1),
    })
}

// =============================================================================
// UaSession
// =============================================================================

struct UaSession {
    url: String,
    session: Arc<UaRwLock<UaInnerSession>>,
    stop: Mutex<Option<oneshot::Sender<SessionCommand>>>,
    state: watch::Receiver<ServerState>,
    subscriptions: DashMap<SubscriptionId, u32>,
    next_subscription: AtomicU32,
}

fn read_value_id(tag: &TagId) -> ReadValueId {
    ReadValueId {
        node_id: tag_to_node_id(tag),
        attribute_id: AttributeId::Value as u32,
        index_range: UAString::null(),
        data_encoding: QualifiedName::null(),
    }
}

#[async_trait]
impl Session for UaSession {
    async fn read(&self, tag: &TagId) -> ClientResult<RawRead> {
        let session = self.session.clone();
        let url = self.url.clone();
        let tag = tag.clone();

        run_blocking("read", move || {
            let results = session
                .read()
                .read(&[read_value_id(&tag)], TimestampsToReturn::Both, 0.0)
                .map_err(|status| ClientError::connection(url, format!("read failed: {}", status)))?;
            Ok(match results.first() {
                Some(data_value) => from_data_value(tag, data_value),
                None => RawRead {
                    tag,
                    value: Value::Null,
                    status: StatusCode::BAD,
                    source_timestamp: None,
                    server_timestamp: None,
                },
            })
        })
        .await
    }

    async fn write(&self, tag: &TagId, value: Value) -> ClientResult<StatusCode> {
        let session = self.session.clone();
        let url = self.url.clone();
        let write = WriteValue {
            node_id: tag_to_node_id(tag),
            attribute_id: AttributeId::Value as u32,
            index_range: UAString::null(),
            value: DataValue::new_now(to_variant(&value)),
        };

        run_blocking("write", move || {
            let results = session
                .read()
                .write(&[write])
                .map_err(|status| ClientError::connection(url, format!("write failed: {}", status)))?;
            Ok(results
                .first()
                .map(|status| StatusCode(status.bits()))
                .unwrap_or(StatusCode::BAD))
        })
        .await
    }

    async fn subscribe(
        &self,
        tags: &[TagId],
        interval: Duration,
        sink: ChangeSink,
    ) -> ClientResult<SubscriptionId> {
        let session = self.session.clone();
        let url = self.url.clone();
        let tags = tags.to_vec();
        let interval_ms = interval.as_millis() as f64;

        let server_id = run_blocking("subscribe", move || {
            let lookup: HashMap<opcua::types::NodeId, TagId> =
                tags.iter().map(|tag| (tag_to_node_id(tag), tag.clone())).collect();
            let requests: Vec<MonitoredItemCreateRequest> = tags
                .iter()
                .enumerate()
                .map(|(i, tag)| MonitoredItemCreateRequest {
                    item_to_monitor: read_value_id(tag),
                    monitoring_mode: MonitoringMode::Reporting,
                    requested_parameters: MonitoringParameters {
                        client_handle: i as u32,
                        sampling_interval: interval_ms,
                        filter: ExtensionObject::null(),
                        queue_size: MONITORED_ITEM_QUEUE_SIZE,
                        discard_oldest: true,
                    },
                })
                .collect();

            let session = session.read();
            let server_id = session
                .create_subscription(
                    interval_ms,
                    SUBSCRIPTION_LIFETIME_COUNT,
                    SUBSCRIPTION_KEEPALIVE_COUNT,
                    0,
                    0,
                    true,
                    DataChangeCallback::new(move |items| {
                        let batch: Vec<RawRead> = items
                            .iter()
                            .filter_map(|item| {
                                let tag = lookup.get(&item.item_to_monitor().node_id)?;
                                Some(from_data_value(tag.clone(), item.last_value()))
                            })
                            .collect();
                        if !batch.is_empty() {
                            let _ = sink.send(batch);
                        }
                    }),
                )
                .map_err(|status| {
                    ClientError::connection(url.clone(), format!("create subscription failed: {}", status))
                })?;

            session
                .create_monitored_items(server_id, TimestampsToReturn::Both, &requests)
                .map_err(|status| {
                    ClientError::connection(url, format!("create monitored items failed: {}", status))
                })?;
            Ok(server_id)
        })
        .await?;

        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst));
        self.subscriptions.insert(id, server_id);
        Ok(id)
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> ClientResult<()> {
        let Some((_, server_id)) = self.subscriptions.remove(&id) else {
            return Ok(());
        };
        let session = self.session.clone();
        let url = self.url.clone();

        run_blocking("unsubscribe", move || {
            session
                .read()
                .delete_subscription(server_id)
                .map(|_| ())
                .map_err(|status| ClientError::connection(url, format!("delete subscription failed: {}", status)))
        })
        .await
    }

    fn state(&self) -> watch::Receiver<ServerState> {
        self.state.clone()
    }

    async fn close(&self) {
        self.subscriptions.clear();
        let stop = self.stop.lock().take();
        let session = self.session.clone();

        let result = run_blocking("close", move || {
            session.read().disconnect();
            if let Some(stop) = stop {
                let _ = stop.send(SessionCommand::Stop);
            }
            Ok(())
        })
        .await;
        if let Err(e) = result {
            tracing::debug!(url = %self.url, error = %e, "Session close failed");
        }
    }
}
