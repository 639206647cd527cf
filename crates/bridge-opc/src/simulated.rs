// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory protocol stack.
//!
//! [`SimulatedServer`] holds a tag table and serves it through
//! [`SimulatedConnector`] sessions. It backs sources configured as
//! `simulated`, and stands in for real servers in tests:
//!
//! - reachability and connect latency can be toggled at runtime
//! - writes to chosen tags can be rejected with a status code
//! - every value change is pushed to matching subscriptions as one batch
//! - open sessions can be dropped to exercise keep-alive loss

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_core::{ClientError, ClientResult, StatusCode, TagId, Value};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use crate::endpoint::Endpoint;
use crate::session::{ChangeSink, RawRead, ServerState, Session, SessionConnector, SubscriptionId};

// =============================================================================
// SimulatedServer
// =============================================================================

#[derive(Debug, Clone)]
struct SimTag {
    value: Value,
    status: StatusCode,
    timestamp: DateTime<Utc>,
}

struct SimSession {
    state: watch::Sender<ServerState>,
    alive: Arc<AtomicBool>,
}

struct SimSubscription {
    session: u64,
    tags: Vec<TagId>,
    interval: Duration,
    sink: ChangeSink,
}

/// An in-memory server.
pub struct SimulatedServer {
    tags: RwLock<HashMap<TagId, SimTag>>,
    rejected: DashMap<TagId, StatusCode>,
    reachable: AtomicBool,
    connect_delay: Mutex<Duration>,
    sessions: DashMap<u64, SimSession>,
    subscriptions: DashMap<SubscriptionId, SimSubscription>,
    next_session: AtomicU64,
    next_subscription: AtomicU32,
    connects: AtomicU64,
}

impl SimulatedServer {
    /// Creates a reachable server with an empty tag table.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tags: RwLock::new(HashMap::new()),
            rejected: DashMap::new(),
            reachable: AtomicBool::new(true),
            connect_delay: Mutex::new(Duration::ZERO),
            sessions: DashMap::new(),
            subscriptions: DashMap::new(),
            next_session: AtomicU64::new(1),
            next_subscription: AtomicU32::new(1),
            connects: AtomicU64::new(0),
        })
    }

    // =========================================================================
    // Tag Table
    // =========================================================================

    /// Adds or replaces a tag without notifying subscribers.
    pub fn insert(&self, tag: impl Into<TagId>, value: impl Into<Value>) {
        self.tags.write().insert(
            tag.into(),
            SimTag {
                value: value.into(),
                status: StatusCode::GOOD,
                timestamp: Utc::now(),
            },
        );
    }

    /// Changes a tag and pushes the change to subscribers.
    pub fn set_value(&self, tag: impl Into<TagId>, value: impl Into<Value>) {
        self.set_values([(tag.into(), value.into())]);
    }

    /// Changes several tags and pushes them as a single batch.
    pub fn set_values<I>(&self, changes: I)
    where
        I: IntoIterator<Item = (TagId, Value)>,
    {
        let now = Utc::now();
        let mut batch = Vec::new();
        {
            let mut tags = self.tags.write();
            for (tag, value) in changes {
                tags.insert(
                    tag.clone(),
                    SimTag {
                        value: value.clone(),
                        status: StatusCode::GOOD,
                        timestamp: now,
                    },
                );
                batch.push(RawRead {
                    tag,
                    value,
                    status: StatusCode::GOOD,
                    source_timestamp: Some(now),
                    server_timestamp: Some(now),
                });
            }
        }
        self.publish(&batch);
    }

    /// Returns the current value of a tag.
    pub fn value(&self, tag: &str) -> Option<Value> {
        self.tags.read().get(&TagId::new(tag)).map(|t| t.value.clone())
    }

    /// Makes writes to `tag` fail with `status`.
    pub fn reject_writes(&self, tag: impl Into<TagId>, status: StatusCode) {
        self.rejected.insert(tag.into(), status);
    }

    // =========================================================================
    // Connectivity
    // =========================================================================

    /// Makes new connects succeed or fail.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Delays every connect by `delay`.
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock() = delay;
    }

    /// Reports `reason` as lost on every open session and drops their
    /// subscriptions.
    pub fn drop_sessions(&self, reason: &str) {
        for entry in self.sessions.iter() {
            if entry.alive.swap(false, Ordering::SeqCst) {
                let _ = entry.state.send(ServerState::Lost {
                    reason: reason.to_string(),
                });
            }
        }
        self.subscriptions.retain(|_, sub| {
            self.sessions
                .get(&sub.session)
                .map(|s| s.alive.load(Ordering::SeqCst))
                .unwrap_or(false)
        });
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Returns the number of successful connects.
    pub fn connect_count(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
    }

    /// Returns the number of live sessions.
    pub fn open_sessions(&self) -> usize {
        self.sessions
            .iter()
            .filter(|s| s.alive.load(Ordering::SeqCst))
            .count()
    }

    /// Returns the number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns the sampling intervals requested by active subscriptions.
    pub fn subscription_intervals(&self) -> Vec<Duration> {
        self.subscriptions.iter().map(|s| s.interval).collect()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn publish(&self, batch: &[RawRead]) {
        for sub in self.subscriptions.iter() {
            let matching: Vec<RawRead> = batch
                .iter()
                .filter(|raw| sub.tags.contains(&raw.tag))
                .cloned()
                .collect();
            if !matching.is_empty() {
                let _ = sub.sink.send(matching);
            }
        }
    }

    fn snapshot(&self, tag: &TagId) -> RawRead {
        match self.tags.read().get(tag) {
            Some(entry) => RawRead {
                tag: tag.clone(),
                value: entry.value.clone(),
                status: entry.status,
                source_timestamp: Some(entry.timestamp),
                server_timestamp: Some(Utc::now()),
            },
            None => RawRead {
                tag: tag.clone(),
                value: Value::Null,
                status: StatusCode::BAD_NODE_ID_UNKNOWN,
                source_timestamp: None,
                server_timestamp: Some(Utc::now()),
            },
        }
    }

    fn close_session(&self, id: u64) {
        self.subscriptions.retain(|_, sub| sub.session != id);
        self.sessions.remove(&id);
    }
}

impl std::fmt::Debug for SimulatedServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedServer")
            .field("tags", &self.tags.read().len())
            .field("reachable", &self.reachable.load(Ordering::SeqCst))
            .field("sessions", &self.open_sessions())
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

// =============================================================================
// SimulatedConnector
// =============================================================================

/// Opens sessions on a [`SimulatedServer`].
#[derive(Debug, Clone)]
pub struct SimulatedConnector {
    server: Arc<SimulatedServer>,
}

impl SimulatedConnector {
    /// Creates a connector for `server`.
    pub fn new(server: Arc<SimulatedServer>) -> Self {
        Self { server }
    }

    /// Returns the server.
    pub fn server(&self) -> &Arc<SimulatedServer> {
        &self.server
    }
}

#[async_trait]
impl SessionConnector for SimulatedConnector {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn connect(&self, endpoint: &Endpoint) -> ClientResult<Arc<dyn Session>> {
        let delay = *self.server.connect_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if !self.server.reachable.load(Ordering::SeqCst) {
            return Err(ClientError::connection(endpoint.to_string(), "connection refused"));
        }

        let id = self.server.next_session.fetch_add(1, Ordering::SeqCst);
        let (state, receiver) = watch::channel(ServerState::Running);
        let alive = Arc::new(AtomicBool::new(true));
        self.server.sessions.insert(
            id,
            SimSession {
                state,
                alive: alive.clone(),
            },
        );
        self.server.connects.fetch_add(1, Ordering::SeqCst);

        Ok(Arc::new(SimulatedSession {
            server: self.server.clone(),
            id,
            alive,
            state: receiver,
        }))
    }
}

// =============================================================================
// SimulatedSession
// =============================================================================

struct SimulatedSession {
    server: Arc<SimulatedServer>,
    id: u64,
    alive: Arc<AtomicBool>,
    state: watch::Receiver<ServerState>,
}

impl SimulatedSession {
    fn ensure_alive(&self) -> ClientResult<()> {
        if self.alive.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::connection(
                format!("simulated session {}", self.id),
                "session lost",
            ))
        }
    }
}

#[async_trait]
impl Session for SimulatedSession {
    async fn read(&self, tag: &TagId) -> ClientResult<RawRead> {
        self.ensure_alive()?;
        Ok(self.server.snapshot(tag))
    }

    async fn write(&self, tag: &TagId, value: Value) -> ClientResult<StatusCode> {
        self.ensure_alive()?;
        if let Some(status) = self.server.rejected.get(tag) {
            return Ok(*status);
        }
        if !self.server.tags.read().contains_key(tag) {
            return Ok(StatusCode::BAD_NODE_ID_UNKNOWN);
        }
        self.server.set_value(tag.clone(), value);
        Ok(StatusCode::GOOD)
    }

    async fn subscribe(
        &self,
        tags: &[TagId],
        interval: Duration,
        sink: ChangeSink,
    ) -> ClientResult<SubscriptionId> {
        self.ensure_alive()?;
        let id = SubscriptionId(self.server.next_subscription.fetch_add(1, Ordering::SeqCst));

        let initial: Vec<RawRead> = tags.iter().map(|tag| self.server.snapshot(tag)).collect();
        let _ = sink.send(initial);

        self.server.subscriptions.insert(
            id,
            SimSubscription {
                session: self.id,
                tags: tags.to_vec(),
                interval,
                sink,
            },
        );
        Ok(id)
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> ClientResult<()> {
        self.server.subscriptions.remove(&id);
        Ok(())
    }

    fn state(&self) -> watch::Receiver<ServerState> {
        self.state.clone()
    }

    async fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.server.close_session(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::{ClientKind, SourceAddress};
    use tokio::sync::mpsc;

    fn endpoint() -> Endpoint {
        Endpoint::parse(&SourceAddress::new("opc.tcp://sim:4840", ClientKind::Unified)).unwrap()
    }

    #[tokio::test]
    async fn test_unreachable_refuses() {
        let server = SimulatedServer::new();
        server.set_reachable(false);

        let err = SimulatedConnector::new(server.clone())
            .connect(&endpoint())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::Connection { .. }));
        assert_eq!(server.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_subscription_gets_initial_and_changes() {
        let server = SimulatedServer::new();
        server.insert("a", 1i32);
        server.insert("b", 2i32);
        let session = SimulatedConnector::new(server.clone()).connect(&endpoint()).await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        session
            .subscribe(&[TagId::new("a")], Duration::from_millis(100), tx)
            .await
            .unwrap();

        let initial = rx.recv().await.unwrap();
        assert_eq!(initial.len(), 1);
        assert_eq!(initial[0].value, Value::Int32(1));

        server.set_value("b", 3i32);
        server.set_value("a", 4i32);
        let change = rx.recv().await.unwrap();
        assert_eq!(change[0].tag, TagId::new("a"));
        assert_eq!(change[0].value, Value::Int32(4));
        assert_eq!(server.subscription_intervals(), vec![Duration::from_millis(100)]);
    }

    #[tokio::test]
    async fn test_write_statuses() {
        let server = SimulatedServer::new();
        server.insert("ok", false);
        server.insert("locked", false);
        server.reject_writes("locked", StatusCode::BAD_NOT_WRITABLE);
        let session = SimulatedConnector::new(server.clone()).connect(&endpoint()).await.unwrap();

        assert!(session.write(&TagId::new("ok"), Value::Bool(true)).await.unwrap().is_good());
        assert_eq!(server.value("ok"), Some(Value::Bool(true)));
        assert_eq!(
            session.write(&TagId::new("locked"), Value::Bool(true)).await.unwrap(),
            StatusCode::BAD_NOT_WRITABLE
        );
        assert_eq!(
            session.write(&TagId::new("missing"), Value::Bool(true)).await.unwrap(),
            StatusCode::BAD_NODE_ID_UNKNOWN
        );
    }

    #[tokio::test]
    async fn test_close_drops_subscriptions() {
        let server = SimulatedServer::new();
        let session = SimulatedConnector::new(server.clone()).connect(&endpoint()).await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        session.subscribe(&[TagId::new("a")], Duration::from_millis(100), tx).await.unwrap();
        let _ = rx.recv().await;

        session.close().await;
        assert_eq!(server.subscription_count(), 0);
        assert_eq!(server.open_sessions(), 0);
        assert!(rx.recv().await.is_none());
        assert!(session.read(&TagId::new("a")).await.is_err());
    }
}
