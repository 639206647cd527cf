// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session-backed client engine shared by both protocol families.
//!
//! # Monitor Delivery
//!
//! ```text
//!  Session ──batches──▶ mpsc ──▶ delivery task ──▶ callback(batch, handle)
//!     ▲                              │ keeps latest value per tag
//!     └──── unsubscribe ◀── teardown (spawned by handle.cancel())
//! ```
//!
//! Unsubscribing drops the session's sender, which ends the delivery task.
//! The callback therefore never waits on its own teardown.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bridge_core::{
    dedup_tags, ClientError, ClientEvent, ClientResult, ClientStats, ClientStatsSnapshot,
    ConnectionStatus, MonitorBatch, MonitorCallback, MonitorHandle, MonitorMode, ReadEvent,
    SourceAddress, TagId, Teardown, Value,
};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::ClientSettings;
use crate::endpoint::Endpoint;
use crate::session::{RawRead, ServerState, Session, SessionConnector, SubscriptionId};

const EVENT_CAPACITY: usize = 16;

/// The family-independent part of a client.
pub(crate) struct SessionClient {
    shared: Arc<Shared>,
    connect_lock: tokio::sync::Mutex<()>,
    connector: Arc<dyn SessionConnector>,
    settings: ClientSettings,
}

struct Shared {
    address: SourceAddress,
    endpoint: Endpoint,
    session: RwLock<Option<Arc<dyn Session>>>,
    connected: AtomicBool,
    generation: AtomicU64,
    monitors: DashMap<SubscriptionId, MonitorHandle>,
    watcher: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<ClientEvent>,
    stats: ClientStats,
}

impl SessionClient {
    pub(crate) fn new(
        address: SourceAddress,
        endpoint: Endpoint,
        connector: Arc<dyn SessionConnector>,
        settings: ClientSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                address,
                endpoint,
                session: RwLock::new(None),
                connected: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                monitors: DashMap::new(),
                watcher: Mutex::new(None),
                events,
                stats: ClientStats::new(),
            }),
            connect_lock: tokio::sync::Mutex::new(()),
            connector,
            settings,
        }
    }

    pub(crate) fn address(&self) -> &SourceAddress {
        &self.shared.address
    }

    pub(crate) fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub(crate) fn status(&self) -> ConnectionStatus {
        if self.shared.connected.load(Ordering::SeqCst) {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::NotConnected
        }
    }

    // =========================================================================
    // Connection Management
    // =========================================================================

    pub(crate) async fn connect(&self) -> ClientResult<()> {
        let _guard = self.connect_lock.lock().await;
        if self.shared.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        // A session that lost its server is released before a new one opens.
        self.release().await;

        tracing::debug!(
            address = %self.shared.address,
            endpoint = %self.shared.endpoint,
            connector = self.connector.name(),
            "Opening session"
        );
        let session = match self.connector.connect(&self.shared.endpoint).await {
            Ok(session) => session,
            Err(e) => {
                self.shared.stats.record_failure();
                return Err(e);
            }
        };

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.shared.session.write() = Some(session.clone());
        self.shared.connected.store(true, Ordering::SeqCst);
        *self.shared.watcher.lock() = Some(spawn_watcher(&self.shared, session, generation));

        self.shared.stats.record_connect();
        let _ = self.shared.events.send(ClientEvent::Connected);
        tracing::info!(address = %self.shared.address, "Session established");
        Ok(())
    }

    pub(crate) async fn dispose(&self) {
        let _guard = self.connect_lock.lock().await;
        let had_session = self.release().await;
        if had_session {
            let _ = self.shared.events.send(ClientEvent::Disposed);
            tracing::info!(address = %self.shared.address, "Client disposed");
        }
    }

    /// Tears down monitors, then closes the session.
    async fn release(&self) -> bool {
        self.shared.connected.store(false, Ordering::SeqCst);
        if let Some(watcher) = self.shared.watcher.lock().take() {
            watcher.abort();
        }

        let handles: Vec<MonitorHandle> = self
            .shared
            .monitors
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for handle in handles {
            handle.close().await;
        }
        self.shared.monitors.clear();

        let session = self.shared.session.write().take();
        match session {
            Some(session) => {
                session.close().await;
                true
            }
            None => false,
        }
    }

    fn live_session(&self) -> ClientResult<Arc<dyn Session>> {
        if !self.shared.connected.load(Ordering::SeqCst) {
            return Err(ClientError::not_connected(self.shared.address.url()));
        }
        self.shared
            .session
            .read()
            .clone()
            .ok_or_else(|| ClientError::not_connected(self.shared.address.url()))
    }

    // =========================================================================
    // Data Operations
    // =========================================================================

    pub(crate) async fn read(&self, tag: &TagId) -> ClientResult<ReadEvent> {
        let session = self.live_session()?;
        match session.read(tag).await {
            Ok(raw) => {
                self.shared.stats.record_read();
                tracing::trace!(tag = %tag, value = %raw.value, "Read");
                Ok(into_event(raw))
            }
            Err(e) => {
                self.shared.stats.record_failure();
                Err(e)
            }
        }
    }

    pub(crate) async fn write(&self, tag: &TagId, value: Value) -> ClientResult<()> {
        let session = self.live_session()?;
        let status = match session.write(tag, value).await {
            Ok(status) => status,
            Err(e) => {
                self.shared.stats.record_failure();
                return Err(e);
            }
        };

        if !status.is_good() {
            self.shared.stats.record_failure();
            return Err(ClientError::protocol(
                tag.as_str(),
                "write rejected by server",
                status.bits(),
            ));
        }

        self.shared.stats.record_write();
        tracing::trace!(tag = %tag, "Written");
        Ok(())
    }

    // =========================================================================
    // Monitoring
    // =========================================================================

    pub(crate) async fn monitor(
        &self,
        tags: &[TagId],
        mode: MonitorMode,
        callback: MonitorCallback,
    ) -> ClientResult<MonitorHandle> {
        let tags = dedup_tags(tags);
        if tags.is_empty() {
            return Err(ClientError::invalid_request("monitor requires at least one tag"));
        }

        let session = self.live_session()?;
        let (sink, batches) = mpsc::unbounded_channel();
        let id = session
            .subscribe(&tags, self.settings.monitor_interval, sink)
            .await?;

        let teardown: Teardown = {
            let shared = Arc::downgrade(&self.shared);
            let session = session.clone();
            Box::new(move || {
                Box::pin(async move {
                    if let Err(e) = session.unsubscribe(id).await {
                        tracing::debug!(subscription = %id, error = %e, "Unsubscribe failed");
                    }
                    if let Some(shared) = shared.upgrade() {
                        shared.monitors.remove(&id);
                        shared.stats.monitor_stopped();
                    }
                })
            })
        };

        // Registered before delivery starts so a cancel from the first
        // callback always finds the entry it removes.
        let handle = MonitorHandle::new(tags, teardown);
        self.shared.monitors.insert(id, handle.clone());
        self.shared.stats.monitor_started();
        tokio::spawn(deliver(batches, handle.clone(), mode, callback));

        tracing::debug!(
            address = %self.shared.address,
            subscription = %id,
            tags = handle.tags().len(),
            mode = ?mode,
            "Monitor started"
        );
        Ok(handle)
    }

    // =========================================================================
    // Observability
    // =========================================================================

    pub(crate) fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.shared.events.subscribe()
    }

    pub(crate) fn stats(&self) -> ClientStatsSnapshot {
        self.shared.stats.snapshot()
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        if let Some(watcher) = self.shared.watcher.lock().take() {
            watcher.abort();
        }
    }
}

fn into_event(raw: RawRead) -> ReadEvent {
    ReadEvent::new(raw.tag, raw.value, raw.status)
        .with_timestamps(raw.source_timestamp, raw.server_timestamp)
}

/// Delivers change batches until the session drops the sink.
async fn deliver(
    mut batches: mpsc::UnboundedReceiver<Vec<RawRead>>,
    handle: MonitorHandle,
    mode: MonitorMode,
    callback: MonitorCallback,
) {
    let mut latest: MonitorBatch = BTreeMap::new();

    while let Some(batch) = batches.recv().await {
        if handle.is_cancelled() {
            break;
        }

        let mut changed = MonitorBatch::new();
        for raw in batch {
            if !handle.tags().contains(&raw.tag) {
                continue;
            }
            let event = into_event(raw);
            latest.insert(event.tag.clone(), event.clone());
            changed.insert(event.tag.clone(), event);
        }
        if changed.is_empty() {
            continue;
        }

        match mode {
            MonitorMode::Snapshot => callback(&latest, &handle),
            MonitorMode::Changes => callback(&changed, &handle),
        }
    }

    tracing::trace!(monitor = %handle.id(), "Delivery finished");
}

/// Marks the client not connected once the server leaves the running state.
fn spawn_watcher(shared: &Arc<Shared>, session: Arc<dyn Session>, generation: u64) -> JoinHandle<()> {
    let weak = Arc::downgrade(shared);
    let mut state = session.state();

    tokio::spawn(async move {
        let reason = loop {
            let current = state.borrow_and_update().clone();
            if let ServerState::Lost { reason } = current {
                break reason;
            }
            if state.changed().await.is_err() {
                break "session state channel closed".to_string();
            }
        };

        let Some(shared) = weak.upgrade() else {
            return;
        };
        if shared.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        if shared.connected.swap(false, Ordering::SeqCst) {
            tracing::warn!(address = %shared.address, reason = %reason, "Server connection lost");
            let _ = shared.events.send(ClientEvent::ServerConnectionLost { reason });
        }
    })
}
