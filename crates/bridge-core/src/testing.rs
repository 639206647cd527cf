// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Scripted clients for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::client::{
    Client, ClientEvent, ClientFactory, ClientStatsSnapshot, MonitorCallback, MonitorHandle,
    MonitorMode,
};
use crate::error::{ClientError, ClientResult};
use crate::types::{ConnectionStatus, ReadEvent, SourceAddress, StatusCode, TagId};
use crate::value::Value;

/// Behaviour shared by every client created for one source.
#[derive(Default)]
pub struct ScriptedSource {
    pub reachable: AtomicBool,
    pub connect_delay: Mutex<Duration>,
    pub connects: AtomicUsize,
    pub disposals: AtomicUsize,
    pub created: AtomicUsize,
    pub clients: Mutex<Vec<Arc<ScriptedClient>>>,
}

impl ScriptedSource {
    pub fn new(reachable: bool) -> Arc<Self> {
        let source = Self::default();
        source.reachable.store(reachable, Ordering::SeqCst);
        Arc::new(source)
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock() = delay;
    }
}

pub struct ScriptedClient {
    address: SourceAddress,
    source: Arc<ScriptedSource>,
    connected: AtomicBool,
    events: broadcast::Sender<ClientEvent>,
}

impl ScriptedClient {
    /// Simulates a transport failure on the live session.
    pub fn drop_session(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Client for ScriptedClient {
    fn address(&self) -> &SourceAddress {
        &self.address
    }

    fn status(&self) -> ConnectionStatus {
        if self.connected.load(Ordering::SeqCst) {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::NotConnected
        }
    }

    async fn connect(&self) -> ClientResult<()> {
        if self.is_connected() {
            return Ok(());
        }
        let delay = *self.source.connect_delay.lock();
        tokio::time::sleep(delay).await;
        if !self.source.reachable.load(Ordering::SeqCst) {
            return Err(ClientError::connection(self.address.url(), "unreachable"));
        }
        self.source.connects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn dispose(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.source.disposals.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn read(&self, tag: &TagId) -> ClientResult<ReadEvent> {
        if !self.is_connected() {
            return Err(ClientError::not_connected(self.address.url()));
        }
        Ok(ReadEvent::new(tag.clone(), Value::Null, StatusCode::GOOD))
    }

    async fn write(&self, _tag: &TagId, _value: Value) -> ClientResult<()> {
        Ok(())
    }

    async fn monitor_with(
        &self,
        tags: &[TagId],
        _mode: MonitorMode,
        _callback: MonitorCallback,
    ) -> ClientResult<MonitorHandle> {
        Ok(MonitorHandle::new(
            tags.to_vec(),
            Box::new(|| Box::pin(async {})),
        ))
    }

    fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    fn stats(&self) -> ClientStatsSnapshot {
        ClientStatsSnapshot::default()
    }
}

/// Factory creating [`ScriptedClient`]s for a single source.
pub struct ScriptedFactory {
    pub source: Arc<ScriptedSource>,
}

impl ClientFactory for ScriptedFactory {
    fn create(&self, address: &SourceAddress) -> ClientResult<Arc<dyn Client>> {
        let (events, _) = broadcast::channel(4);
        let client = Arc::new(ScriptedClient {
            address: address.clone(),
            source: self.source.clone(),
            connected: AtomicBool::new(false),
            events,
        });
        self.source.created.fetch_add(1, Ordering::SeqCst);
        self.source.clients.lock().push(client.clone());
        Ok(client)
    }
}
