// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Live client registry.
//!
//! [`ClientRegistry`] maps each [`SourceAddress`] to at most one live client
//! and is the single source of truth for "is this source usable". It is an
//! ordinary owned component: the runtime constructs one, shares it as
//! `Arc<ClientRegistry>` with the supervisor and adapters, and disposes it at
//! shutdown.
//!
//! # Concurrency
//!
//! ```text
//!   get(a) ──────────────▶ DashMap shard read (never waits on a connect)
//!
//!   lock(a) ─▶ per-address tokio Mutex ─▶ connect / upsert / remove ─▶ unlock
//!   lock(b) ─▶ independent Mutex        ─▶ proceeds in parallel with a
//! ```
//!
//! Replacing or removing an entry always disposes the previous client. The
//! dispose of a replaced client runs in the background because it is no
//! longer reachable from the registry.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinSet;

use crate::client::Client;
use crate::types::SourceAddress;

/// Default grace period for disposing a single client.
pub const DEFAULT_DISPOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Exclusive scope for connect-or-replace operations on one address.
pub type AddressGuard = OwnedMutexGuard<()>;

// =============================================================================
// ClientRegistry
// =============================================================================

/// Concurrent map from source address to its live client.
pub struct ClientRegistry {
    /// Live clients.
    clients: DashMap<SourceAddress, Arc<dyn Client>>,

    /// Per-address mutual exclusion scopes.
    locks: DashMap<SourceAddress, Arc<Mutex<()>>>,

    /// Grace period for each dispose.
    dispose_timeout: Duration,
}

impl ClientRegistry {
    /// Creates an empty registry with the default dispose grace.
    pub fn new() -> Self {
        Self::with_dispose_timeout(DEFAULT_DISPOSE_TIMEOUT)
    }

    /// Creates an empty registry with a custom dispose grace.
    pub fn with_dispose_timeout(dispose_timeout: Duration) -> Self {
        Self {
            clients: DashMap::new(),
            locks: DashMap::new(),
            dispose_timeout,
        }
    }

    /// Returns the dispose grace period.
    pub fn dispose_timeout(&self) -> Duration {
        self.dispose_timeout
    }

    /// Acquires the exclusive scope for `address`.
    ///
    /// Hold the guard for the whole connect-or-replace sequence.
    pub async fn lock(&self, address: &SourceAddress) -> AddressGuard {
        let mutex = self
            .locks
            .entry(address.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Returns the client for `address`, if any.
    pub fn get(&self, address: &SourceAddress) -> Option<Arc<dyn Client>> {
        self.clients.get(address).map(|entry| entry.value().clone())
    }

    /// Returns the client for `address` only if it is connected.
    pub fn get_connected(&self, address: &SourceAddress) -> Option<Arc<dyn Client>> {
        self.get(address).filter(|client| client.is_connected())
    }

    /// Installs `client` for `address`, disposing any previous entry.
    ///
    /// Returns `true` if an entry was replaced.
    pub fn upsert(&self, address: &SourceAddress, client: Arc<dyn Client>) -> bool {
        match self.clients.insert(address.clone(), client) {
            Some(previous) => {
                tracing::debug!(address = %address, "Replacing registered client");
                let grace = self.dispose_timeout;
                let address = address.clone();
                tokio::spawn(async move {
                    if !dispose_with_grace(previous, grace).await {
                        tracing::warn!(
                            address = %address,
                            grace = ?grace,
                            "Replaced client did not dispose within grace period"
                        );
                    }
                });
                true
            }
            None => {
                tracing::debug!(address = %address, "Registered client");
                false
            }
        }
    }

    /// Removes and disposes the client for `address`.
    ///
    /// Waits at most the dispose grace period; a slow dispose keeps running
    /// in the background.
    pub async fn remove(&self, address: &SourceAddress) -> Option<Arc<dyn Client>> {
        let (_, client) = self.clients.remove(address)?;

        if !dispose_with_grace(client.clone(), self.dispose_timeout).await {
            tracing::warn!(
                address = %address,
                grace = ?self.dispose_timeout,
                "Client did not dispose within grace period"
            );
        }

        tracing::info!(address = %address, "Removed client from registry");
        Some(client)
    }

    /// Removes and disposes every client, waiting at most `grace` overall.
    ///
    /// Returns the number of clients whose dispose finished in time.
    pub async fn dispose_all(&self, grace: Duration) -> usize {
        let addresses = self.addresses();
        let mut tasks = JoinSet::new();

        for address in addresses {
            if let Some((_, client)) = self.clients.remove(&address) {
                tasks.spawn(async move { client.dispose().await });
            }
        }

        let total = tasks.len();
        let mut finished = 0;
        let deadline = tokio::time::Instant::now() + grace;

        while !tasks.is_empty() {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(_)) => finished += 1,
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        pending = total - finished,
                        grace = ?grace,
                        "Shutdown grace elapsed with clients still disposing"
                    );
                    tasks.detach_all();
                    break;
                }
            }
        }

        tracing::info!(disposed = finished, total = total, "Disposed all clients");
        finished
    }

    /// Returns `true` if a client is registered for `address`.
    pub fn contains(&self, address: &SourceAddress) -> bool {
        self.clients.contains_key(address)
    }

    /// Returns the registered addresses.
    pub fn addresses(&self) -> Vec<SourceAddress> {
        self.clients.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Returns the number of registered clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if no clients are registered.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("client_count", &self.clients.len())
            .field("dispose_timeout", &self.dispose_timeout)
            .finish()
    }
}

/// Disposes `client` on a separate task and waits at most `grace`.
///
/// Returns `false` if the grace period elapsed first; the dispose keeps
/// running in the background.
pub async fn dispose_with_grace(client: Arc<dyn Client>, grace: Duration) -> bool {
    let task = tokio::spawn(async move { client.dispose().await });
    matches!(tokio::time::timeout(grace, task).await, Ok(Ok(())))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientEvent, ClientStatsSnapshot, MonitorCallback, MonitorHandle, MonitorMode};
    use crate::error::{ClientError, ClientResult};
    use crate::types::{ClientKind, ConnectionStatus, ReadEvent, TagId};
    use crate::value::Value;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::broadcast;

    /// Mock client counting disposals.
    struct MockClient {
        address: SourceAddress,
        connected: AtomicBool,
        disposals: Arc<AtomicUsize>,
        dispose_delay: Duration,
        events: broadcast::Sender<ClientEvent>,
    }

    impl MockClient {
        fn new(address: &SourceAddress, disposals: Arc<AtomicUsize>) -> Arc<Self> {
            Self::slow(address, disposals, Duration::ZERO)
        }

        fn slow(address: &SourceAddress, disposals: Arc<AtomicUsize>, delay: Duration) -> Arc<Self> {
            let (events, _) = broadcast::channel(4);
            Arc::new(Self {
                address: address.clone(),
                connected: AtomicBool::new(true),
                disposals,
                dispose_delay: delay,
                events,
            })
        }
    }

    #[async_trait]
    impl Client for MockClient {
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
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn dispose(&self) {
            tokio::time::sleep(self.dispose_delay).await;
            self.connected.store(false, Ordering::SeqCst);
            self.disposals.fetch_add(1, Ordering::SeqCst);
        }

        async fn read(&self, tag: &TagId) -> ClientResult<ReadEvent> {
            Err(ClientError::not_connected(tag.as_str()))
        }

        async fn write(&self, _tag: &TagId, _value: Value) -> ClientResult<()> {
            Ok(())
        }

        async fn monitor_with(
            &self,
            _tags: &[TagId],
            _mode: MonitorMode,
            _callback: MonitorCallback,
        ) -> ClientResult<MonitorHandle> {
            Err(ClientError::invalid_request("unsupported"))
        }

        fn events(&self) -> broadcast::Receiver<ClientEvent> {
            self.events.subscribe()
        }

        fn stats(&self) -> ClientStatsSnapshot {
            ClientStatsSnapshot::default()
        }
    }

    fn address(url: &str) -> SourceAddress {
        SourceAddress::new(url, ClientKind::Unified)
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_disposes_previous() {
        let registry = ClientRegistry::new();
        let addr = address("opc.tcp://a:4840");
        let disposals = Arc::new(AtomicUsize::new(0));

        assert!(!registry.upsert(&addr, MockClient::new(&addr, disposals.clone())));
        assert!(registry.upsert(&addr, MockClient::new(&addr, disposals.clone())));
        assert_eq!(registry.len(), 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(disposals.load(Ordering::SeqCst), 1);
        assert!(registry.get_connected(&addr).is_some());
    }

    #[tokio::test]
    async fn test_remove_disposes_client() {
        let registry = ClientRegistry::new();
        let addr = address("opc.tcp://a:4840");
        let disposals = Arc::new(AtomicUsize::new(0));
        registry.upsert(&addr, MockClient::new(&addr, disposals.clone()));

        let removed = registry.remove(&addr).await;
        assert!(removed.is_some());
        assert!(!registry.contains(&addr));
        assert_eq!(disposals.load(Ordering::SeqCst), 1);

        assert!(registry.remove(&addr).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_bounded_by_grace() {
        let registry = ClientRegistry::with_dispose_timeout(Duration::from_secs(2));
        let addr = address("opc.tcp://slow:4840");
        let disposals = Arc::new(AtomicUsize::new(0));
        registry.upsert(&addr, MockClient::slow(&addr, disposals.clone(), Duration::from_secs(30)));

        let started = tokio::time::Instant::now();
        registry.remove(&addr).await;
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(!registry.contains(&addr));
    }

    #[tokio::test]
    async fn test_lock_is_per_address() {
        let registry = Arc::new(ClientRegistry::new());
        let a = address("opc.tcp://a:4840");
        let b = address("opc.tcp://b:4840");

        let _guard_a = registry.lock(&a).await;
        let guard_b = tokio::time::timeout(Duration::from_millis(50), registry.lock(&b)).await;
        assert!(guard_b.is_ok());

        let second_a = tokio::time::timeout(Duration::from_millis(50), registry.lock(&a)).await;
        assert!(second_a.is_err());
    }

    #[tokio::test]
    async fn test_dispose_all() {
        let registry = ClientRegistry::new();
        let disposals = Arc::new(AtomicUsize::new(0));
        for url in ["opc.tcp://a", "opc.tcp://b", "opc.tcp://c"] {
            let addr = address(url);
            registry.upsert(&addr, MockClient::new(&addr, disposals.clone()));
        }

        let finished = registry.dispose_all(Duration::from_secs(5)).await;
        assert_eq!(finished, 3);
        assert!(registry.is_empty());
        assert_eq!(disposals.load(Ordering::SeqCst), 3);
    }
}
