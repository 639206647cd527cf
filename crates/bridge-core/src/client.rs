// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Protocol-agnostic source client abstraction.
//!
//! Every protocol family implements [`Client`]; the registry, supervisor and
//! adapters only ever see `Arc<dyn Client>`.
//!
//! # State Machine
//!
//! ```text
//!                  connect() ok
//!   NotConnected ───────────────▶ Connected
//!        ▲                            │
//!        └──── dispose() / transport failure
//! ```
//!
//! A client is never repaired in place. When its session is lost the
//! supervisor disposes it and installs a fresh instance.
//!
//! # Monitoring
//!
//! [`Client::monitor`] returns a [`MonitorHandle`]. The handle's
//! [`cancel`](MonitorHandle::cancel) only flags the monitor and schedules the
//! teardown on a separate task, so it is safe to call from inside the
//! delivery callback.
//!
//! # Example
//!
//! ```rust,ignore
//! use bridge_core::client::{monitor_callback, Client, ClientExt};
//!
//! client.connect().await?;
//! let enabled: bool = client.read_as(&"Line.Enabled".into()).await?;
//!
//! let handle = client
//!     .monitor(&tags, monitor_callback(|batch, handle| {
//!         if batch.values().any(|e| !e.is_good()) {
//!             handle.cancel();
//!         }
//!     }))
//!     .await?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::ClientResult;
use crate::types::{ConnectionStatus, ReadEvent, SourceAddress, TagId};
use crate::value::{FromValue, Value};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// =============================================================================
// Client Trait
// =============================================================================

/// The capability interface implemented once per protocol family.
#[async_trait]
pub trait Client: Send + Sync {
    // =========================================================================
    // Identification
    // =========================================================================

    /// Returns the address this client is bound to.
    fn address(&self) -> &SourceAddress;

    /// Returns the current connection status.
    fn status(&self) -> ConnectionStatus;

    /// Returns `true` if currently connected.
    fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    // =========================================================================
    // Connection Management
    // =========================================================================

    /// Establishes a session.
    ///
    /// No-op when already connected. On failure the status stays
    /// `NotConnected` and a `ClientError::Connection` is returned.
    async fn connect(&self) -> ClientResult<()>;

    /// Releases all monitors and the session.
    ///
    /// Monitors are torn down before the session is closed. Safe to call any
    /// number of times; afterwards the status is `NotConnected`. Failures are
    /// logged and swallowed.
    async fn dispose(&self);

    // =========================================================================
    // Data Operations
    // =========================================================================

    /// Reads the current snapshot of a tag.
    ///
    /// # Errors
    ///
    /// - `ClientError::NotConnected` - Client is not connected
    /// - `ClientError::Connection` - Session failed during the read
    async fn read(&self, tag: &TagId) -> ClientResult<ReadEvent>;

    /// Writes a value to a tag.
    ///
    /// # Errors
    ///
    /// - `ClientError::NotConnected` - Client is not connected
    /// - `ClientError::Protocol` - The remote rejected the write
    async fn write(&self, tag: &TagId, value: Value) -> ClientResult<()>;

    /// Reports the runtime type name of a tag's current value.
    async fn data_type(&self, tag: &TagId) -> ClientResult<&'static str> {
        Ok(self.read(tag).await?.value.type_name())
    }

    // =========================================================================
    // Monitoring
    // =========================================================================

    /// Subscribes to changes of `tags` with the given delivery mode.
    ///
    /// Duplicate tags are collapsed. An empty list is rejected with
    /// `ClientError::InvalidRequest`.
    async fn monitor_with(
        &self,
        tags: &[TagId],
        mode: MonitorMode,
        callback: MonitorCallback,
    ) -> ClientResult<MonitorHandle>;

    /// Subscribes to changes of `tags`, delivering the latest value of every
    /// monitored tag on each change batch.
    async fn monitor(&self, tags: &[TagId], callback: MonitorCallback) -> ClientResult<MonitorHandle> {
        self.monitor_with(tags, MonitorMode::Snapshot, callback).await
    }

    // =========================================================================
    // Observability
    // =========================================================================

    /// Subscribes to lifecycle events of this client.
    fn events(&self) -> broadcast::Receiver<ClientEvent>;

    /// Returns a snapshot of the client's counters.
    fn stats(&self) -> ClientStatsSnapshot;
}

// =============================================================================
// ClientExt
// =============================================================================

/// Typed helpers available on every client.
#[async_trait]
pub trait ClientExt: Client {
    /// Reads a tag and casts its value to `T`.
    ///
    /// # Errors
    ///
    /// `ClientError::TagCast` if the runtime type is incompatible with `T`,
    /// plus every error of [`Client::read`].
    async fn read_as<T>(&self, tag: &TagId) -> ClientResult<T>
    where
        T: FromValue + Send,
    {
        self.read(tag).await?.get::<T>()
    }

    /// Subscribes in [`MonitorMode::Changes`]: only the tags of the current
    /// batch are delivered.
    async fn monitor_changes(
        &self,
        tags: &[TagId],
        callback: MonitorCallback,
    ) -> ClientResult<MonitorHandle> {
        self.monitor_with(tags, MonitorMode::Changes, callback).await
    }
}

impl<C: Client + ?Sized> ClientExt for C {}

// =============================================================================
// ClientFactory
// =============================================================================

/// Creates clients for source addresses.
///
/// The factory is where the protocol family of an address is turned into a
/// concrete client; it is the only place that matches on [`ClientKind`](crate::types::ClientKind).
pub trait ClientFactory: Send + Sync {
    /// Creates a new, not yet connected client for `address`.
    fn create(&self, address: &SourceAddress) -> ClientResult<Arc<dyn Client>>;
}

// =============================================================================
// ClientEvent
// =============================================================================

/// Lifecycle events emitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    /// A session was established.
    Connected,

    /// The client was disposed.
    Disposed,

    /// The server stopped reporting a running state.
    ServerConnectionLost {
        /// Reported reason.
        reason: String,
    },
}

// =============================================================================
// Monitoring Types
// =============================================================================

/// Latest value per tag, as delivered to monitor callbacks.
pub type MonitorBatch = BTreeMap<TagId, ReadEvent>;

/// Callback invoked on every change batch.
///
/// Runs on the monitor's delivery task; it must not block.
pub type MonitorCallback = Arc<dyn Fn(&MonitorBatch, &MonitorHandle) + Send + Sync>;

/// Wraps a closure as a [`MonitorCallback`].
pub fn monitor_callback<F>(f: F) -> MonitorCallback
where
    F: Fn(&MonitorBatch, &MonitorHandle) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// How change batches are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MonitorMode {
    /// The latest value of every monitored tag, once any of them changes.
    #[default]
    Snapshot,

    /// Only the tags contained in the current change batch.
    Changes,
}

/// Unique identifier of a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonitorId(Uuid);

impl MonitorId {
    /// Generates a new random ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MonitorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deferred teardown of a monitor.
pub type Teardown = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Handle to an active monitor.
///
/// Cloning shares the same monitor. Dropping the handle does not cancel the
/// monitor; it lives until [`cancel`](Self::cancel) or client disposal.
#[derive(Clone)]
pub struct MonitorHandle {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    id: MonitorId,
    tags: Vec<TagId>,
    cancelled: AtomicBool,
    teardown: Mutex<Option<Teardown>>,
    runtime: tokio::runtime::Handle,
}

impl MonitorHandle {
    /// Creates a handle whose teardown runs on the current runtime.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(tags: Vec<TagId>, teardown: Teardown) -> Self {
        Self::with_runtime(tags, teardown, tokio::runtime::Handle::current())
    }

    /// Creates a handle whose teardown runs on `runtime`.
    pub fn with_runtime(tags: Vec<TagId>, teardown: Teardown, runtime: tokio::runtime::Handle) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                id: MonitorId::new(),
                tags,
                cancelled: AtomicBool::new(false),
                teardown: Mutex::new(Some(teardown)),
                runtime,
            }),
        }
    }

    /// Returns the monitor ID.
    pub fn id(&self) -> MonitorId {
        self.inner.id
    }

    /// Returns the monitored tags, deduplicated, in request order.
    pub fn tags(&self) -> &[TagId] {
        &self.inner.tags
    }

    /// Returns `true` once cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Cancels the monitor without waiting for the teardown.
    ///
    /// Safe to call from inside the delivery callback and from any thread.
    /// Only the first call has an effect.
    pub fn cancel(&self) {
        if let Some(teardown) = self.take_teardown() {
            self.inner.runtime.spawn(teardown());
        }
    }

    /// Cancels the monitor and waits for the teardown to finish.
    ///
    /// Must not be awaited from inside the delivery callback.
    pub async fn close(&self) {
        if let Some(teardown) = self.take_teardown() {
            teardown().await;
        }
    }

    fn take_teardown(&self) -> Option<Teardown> {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return None;
        }
        self.inner.teardown.lock().take()
    }
}

impl fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("id", &self.inner.id)
            .field("tags", &self.inner.tags)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Removes duplicate tags, keeping the first occurrence.
pub fn dedup_tags(tags: &[TagId]) -> Vec<TagId> {
    let mut seen = std::collections::HashSet::with_capacity(tags.len());
    tags.iter()
        .filter(|tag| seen.insert((*tag).clone()))
        .cloned()
        .collect()
}

// =============================================================================
// ClientStats
// =============================================================================

/// Per-client counters.
#[derive(Debug, Default)]
pub struct ClientStats {
    reads: AtomicU64,
    writes: AtomicU64,
    failures: AtomicU64,
    active_monitors: AtomicU64,
    connects: AtomicU64,
}

impl ClientStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a read.
    pub fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a write.
    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed operation.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an established session.
    pub fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a monitor start.
    pub fn monitor_started(&self) {
        self.active_monitors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a monitor stop.
    pub fn monitor_stopped(&self) {
        let _ = self
            .active_monitors
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }

    /// Returns a snapshot of the counters.
    pub fn snapshot(&self) -> ClientStatsSnapshot {
        ClientStatsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            active_monitors: self.active_monitors.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ClientStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientStatsSnapshot {
    /// Reads performed.
    pub reads: u64,
    /// Writes performed.
    pub writes: u64,
    /// Failed operations.
    pub failures: u64,
    /// Monitors currently active.
    pub active_monitors: u64,
    /// Sessions established.
    pub connects: u64,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counting_teardown(counter: Arc<AtomicUsize>) -> Teardown {
        Box::new(move || {
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test]
    async fn test_cancel_runs_teardown_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = MonitorHandle::new(vec![TagId::new("A.B")], counting_teardown(counter.clone()));

        handle.cancel();
        handle.cancel();
        handle.clone().cancel();
        assert!(handle.is_cancelled());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_awaits_teardown() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = MonitorHandle::new(vec![], counting_teardown(counter.clone()));

        handle.close().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        handle.close().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_from_foreign_thread() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = MonitorHandle::with_runtime(
            vec![],
            counting_teardown(counter.clone()),
            runtime.handle().clone(),
        );

        std::thread::spawn(move || handle.cancel()).join().unwrap();
        runtime.block_on(async { tokio::time::sleep(Duration::from_millis(20)).await });
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dedup_tags_keeps_order() {
        let tags = vec![
            TagId::new("B"),
            TagId::new("A"),
            TagId::new("B"),
            TagId::new("C"),
        ];
        let unique = dedup_tags(&tags);
        assert_eq!(unique, vec![TagId::new("B"), TagId::new("A"), TagId::new("C")]);
    }

    #[test]
    fn test_stats_monitor_counter_saturates() {
        let stats = ClientStats::new();
        stats.monitor_stopped();
        stats.monitor_started();
        stats.monitor_started();
        stats.monitor_stopped();
        assert_eq!(stats.snapshot().active_monitors, 1);
    }
}
