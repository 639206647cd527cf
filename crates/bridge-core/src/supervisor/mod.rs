// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Connection supervision.
//!
//! Every configured source gets two recurring tasks, Ping and Patrol, of
//! which exactly one is active at a time.
//!
//! # Health State Machine
//!
//! ```text
//!                     ping: connect ok (install client, run adapters)
//!                     ping: registry already holds a connected client
//!        ┌─────────────┐ ─────────────────────────────▶ ┌───────────┐
//!        │ UNREACHABLE │                                 │ REACHABLE │
//!        │ ping active │ ◀───────────────────────────── │ patrol    │
//!        └─────────────┘  patrol: probe failed/timed out └───────────┘
//!                          or live client lost its session
//!                          (remove + dispose registry entry)
//! ```
//!
//! Connect-or-replace sequences hold the registry's per-address lock, so
//! unrelated sources reconnect independently. Every failure is converted to
//! a transition here; nothing escapes to the scheduler.
//!
//! Each `start` opens a new epoch and `stop` closes it. A cycle only installs
//! clients, runs adapters and records transitions for the epoch it was
//! started in; a Ping whose connect completes after `stop` disposes its
//! client instead.

mod bounded;

pub use bounded::{connect_bounded, probe_bounded};

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::client::ClientFactory;
use crate::dispatcher::AdaptationDispatcher;
use crate::error::{BridgeResult, ClientError};
use crate::registry::{dispose_with_grace, ClientRegistry};
use crate::scheduler::{RecurringTask, TaskKey, TaskKind, TaskScheduler};
use crate::types::SourceAddress;

// =============================================================================
// Configuration
// =============================================================================

/// Timing of the supervision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Interval of both Ping and Patrol.
    pub interval: Duration,
    /// Bound on a connect attempt and on a liveness probe.
    pub connect_timeout: Duration,
    /// Bound on disposing a removed client.
    pub dispose_timeout: Duration,
    /// Bound on disposing every client at shutdown.
    pub shutdown_grace: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            dispose_timeout: Duration::from_secs(2),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

// =============================================================================
// Health types
// =============================================================================

/// Health of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Ping active, Patrol paused.
    #[default]
    Unreachable,

    /// Patrol active, Ping paused.
    Reachable,
}

impl HealthState {
    /// Returns the task that is active in this state.
    pub fn active_task(&self) -> TaskKind {
        match self {
            HealthState::Unreachable => TaskKind::Ping,
            HealthState::Reachable => TaskKind::Patrol,
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Unreachable => write!(f, "UNREACHABLE"),
            HealthState::Reachable => write!(f, "REACHABLE"),
        }
    }
}

/// Outcome of a Ping cycle.
#[derive(Debug, Clone)]
pub enum PingOutcome {
    /// The registry already held a connected client; no adapters ran.
    AlreadyConnected,

    /// A new client was installed and the bound adapters were invoked.
    Connected {
        /// Adapters invoked.
        adapters: usize,
    },

    /// Connect failed or timed out; the source stays unreachable.
    Failed(ClientError),

    /// Supervision stopped while connecting; the new client was disposed.
    Stopped,
}

/// Outcome of a Patrol cycle.
#[derive(Debug, Clone)]
pub enum PatrolOutcome {
    /// The source is alive.
    Alive,

    /// The source was lost; its client was removed.
    Lost(ClientError),
}

/// Health of one source, for introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceHealth {
    /// Source URL.
    pub url: String,
    /// Current state.
    pub state: HealthState,
    /// `true` if the registry holds a connected client.
    pub connected: bool,
}

// =============================================================================
// Supervisor
// =============================================================================

/// Runs Ping and Patrol for every configured source.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<SupervisorInner>,
}

struct SupervisorInner {
    config: SupervisorConfig,
    registry: Arc<ClientRegistry>,
    factory: Arc<dyn ClientFactory>,
    dispatcher: Arc<AdaptationDispatcher>,
    scheduler: TaskScheduler,
    states: DashMap<SourceAddress, HealthState>,
    epoch: Mutex<u64>,
}

impl Supervisor {
    /// Creates a supervisor. No tasks run until [`start`](Self::start).
    pub fn new(
        config: SupervisorConfig,
        registry: Arc<ClientRegistry>,
        factory: Arc<dyn ClientFactory>,
        dispatcher: Arc<AdaptationDispatcher>,
    ) -> Self {
        Self {
            inner: Arc::new(SupervisorInner {
                config,
                registry,
                factory,
                dispatcher,
                scheduler: TaskScheduler::new(),
                states: DashMap::new(),
                epoch: Mutex::new(0),
            }),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SupervisorConfig {
        &self.inner.config
    }

    /// Returns the registry.
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.inner.registry
    }

    /// Schedules Ping (active) and Patrol (paused) for every source.
    ///
    /// Any previous schedule is cleared and any registered client disposed
    /// first, so calling `start` again rebuilds supervision from scratch.
    pub async fn start(&self, sources: &[SourceAddress]) -> BridgeResult<()> {
        self.stop().await;

        let inner = &self.inner;
        let epoch = inner.current_epoch();
        for address in sources {
            inner.states.insert(address.clone(), HealthState::Unreachable);

            let ping = Arc::new(HealthTask {
                supervisor: Arc::downgrade(inner),
                address: address.clone(),
                kind: TaskKind::Ping,
                epoch,
            });
            let patrol = Arc::new(HealthTask {
                supervisor: Arc::downgrade(inner),
                address: address.clone(),
                kind: TaskKind::Patrol,
                epoch,
            });

            inner
                .scheduler
                .schedule(TaskKey::ping(address), inner.config.interval, false, ping)?;
            inner
                .scheduler
                .schedule(TaskKey::patrol(address), inner.config.interval, true, patrol)?;
        }

        tracing::info!(
            sources = sources.len(),
            interval = ?inner.config.interval,
            "Connection supervisor started"
        );
        Ok(())
    }

    /// Clears every scheduled task and disposes every registered client.
    ///
    /// Waits at most the shutdown grace for the disposals. Cycles still in
    /// flight belong to the closed epoch and can no longer install clients.
    pub async fn stop(&self) {
        let inner = &self.inner;
        *inner.epoch.lock() += 1;
        if inner.scheduler.is_empty() && inner.registry.is_empty() {
            return;
        }
        inner.scheduler.clear();
        inner.states.clear();
        inner.registry.dispose_all(inner.config.shutdown_grace).await;
        tracing::info!("Connection supervisor stopped");
    }

    /// Runs one Ping cycle for `address`.
    pub async fn ping(&self, address: &SourceAddress) -> PingOutcome {
        let epoch = self.inner.current_epoch();
        self.inner.ping(address, epoch).await
    }

    /// Runs one Patrol cycle for `address`.
    pub async fn patrol(&self, address: &SourceAddress) -> PatrolOutcome {
        let epoch = self.inner.current_epoch();
        self.inner.patrol(address, epoch).await
    }

    /// Returns the health of `address`, if supervised.
    pub fn health(&self, address: &SourceAddress) -> Option<HealthState> {
        self.inner.states.get(address).map(|s| *s)
    }

    /// Returns which task is unpaused for `address`.
    ///
    /// `None` if the source is not scheduled or, transiently, during a
    /// pause-to-resume handoff.
    pub fn active_task(&self, address: &SourceAddress) -> Option<TaskKind> {
        let scheduler = &self.inner.scheduler;
        let ping = scheduler.is_paused(&TaskKey::ping(address))?;
        let patrol = scheduler.is_paused(&TaskKey::patrol(address))?;
        match (ping, patrol) {
            (false, true) => Some(TaskKind::Ping),
            (true, false) => Some(TaskKind::Patrol),
            _ => None,
        }
    }

    /// Returns the health of every supervised source.
    pub fn snapshot(&self) -> Vec<SourceHealth> {
        let mut health: Vec<SourceHealth> = self
            .inner
            .states
            .iter()
            .map(|entry| SourceHealth {
                url: entry.key().url().to_string(),
                state: *entry.value(),
                connected: self.inner.registry.get_connected(entry.key()).is_some(),
            })
            .collect();
        health.sort_by(|a, b| a.url.cmp(&b.url));
        health
    }
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("config", &self.inner.config)
            .field("sources", &self.inner.states.len())
            .field("scheduled", &self.inner.scheduler.len())
            .finish()
    }
}

impl SupervisorInner {
    fn current_epoch(&self) -> u64 {
        *self.epoch.lock()
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.current_epoch() == epoch
    }

    async fn ping(&self, address: &SourceAddress, epoch: u64) -> PingOutcome {
        let guard = self.registry.lock(address).await;

        if self.registry.get_connected(address).is_some() {
            drop(guard);
            self.mark_reachable(address, epoch);
            return PingOutcome::AlreadyConnected;
        }

        let client = match self.factory.create(address) {
            Ok(client) => client,
            Err(e) => {
                drop(guard);
                tracing::error!(address = %address, error = %e, "Cannot create client");
                self.mark_unreachable(address, epoch);
                return PingOutcome::Failed(e);
            }
        };

        if let Err(e) = connect_bounded(client.clone(), self.config.connect_timeout).await {
            drop(guard);
            tracing::warn!(address = %address, error = %e, "Ping failed");
            self.mark_unreachable(address, epoch);
            return PingOutcome::Failed(e);
        }

        // Checked and installed under the epoch lock so `stop` either sees
        // the client in the registry or this cycle sees the closed epoch.
        let installed = {
            let current = self.epoch.lock();
            if *current == epoch {
                self.registry.upsert(address, client.clone());
                true
            } else {
                false
            }
        };
        drop(guard);

        if !installed {
            tracing::info!(address = %address, "Supervision stopped during connect, disposing client");
            dispose_with_grace(client, self.config.dispose_timeout).await;
            return PingOutcome::Stopped;
        }

        self.mark_reachable(address, epoch);
        if !self.is_current(epoch) {
            return PingOutcome::Stopped;
        }

        let report = self.dispatcher.dispatch(address, client).await;
        PingOutcome::Connected {
            adapters: report.invoked,
        }
    }

    async fn patrol(&self, address: &SourceAddress, epoch: u64) -> PatrolOutcome {
        let probe = match self.factory.create(address) {
            Ok(probe) => probe_bounded(probe, self.config.connect_timeout).await,
            Err(e) => Err(e),
        };

        let result = probe.and_then(|()| match self.registry.get(address) {
            Some(client) if client.is_connected() => Ok(()),
            _ => Err(ClientError::not_connected(address.url())),
        });

        match result {
            Ok(()) => {
                tracing::trace!(address = %address, "Patrol ok");
                PatrolOutcome::Alive
            }
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "Patrol failed, source lost");
                let _guard = self.registry.lock(address).await;
                if !self.is_current(epoch) {
                    return PatrolOutcome::Lost(e);
                }
                self.registry.remove(address).await;
                self.mark_unreachable(address, epoch);
                PatrolOutcome::Lost(e)
            }
        }
    }

    fn mark_reachable(&self, address: &SourceAddress, epoch: u64) {
        self.scheduler.pause(&TaskKey::ping(address));
        self.scheduler.resume(&TaskKey::patrol(address));
        self.transition(address, HealthState::Reachable, epoch);
    }

    fn mark_unreachable(&self, address: &SourceAddress, epoch: u64) {
        self.scheduler.pause(&TaskKey::patrol(address));
        self.scheduler.resume(&TaskKey::ping(address));
        self.transition(address, HealthState::Unreachable, epoch);
    }

    fn transition(&self, address: &SourceAddress, state: HealthState, epoch: u64) {
        if !self.is_current(epoch) {
            return;
        }
        let previous = self.states.insert(address.clone(), state);
        if previous != Some(state) {
            tracing::info!(
                address = %address,
                from = ?previous,
                to = %state,
                "Source health changed"
            );
        }
    }
}

// =============================================================================
// HealthTask
// =============================================================================

/// Scheduled body of Ping or Patrol.
struct HealthTask {
    supervisor: Weak<SupervisorInner>,
    address: SourceAddress,
    kind: TaskKind,
    epoch: u64,
}

#[async_trait]
impl RecurringTask for HealthTask {
    async fn run(&self) {
        let Some(supervisor) = self.supervisor.upgrade() else {
            return;
        };
        match self.kind {
            TaskKind::Ping => {
                supervisor.ping(&self.address, self.epoch).await;
            }
            TaskKind::Patrol => {
                supervisor.patrol(&self.address, self.epoch).await;
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::dispatcher::Adapter;
    use crate::error::BridgeError;
    use crate::testing::{ScriptedFactory, ScriptedSource};
    use crate::types::ClientKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAdapter {
        address: SourceAddress,
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Adapter for CountingAdapter {
        fn name(&self) -> &str {
            "counting"
        }

        fn address(&self) -> &SourceAddress {
            &self.address
        }

        async fn adapt(&self, _client: Arc<dyn Client>) -> BridgeResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(BridgeError::adapter("counting", "boom"));
            }
            Ok(())
        }
    }

    fn address() -> SourceAddress {
        SourceAddress::new("opcda://192.168.0.153/Matrikon.OPC.Simulation.1", ClientKind::Classic)
    }

    fn supervisor(source: Arc<ScriptedSource>, adapters: Vec<Arc<CountingAdapter>>) -> Supervisor {
        let mut dispatcher = AdaptationDispatcher::new();
        for adapter in adapters {
            dispatcher.register(adapter);
        }
        Supervisor::new(
            SupervisorConfig::default(),
            Arc::new(ClientRegistry::new()),
            Arc::new(ScriptedFactory { source }),
            Arc::new(dispatcher),
        )
    }

    fn adapter(fail: bool) -> Arc<CountingAdapter> {
        Arc::new(CountingAdapter {
            address: address(),
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_activates_ping_only() {
        let source = ScriptedSource::new(false);
        let sup = supervisor(source, vec![]);
        sup.start(&[address()]).await.unwrap();

        assert_eq!(sup.health(&address()), Some(HealthState::Unreachable));
        assert_eq!(sup.active_task(&address()), Some(TaskKind::Ping));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_success_installs_client_and_runs_adapters() {
        let source = ScriptedSource::new(true);
        source.set_connect_delay(Duration::from_millis(1200));
        let bound = adapter(false);
        let sup = supervisor(source, vec![bound.clone()]);
        sup.start(&[address()]).await.unwrap();

        let outcome = sup.ping(&address()).await;
        assert!(matches!(outcome, PingOutcome::Connected { adapters: 1 }));
        assert!(sup.registry().get_connected(&address()).is_some());
        assert_eq!(sup.health(&address()), Some(HealthState::Reachable));
        assert_eq!(sup.active_task(&address()), Some(TaskKind::Patrol));
        assert_eq!(bound.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_with_connected_client_skips_adapters() {
        let source = ScriptedSource::new(true);
        let bound = adapter(false);
        let sup = supervisor(source.clone(), vec![bound.clone()]);
        sup.start(&[address()]).await.unwrap();

        sup.ping(&address()).await;
        let outcome = sup.ping(&address()).await;

        assert!(matches!(outcome, PingOutcome::AlreadyConnected));
        assert_eq!(bound.calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_timeout_stays_unreachable() {
        let source = ScriptedSource::new(true);
        source.set_connect_delay(Duration::from_millis(5001));
        let bound = adapter(false);
        let sup = supervisor(source, vec![bound.clone()]);
        sup.start(&[address()]).await.unwrap();

        let outcome = sup.ping(&address()).await;
        assert!(matches!(outcome, PingOutcome::Failed(ClientError::Timeout { .. })));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(sup.registry().get(&address()).is_none());
        assert_eq!(sup.health(&address()), Some(HealthState::Unreachable));
        assert_eq!(sup.active_task(&address()), Some(TaskKind::Ping));
        assert_eq!(bound.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_adapter_keeps_reachable() {
        let source = ScriptedSource::new(true);
        let sup = supervisor(source, vec![adapter(true)]);
        sup.start(&[address()]).await.unwrap();

        sup.ping(&address()).await;
        assert_eq!(sup.health(&address()), Some(HealthState::Reachable));
    }

    #[tokio::test(start_paused = true)]
    async fn test_patrol_failure_removes_client() {
        let source = ScriptedSource::new(true);
        let sup = supervisor(source.clone(), vec![]);
        sup.start(&[address()]).await.unwrap();
        sup.ping(&address()).await;

        assert!(matches!(sup.patrol(&address()).await, PatrolOutcome::Alive));

        source.set_reachable(false);
        let outcome = sup.patrol(&address()).await;
        assert!(matches!(outcome, PatrolOutcome::Lost(_)));
        assert!(sup.registry().get(&address()).is_none());
        assert_eq!(sup.health(&address()), Some(HealthState::Unreachable));
        assert_eq!(sup.active_task(&address()), Some(TaskKind::Ping));
    }

    #[tokio::test(start_paused = true)]
    async fn test_patrol_detects_lost_session() {
        let source = ScriptedSource::new(true);
        let sup = supervisor(source.clone(), vec![]);
        sup.start(&[address()]).await.unwrap();
        sup.ping(&address()).await;

        source.clients.lock()[0].drop_session();
        assert!(matches!(sup.patrol(&address()).await, PatrolOutcome::Lost(_)));
        assert_eq!(sup.health(&address()), Some(HealthState::Unreachable));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_cycle_reaches_and_recovers() {
        let source = ScriptedSource::new(true);
        let bound = adapter(false);
        let sup = supervisor(source.clone(), vec![bound.clone()]);
        sup.start(&[address()]).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sup.health(&address()), Some(HealthState::Reachable));

        source.set_reachable(false);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sup.health(&address()), Some(HealthState::Unreachable));

        source.set_reachable(true);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sup.health(&address()), Some(HealthState::Reachable));
        assert_eq!(bound.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_disposes_clients() {
        let source = ScriptedSource::new(true);
        let sup = supervisor(source.clone(), vec![]);
        sup.start(&[address()]).await.unwrap();
        sup.ping(&address()).await;

        sup.stop().await;
        assert!(sup.registry().is_empty());
        assert_eq!(sup.active_task(&address()), None);
        assert_eq!(source.disposals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_connect_disposes_late_client() {
        let source = ScriptedSource::new(true);
        source.set_connect_delay(Duration::from_secs(3));
        let bound = adapter(false);
        let sup = supervisor(source.clone(), vec![bound.clone()]);
        sup.start(&[address()]).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        sup.stop().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(sup.registry().is_empty());
        assert_eq!(sup.health(&address()), None);
        assert_eq!(bound.calls.load(Ordering::SeqCst), 0);
        assert!(source.clients.lock().iter().all(|client| !client.is_connected()));
        assert_eq!(source.disposals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_after_stop_is_not_installed() {
        let source = ScriptedSource::new(true);
        source.set_connect_delay(Duration::from_secs(1));
        let sup = supervisor(source.clone(), vec![]);
        sup.start(&[address()]).await.unwrap();

        let inner = sup.inner.clone();
        let epoch = inner.current_epoch();
        let cycle = tokio::spawn(async move { inner.ping(&address(), epoch).await });
        tokio::task::yield_now().await;
        sup.stop().await;

        assert!(matches!(cycle.await.unwrap(), PingOutcome::Stopped));
        assert!(sup.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_fences_previous_cycles() {
        let source = ScriptedSource::new(true);
        source.set_connect_delay(Duration::from_secs(3));
        let bound = adapter(false);
        let sup = supervisor(source.clone(), vec![bound.clone()]);
        sup.start(&[address()]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        source.set_connect_delay(Duration::ZERO);
        sup.start(&[address()]).await.unwrap();
        tokio::time::sleep(Duration::from_secs(4)).await;

        assert_eq!(sup.health(&address()), Some(HealthState::Reachable));
        assert_eq!(sup.registry().len(), 1);
        assert_eq!(bound.calls.load(Ordering::SeqCst), 1);
    }
}
