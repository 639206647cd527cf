// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Recurring task scheduler with keyed pause/resume.
//!
//! Each scheduled task owns a timer loop. On every tick the loop spawns the
//! task body onto a worker task, so a slow body never delays other timers.
//! A tick is skipped while the task is paused or while its previous run is
//! still in flight.
//!
//! ```text
//!   timer(key) ──tick──▶ paused? ──yes──▶ skip
//!                          │no
//!                          ▼
//!                     running? ──yes──▶ skip
//!                          │no
//!                          ▼
//!                  tokio::spawn(task.run())
//! ```
//!
//! Tasks are addressed by [`TaskKey`], derived from the source address and
//! the [`TaskKind`]. Pause and resume are idempotent.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::SchedulerError;
use crate::types::SourceAddress;

// =============================================================================
// Task identity
// =============================================================================

/// Kind of health task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Reachability probe of an unreachable source.
    Ping,

    /// Liveness probe of a reachable source.
    Patrol,
}

impl TaskKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Ping => "ping",
            TaskKind::Patrol => "patrol",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stable key of a scheduled task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskKey {
    address: SourceAddress,
    kind: TaskKind,
}

impl TaskKey {
    /// Creates a key.
    pub fn new(address: SourceAddress, kind: TaskKind) -> Self {
        Self { address, kind }
    }

    /// Key of the ping task for `address`.
    pub fn ping(address: &SourceAddress) -> Self {
        Self::new(address.clone(), TaskKind::Ping)
    }

    /// Key of the patrol task for `address`.
    pub fn patrol(address: &SourceAddress) -> Self {
        Self::new(address.clone(), TaskKind::Patrol)
    }

    /// Returns the address.
    pub fn address(&self) -> &SourceAddress {
        &self.address
    }

    /// Returns the kind.
    pub fn kind(&self) -> TaskKind {
        self.kind
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.address, self.kind)
    }
}

// =============================================================================
// RecurringTask
// =============================================================================

/// Body of a scheduled task.
///
/// Implementations handle their own failures; nothing is reported back to
/// the scheduler.
#[async_trait]
pub trait RecurringTask: Send + Sync {
    /// Runs one cycle.
    async fn run(&self);
}

// =============================================================================
// TaskScheduler
// =============================================================================

struct ScheduledTask {
    paused: AtomicBool,
    running: Arc<AtomicBool>,
    runs: AtomicU64,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl ScheduledTask {
    fn abort(&self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
        }
    }
}

/// Resets the running flag even if the body panics.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs keyed recurring tasks.
pub struct TaskScheduler {
    tasks: DashMap<TaskKey, Arc<ScheduledTask>>,
    shut_down: AtomicBool,
}

impl TaskScheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self {
            tasks: DashMap::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Schedules `task` to run every `interval`, first tick immediately.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::AlreadyScheduled` - the key is in use
    /// - `SchedulerError::ShutDown` - the scheduler was shut down
    pub fn schedule(
        &self,
        key: TaskKey,
        interval: Duration,
        paused: bool,
        task: Arc<dyn RecurringTask>,
    ) -> Result<(), SchedulerError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(SchedulerError::ShutDown);
        }

        let entry = Arc::new(ScheduledTask {
            paused: AtomicBool::new(paused),
            running: Arc::new(AtomicBool::new(false)),
            runs: AtomicU64::new(0),
            timer: Mutex::new(None),
        });

        match self.tasks.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(SchedulerError::AlreadyScheduled {
                    key: key.to_string(),
                });
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(entry.clone());
            }
        }

        let timer_entry = entry.clone();
        let timer_key = key.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                if timer_entry.paused.load(Ordering::SeqCst) {
                    continue;
                }
                if timer_entry.running.swap(true, Ordering::SeqCst) {
                    tracing::debug!(task = %timer_key, "Previous run still in flight, skipping tick");
                    continue;
                }

                timer_entry.runs.fetch_add(1, Ordering::Relaxed);
                let guard = RunningGuard(timer_entry.running.clone());
                let task = task.clone();
                tokio::spawn(async move {
                    let _guard = guard;
                    task.run().await;
                });
            }
        });
        *entry.timer.lock() = Some(handle);

        tracing::debug!(task = %key, interval = ?interval, paused = paused, "Scheduled task");
        Ok(())
    }

    /// Pauses a task. Returns `false` if the key is unknown.
    pub fn pause(&self, key: &TaskKey) -> bool {
        self.set_paused(key, true)
    }

    /// Resumes a task. Returns `false` if the key is unknown.
    pub fn resume(&self, key: &TaskKey) -> bool {
        self.set_paused(key, false)
    }

    fn set_paused(&self, key: &TaskKey, paused: bool) -> bool {
        match self.tasks.get(key) {
            Some(entry) => {
                if entry.paused.swap(paused, Ordering::SeqCst) != paused {
                    tracing::debug!(task = %key, paused = paused, "Task pause state changed");
                }
                true
            }
            None => false,
        }
    }

    /// Returns whether a task is paused, or `None` if unknown.
    pub fn is_paused(&self, key: &TaskKey) -> Option<bool> {
        self.tasks.get(key).map(|e| e.paused.load(Ordering::SeqCst))
    }

    /// Returns how many times a task's body has been started.
    pub fn run_count(&self, key: &TaskKey) -> Option<u64> {
        self.tasks.get(key).map(|e| e.runs.load(Ordering::Relaxed))
    }

    /// Removes a task, stopping its timer. In-flight runs finish on their own.
    pub fn unschedule(&self, key: &TaskKey) -> Result<(), SchedulerError> {
        let (_, entry) = self.tasks.remove(key).ok_or_else(|| SchedulerError::NotFound {
            key: key.to_string(),
        })?;
        entry.abort();
        Ok(())
    }

    /// Removes every task.
    pub fn clear(&self) {
        let keys: Vec<TaskKey> = self.tasks.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            if let Some((_, entry)) = self.tasks.remove(&key) {
                entry.abort();
            }
        }
        tracing::debug!("Cleared all scheduled tasks");
    }

    /// Removes every task and rejects further scheduling.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        self.clear();
    }

    /// Returns the scheduled keys.
    pub fn keys(&self) -> Vec<TaskKey> {
        self.tasks.iter().map(|e| e.key().clone()).collect()
    }

    /// Returns the number of scheduled tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        for entry in self.tasks.iter() {
            entry.value().abort();
        }
    }
}

impl fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("tasks", &self.tasks.len())
            .field("shut_down", &self.shut_down.load(Ordering::SeqCst))
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
