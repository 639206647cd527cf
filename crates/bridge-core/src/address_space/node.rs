// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Variable groups and variables.

use std::fmt;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::front_end::FrontEnd;
use crate::types::Quality;
use crate::value::Value;

/// Capacity of each variable's change channel.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Shared slot holding the attached front end.
pub(crate) type FrontEndSlot = Arc<OnceCell<Arc<dyn FrontEnd>>>;

// =============================================================================
// NodeId
// =============================================================================

/// Identifier of a node in the address space.
///
/// Groups use their name; variables use `<group>.<variable>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node ID.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Builds the ID of a variable inside a group.
    pub fn variable(group: &str, variable: &str) -> Self {
        Self(format!("{}.{}", group, variable))
    }

    /// Returns the ID as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Access rights of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Current value can be read.
    CurrentRead,

    /// Current value can be read and written.
    #[default]
    CurrentReadOrWrite,
}

impl AccessLevel {
    /// Returns `true` if writes are allowed.
    pub fn is_writable(&self) -> bool {
        matches!(self, AccessLevel::CurrentReadOrWrite)
    }
}

// =============================================================================
// VariableGroup
// =============================================================================

/// Named container of variables. Membership is fixed at construction.
pub struct VariableGroup {
    pub(crate) node_id: NodeId,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) variables: Vec<Arc<Variable>>,
}

impl VariableGroup {
    /// Returns the node ID (the group name).
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Returns the browse/display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the children in configuration order.
    pub fn variables(&self) -> &[Arc<Variable>] {
        &self.variables
    }

    /// Returns the child named `name`.
    pub fn variable(&self, name: &str) -> Option<&Arc<Variable>> {
        self.variables.iter().find(|v| v.name == name)
    }
}

impl fmt::Debug for VariableGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableGroup")
            .field("node_id", &self.node_id)
            .field("description", &self.description)
            .field("variables", &self.variables.len())
            .finish()
    }
}

// =============================================================================
// Variable
// =============================================================================

/// Current state of a variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSnapshot {
    /// Current value.
    pub value: Value,
    /// Current quality.
    pub quality: Quality,
    /// Time of the last update.
    pub timestamp: DateTime<Utc>,
}

/// A change raised by [`Variable::set_value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableChange {
    /// The variable that changed.
    pub node_id: NodeId,
    /// State after the change.
    pub snapshot: VariableSnapshot,
}

/// A typed-at-runtime leaf node of the address space.
pub struct Variable {
    node_id: NodeId,
    name: String,
    description: String,
    group: Weak<VariableGroup>,
    group_id: NodeId,
    access_level: AccessLevel,
    state: RwLock<VariableSnapshot>,
    changes: broadcast::Sender<VariableChange>,
    front_end: FrontEndSlot,
}

impl Variable {
    pub(crate) fn new(
        group_id: &NodeId,
        group: Weak<VariableGroup>,
        name: &str,
        description: &str,
        front_end: FrontEndSlot,
    ) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            node_id: NodeId::variable(group_id.as_str(), name),
            name: name.to_string(),
            description: description.to_string(),
            group,
            group_id: group_id.clone(),
            access_level: AccessLevel::CurrentReadOrWrite,
            state: RwLock::new(VariableSnapshot {
                value: Value::Null,
                quality: Quality::Good,
                timestamp: Utc::now(),
            }),
            changes,
            front_end,
        }
    }

    /// Returns the node ID (`<group>.<variable>`).
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Returns the `Number` property, equal to the node ID.
    pub fn number(&self) -> &str {
        self.node_id.as_str()
    }

    /// Returns the browse/display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the parent group's node ID.
    pub fn group_id(&self) -> &NodeId {
        &self.group_id
    }

    /// Returns the parent group while the address space is alive.
    pub fn group(&self) -> Option<Arc<VariableGroup>> {
        self.group.upgrade()
    }

    /// Returns the access level.
    pub fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    /// Variables never keep history.
    pub fn historizing(&self) -> bool {
        false
    }

    /// Returns the current state.
    pub fn snapshot(&self) -> VariableSnapshot {
        self.state.read().clone()
    }

    /// Returns the current value.
    pub fn value(&self) -> Value {
        self.state.read().value.clone()
    }

    /// Returns the current quality.
    pub fn quality(&self) -> Quality {
        self.state.read().quality
    }

    /// Stores `value`, marks quality Good and notifies subscribers.
    ///
    /// Timestamps never go backwards, even if the wall clock does.
    pub fn set_value(&self, value: impl Into<Value>) -> VariableChange {
        self.update(Some(value.into()), Quality::Good)
    }

    /// Changes only the quality and notifies subscribers.
    pub fn set_quality(&self, quality: Quality) -> VariableChange {
        self.update(None, quality)
    }

    /// Subscribes to changes of this variable.
    pub fn subscribe(&self) -> broadcast::Receiver<VariableChange> {
        self.changes.subscribe()
    }

    fn update(&self, value: Option<Value>, quality: Quality) -> VariableChange {
        let snapshot = {
            let mut state = self.state.write();
            if let Some(value) = value {
                state.value = value;
            }
            state.quality = quality;
            state.timestamp = Utc::now().max(state.timestamp);
            state.clone()
        };

        let change = VariableChange {
            node_id: self.node_id.clone(),
            snapshot,
        };

        tracing::trace!(
            node_id = %self.node_id,
            value = %change.snapshot.value,
            quality = %change.snapshot.quality,
            "Variable changed"
        );

        // No receivers is fine.
        let _ = self.changes.send(change.clone());
        if let Some(front_end) = self.front_end.get() {
            front_end.notify_changed(self);
        }
        change
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Variable")
            .field("node_id", &self.node_id)
            .field("value", &state.value)
            .field("quality", &state.quality)
            .field("timestamp", &state.timestamp)
            .finish()
    }
}
