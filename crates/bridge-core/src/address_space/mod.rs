// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory address space built from declarative group definitions.
//!
//! # Structure
//!
//! ```text
//! AddressSpace
//! ├── VariableGroup "Pasteurization"          node id: Pasteurization
//! │   ├── Variable "Switch"                   node id: Pasteurization.Switch
//! │   └── Variable "Temperature"              node id: Pasteurization.Temperature
//! └── VariableGroup "Cooling"                 node id: Cooling
//!     └── Variable "Switch"                   node id: Cooling.Switch
//! ```
//!
//! The tree is built once at startup and handed to a [`FrontEnd`] exactly
//! once through [`AddressSpace::attach`]. Nodes are never added or removed
//! afterwards; only variable values change, through
//! [`Variable::set_value`].

mod front_end;
mod node;

pub use front_end::{FrontEnd, NodeRef};
pub use node::{AccessLevel, NodeId, Variable, VariableChange, VariableGroup, VariableSnapshot};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::{AddressSpaceError, AddressSpaceResult};
use crate::value::Value;
use node::FrontEndSlot;

// =============================================================================
// Definitions
// =============================================================================

/// Declarative description of a group and its variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupDefinition {
    /// Group name; becomes the group's node ID.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Child variables, in order.
    #[serde(default)]
    pub variables: Vec<VariableDefinition>,
}

impl GroupDefinition {
    /// Creates a group definition without variables.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            variables: Vec::new(),
        }
    }

    /// Adds a variable definition.
    pub fn with_variable(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.variables.push(VariableDefinition {
            name: name.into(),
            description: description.into(),
        });
        self
    }
}

/// Declarative description of a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableDefinition {
    /// Variable name, unique within its group.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

/// Checks that `name` can be used as a node ID segment.
pub fn validate_node_name(name: &str) -> AddressSpaceResult<()> {
    let reason = if name.trim().is_empty() {
        "cannot be empty"
    } else if name.contains('.') {
        "cannot contain '.'"
    } else if name.trim() != name {
        "cannot have leading or trailing whitespace"
    } else {
        return Ok(());
    };
    Err(AddressSpaceError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

// =============================================================================
// AddressSpace
// =============================================================================

/// The forest of variable groups served to consumers.
pub struct AddressSpace {
    groups: Vec<Arc<VariableGroup>>,
    variables: HashMap<NodeId, Arc<Variable>>,
    front_end: FrontEndSlot,
}

impl AddressSpace {
    /// Builds the address space from group definitions.
    ///
    /// # Errors
    ///
    /// - `AddressSpaceError::InvalidName` - empty name or name containing `.`
    /// - `AddressSpaceError::DuplicateNode` - repeated group or variable name
    pub fn build(definitions: &[GroupDefinition]) -> AddressSpaceResult<Self> {
        let front_end: FrontEndSlot = Arc::new(OnceCell::new());
        let mut group_ids = HashSet::new();
        let mut groups = Vec::with_capacity(definitions.len());
        let mut variables = HashMap::new();

        for definition in definitions {
            validate_node_name(&definition.name)?;
            if !group_ids.insert(definition.name.as_str()) {
                return Err(AddressSpaceError::DuplicateNode {
                    node_id: definition.name.clone(),
                });
            }

            let mut names = HashSet::new();
            for variable in &definition.variables {
                validate_node_name(&variable.name)?;
                if !names.insert(variable.name.as_str()) {
                    return Err(AddressSpaceError::DuplicateNode {
                        node_id: NodeId::variable(&definition.name, &variable.name).to_string(),
                    });
                }
            }

            let group_id = NodeId::new(definition.name.clone());
            let group = Arc::new_cyclic(|weak| VariableGroup {
                node_id: group_id.clone(),
                name: definition.name.clone(),
                description: definition.description.clone(),
                variables: definition
                    .variables
                    .iter()
                    .map(|v| {
                        Arc::new(Variable::new(
                            &group_id,
                            weak.clone(),
                            &v.name,
                            &v.description,
                            front_end.clone(),
                        ))
                    })
                    .collect(),
            });

            for variable in group.variables() {
                variables.insert(variable.node_id().clone(), variable.clone());
            }
            groups.push(group);
        }

        tracing::info!(
            groups = groups.len(),
            variables = variables.len(),
            "Built address space"
        );

        Ok(Self {
            groups,
            variables,
            front_end,
        })
    }

    /// Hands the tree to `front_end`, registering every node.
    ///
    /// Groups are registered first, then their variables. Can only be
    /// called once.
    pub fn attach(&self, front_end: Arc<dyn FrontEnd>) -> AddressSpaceResult<()> {
        self.front_end
            .set(front_end.clone())
            .map_err(|_| AddressSpaceError::AlreadyAttached)?;

        for group in &self.groups {
            front_end.register_node(NodeRef::Group(group))?;
            for variable in group.variables() {
                front_end.register_node(NodeRef::Variable(variable))?;
            }
        }

        tracing::info!(front_end = front_end.name(), "Attached address space to front end");
        Ok(())
    }

    /// Returns `true` once attached to a front end.
    pub fn is_attached(&self) -> bool {
        self.front_end.get().is_some()
    }

    /// Returns the groups in configuration order.
    pub fn groups(&self) -> &[Arc<VariableGroup>] {
        &self.groups
    }

    /// Returns the group with the given node ID.
    pub fn group(&self, node_id: &str) -> Option<&Arc<VariableGroup>> {
        self.groups.iter().find(|g| g.node_id().as_str() == node_id)
    }

    /// Returns the variable with the given node ID.
    pub fn variable(&self, node_id: &str) -> Option<&Arc<Variable>> {
        self.variables.get(&NodeId::new(node_id))
    }

    /// Returns the variable with the given node ID or an error.
    pub fn require_variable(&self, node_id: &str) -> AddressSpaceResult<&Arc<Variable>> {
        self.variable(node_id)
            .ok_or_else(|| AddressSpaceError::variable_not_found(node_id))
    }

    /// Sets the value of the variable with the given node ID.
    pub fn set_value(&self, node_id: &str, value: impl Into<Value>) -> AddressSpaceResult<VariableChange> {
        Ok(self.require_variable(node_id)?.set_value(value))
    }

    /// Iterates over all variables in configuration order.
    pub fn variables(&self) -> impl Iterator<Item = &Arc<Variable>> {
        self.groups.iter().flat_map(|g| g.variables().iter())
    }

    /// Returns the number of variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }
}

impl std::fmt::Debug for AddressSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressSpace")
            .field("groups", &self.groups.len())
            .field("variables", &self.variables.len())
            .field("attached", &self.is_attached())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
