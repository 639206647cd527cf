// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Boundary to the process that serves the address space to consumers.

use async_trait::async_trait;

use super::node::{Variable, VariableGroup};
use crate::error::{AddressSpaceResult, BridgeResult};

/// A node handed to the front end at registration time.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    /// A group (folder) node.
    Group(&'a VariableGroup),
    /// A variable node.
    Variable(&'a Variable),
}

impl NodeRef<'_> {
    /// Returns the node ID as a string.
    pub fn node_id(&self) -> &str {
        match self {
            NodeRef::Group(g) => g.node_id().as_str(),
            NodeRef::Variable(v) => v.node_id().as_str(),
        }
    }
}

/// Serves the address space to downstream consumers.
///
/// Groups are registered before their variables. `notify_changed` is called
/// synchronously from [`Variable::set_value`], possibly from a monitor
/// callback, so it must not block.
#[async_trait]
pub trait FrontEnd: Send + Sync {
    /// Returns a name for logging.
    fn name(&self) -> &str;

    /// Adds a node to the served tree.
    fn register_node(&self, node: NodeRef<'_>) -> AddressSpaceResult<()>;

    /// Publishes the current state of a variable.
    fn notify_changed(&self, variable: &Variable);

    /// Starts serving.
    async fn start(&self) -> BridgeResult<()> {
        Ok(())
    }

    /// Stops serving.
    async fn stop(&self) {}
}
