// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Headless front end.

use std::sync::atomic::{AtomicU64, Ordering};

use bridge_core::{AddressSpaceResult, FrontEnd, NodeRef, Variable};

/// Front end that logs registrations and value changes instead of serving
/// them. Used when the UA server is disabled or not compiled in.
#[derive(Debug, Default)]
pub struct TracingFrontEnd {
    registered: AtomicU64,
    changes: AtomicU64,
}

impl TracingFrontEnd {
    /// Creates the front end.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered nodes.
    pub fn registered(&self) -> u64 {
        self.registered.load(Ordering::Relaxed)
    }

    /// Returns the number of change notifications seen.
    pub fn changes(&self) -> u64 {
        self.changes.load(Ordering::Relaxed)
    }
}

impl FrontEnd for TracingFrontEnd {
    fn name(&self) -> &str {
        "tracing"
    }

    fn register_node(&self, node: NodeRef<'_>) -> AddressSpaceResult<()> {
        self.registered.fetch_add(1, Ordering::Relaxed);
        match node {
            NodeRef::Group(group) => {
                tracing::debug!(node_id = %group.node_id(), "Registered group");
            }
            NodeRef::Variable(variable) => {
                tracing::debug!(node_id = %variable.node_id(), "Registered variable");
            }
        }
        Ok(())
    }

    fn notify_changed(&self, variable: &Variable) {
        self.changes.fetch_add(1, Ordering::Relaxed);
        let snapshot = variable.snapshot();
        tracing::info!(
            node_id = %variable.node_id(),
            value = %snapshot.value,
            quality = %snapshot.quality,
            "Variable changed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::{AddressSpace, GroupDefinition};
    use std::sync::Arc;

    #[test]
    fn test_counts_registrations_and_changes() {
        let space = AddressSpace::build(&[
            GroupDefinition::new("Cooling", "").with_variable("Switch", "")
        ])
        .unwrap();
        let front_end = Arc::new(TracingFrontEnd::new());
        space.attach(front_end.clone()).unwrap();
        assert_eq!(front_end.registered(), 2);

        space.set_value("Cooling.Switch", true).unwrap();
        assert_eq!(front_end.changes(), 1);
    }
}
