// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! Recording implementations of the bridge's seams, for verifying how the
//! supervisor and the address space drive them.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bridge_core::{
    Adapter, AddressSpaceResult, BridgeError, BridgeResult, Client, FrontEnd, NodeRef,
    SourceAddress, Variable, VariableSnapshot,
};
use parking_lot::Mutex;

// =============================================================================
// RecordingAdapter
// =============================================================================

/// Adapter that records every invocation.
#[derive(Debug)]
pub struct RecordingAdapter {
    name: String,
    address: SourceAddress,
    calls: AtomicUsize,
    fail: AtomicBool,
    connected_on_call: Mutex<Vec<bool>>,
}

impl RecordingAdapter {
    /// Creates an adapter bound to `address`.
    pub fn new(name: impl Into<String>, address: SourceAddress) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            address,
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            connected_on_call: Mutex::new(Vec::new()),
        })
    }

    /// Makes subsequent invocations fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of invocations.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns, per invocation, whether the client handed over was connected.
    pub fn connected_on_call(&self) -> Vec<bool> {
        self.connected_on_call.lock().clone()
    }
}

#[async_trait]
impl Adapter for RecordingAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn address(&self) -> &SourceAddress {
        &self.address
    }

    async fn adapt(&self, client: Arc<dyn Client>) -> BridgeResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.connected_on_call.lock().push(client.is_connected());
        if self.fail.load(Ordering::SeqCst) {
            return Err(BridgeError::adapter(self.name.clone(), "injected failure"));
        }
        Ok(())
    }
}

// =============================================================================
// RecordingFrontEnd
// =============================================================================

/// Front end that records registrations and change notifications.
#[derive(Debug, Default)]
pub struct RecordingFrontEnd {
    registered: Mutex<Vec<String>>,
    changes: Mutex<Vec<(String, VariableSnapshot)>>,
    reject: Mutex<Option<String>>,
}

impl RecordingFrontEnd {
    /// Creates an empty front end.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes registration of `node_id` fail.
    pub fn reject(&self, node_id: impl Into<String>) {
        *self.reject.lock() = Some(node_id.into());
    }

    /// Returns registered node IDs, in registration order.
    pub fn registered(&self) -> Vec<String> {
        self.registered.lock().clone()
    }

    /// Returns the notifications received for `node_id`.
    pub fn changes_for(&self, node_id: &str) -> Vec<VariableSnapshot> {
        self.changes
            .lock()
            .iter()
            .filter(|(id, _)| id == node_id)
            .map(|(_, snapshot)| snapshot.clone())
            .collect()
    }
}

impl FrontEnd for RecordingFrontEnd {
    fn name(&self) -> &str {
        "recording"
    }

    fn register_node(&self, node: NodeRef<'_>) -> AddressSpaceResult<()> {
        if self.reject.lock().as_deref() == Some(node.node_id()) {
            return Err(bridge_core::AddressSpaceError::front_end(node.node_id(), "rejected"));
        }
        self.registered.lock().push(node.node_id().to_string());
        Ok(())
    }

    fn notify_changed(&self, variable: &Variable) {
        self.changes
            .lock()
            .push((variable.node_id().to_string(), variable.snapshot()));
    }
}
