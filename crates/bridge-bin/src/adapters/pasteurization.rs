// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Pasteurization line.
//!
//! ```text
//! opcda://192.168.0.153/Matrikon.OPC.Simulation.1
//!   Pasteurization.TestMonitor ─┐
//!   Pasteurization.TestSwitch  ─┴─▶ switch && monitor > 0 ─▶ Pasteurization.Switch
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use bridge_core::{
    monitor_callback, Adapter, AddressSpace, BridgeResult, Client, ClientKind, MonitorBatch,
    MonitorHandle, SourceAddress, TagId,
};
use parking_lot::Mutex;

/// Source the adapter reads from.
pub const SOURCE_URL: &str = "opcda://192.168.0.153/Matrikon.OPC.Simulation.1";

/// Level reported by the test monitor.
pub const TEST_MONITOR: &str = "Pasteurization.TestMonitor";

/// Operator switch on the source.
pub const TEST_SWITCH: &str = "Pasteurization.TestSwitch";

/// Destination variable.
pub const SWITCH: &str = "Pasteurization.Switch";

/// Drives `Pasteurization.Switch` from the source's test monitor and switch.
pub struct PasteurizationAdapter {
    address: SourceAddress,
    space: Arc<AddressSpace>,
    handle: Mutex<Option<MonitorHandle>>,
}

impl PasteurizationAdapter {
    /// Creates the adapter bound to [`SOURCE_URL`].
    pub fn new(space: Arc<AddressSpace>) -> Self {
        Self::with_address(space, SourceAddress::new(SOURCE_URL, ClientKind::Classic))
    }

    /// Creates the adapter bound to another source.
    pub fn with_address(space: Arc<AddressSpace>, address: SourceAddress) -> Self {
        Self {
            address,
            space,
            handle: Mutex::new(None),
        }
    }

    /// Returns `true` while a monitor is installed.
    pub fn is_monitoring(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map_or(false, |handle| !handle.is_cancelled())
    }
}

/// Computes the switch state. Missing, bad or mistyped inputs turn it off.
pub fn switch_state(batch: &MonitorBatch) -> bool {
    let monitor = batch
        .get(&TagId::new(TEST_MONITOR))
        .filter(|event| event.is_good())
        .and_then(|event| event.get::<f64>().ok());
    let switch = batch
        .get(&TagId::new(TEST_SWITCH))
        .filter(|event| event.is_good())
        .and_then(|event| event.get::<bool>().ok());

    match (switch, monitor) {
        (Some(on), Some(level)) => on && level > 0.0,
        _ => {
            tracing::warn!(
                monitor = ?monitor,
                switch = ?switch,
                "Pasteurization inputs unusable, switching off"
            );
            false
        }
    }
}

#[async_trait]
impl Adapter for PasteurizationAdapter {
    fn name(&self) -> &str {
        "pasteurization"
    }

    fn address(&self) -> &SourceAddress {
        &self.address
    }

    async fn adapt(&self, client: Arc<dyn Client>) -> BridgeResult<()> {
        let destination = self.space.require_variable(SWITCH)?.clone();

        let previous = self.handle.lock().take();
        if let Some(previous) = previous {
            previous.close().await;
        }

        let tags = [TagId::new(TEST_MONITOR), TagId::new(TEST_SWITCH)];
        let handle = client
            .monitor(
                &tags,
                monitor_callback(move |batch, _handle| {
                    destination.set_value(switch_state(batch));
                }),
            )
            .await?;

        *self.handle.lock() = Some(handle);
        Ok(())
    }
}

impl std::fmt::Debug for PasteurizationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasteurizationAdapter")
            .field("address", &self.address)
            .field("monitoring", &self.is_monitoring())
            .finish()
    }
}
