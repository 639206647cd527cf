// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Adaptation dispatch.
//!
//! An [`Adapter`] projects values of one source into destination variables.
//! Adapters are registered explicitly, in order, when the runtime starts.
//! The supervisor calls [`AdaptationDispatcher::dispatch`] every time a
//! source becomes reachable, handing over the freshly installed client.
//!
//! # Re-invocation
//!
//! An adapter is invoked once per reconnect. The previous client has been
//! disposed by then, but the adapter still holds the old monitor handle; it
//! must cancel that handle and subscribe again on the new client so that a
//! reconnect never leaves two live subscriptions behind.

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::Client;
use crate::error::BridgeResult;
use crate::types::SourceAddress;

/// Projection of one source's tags into destination variables.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Returns a name for logging.
    fn name(&self) -> &str;

    /// Returns the source this adapter depends on.
    fn address(&self) -> &SourceAddress;

    /// Subscribes to the source through `client` and starts projecting.
    ///
    /// Called after every unreachable-to-reachable transition of
    /// [`address`](Self::address). Must be idempotent across calls.
    async fn adapt(&self, client: Arc<dyn Client>) -> BridgeResult<()>;
}

/// Result of one dispatch round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    /// Adapters invoked.
    pub invoked: usize,
    /// Adapters that returned an error.
    pub failed: usize,
}

/// Ordered list of adapters.
#[derive(Default)]
pub struct AdaptationDispatcher {
    adapters: Vec<Arc<dyn Adapter>>,
}

impl AdaptationDispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an adapter.
    pub fn register(&mut self, adapter: Arc<dyn Adapter>) {
        tracing::debug!(adapter = adapter.name(), address = %adapter.address(), "Registered adapter");
        self.adapters.push(adapter);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.register(adapter);
        self
    }

    /// Returns the adapters bound to `address`, in registration order.
    pub fn adapters_for<'a>(&'a self, address: &'a SourceAddress) -> impl Iterator<Item = &'a Arc<dyn Adapter>> + 'a {
        self.adapters.iter().filter(move |a| a.address() == address)
    }

    /// Invokes every adapter bound to `address`.
    ///
    /// Adapter failures are logged and counted; they never stop the
    /// remaining adapters.
    pub async fn dispatch(&self, address: &SourceAddress, client: Arc<dyn Client>) -> DispatchReport {
        let mut report = DispatchReport::default();

        for adapter in self.adapters_for(address) {
            report.invoked += 1;
            match adapter.adapt(client.clone()).await {
                Ok(()) => {
                    tracing::info!(adapter = adapter.name(), address = %address, "Adapter applied");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        adapter = adapter.name(),
                        address = %address,
                        error = %e,
                        "Adapter failed"
                    );
                }
            }
        }

        report
    }

    /// Returns the number of adapters.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Returns `true` if no adapters are registered.
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdaptationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptationDispatcher")
            .field(
                "adapters",
                &self.adapters.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
