// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Registered adapters.
//!
//! Adapters are listed here explicitly. An adapter is only registered when
//! every destination variable it writes exists in the address space.

pub mod pasteurization;

use std::sync::Arc;

use bridge_core::{AdaptationDispatcher, Adapter, AddressSpace};

pub use pasteurization::PasteurizationAdapter;

/// Builds the dispatcher for `space`.
pub fn build_dispatcher(space: &Arc<AddressSpace>) -> AdaptationDispatcher {
    let candidates: [(Arc<dyn Adapter>, &[&str]); 1] = [(
        Arc::new(PasteurizationAdapter::new(space.clone())),
        &[pasteurization::SWITCH],
    )];

    let mut dispatcher = AdaptationDispatcher::new();
    for (adapter, destinations) in candidates {
        match destinations.iter().find(|id| space.variable(id).is_none()) {
            None => dispatcher.register(adapter),
            Some(missing) => tracing::info!(
                adapter = adapter.name(),
                variable = %missing,
                "Adapter skipped, destination not configured"
            ),
        }
    }
    dispatcher
}
