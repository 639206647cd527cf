// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Protocol-family clients.
//!
//! - [`ClassicClient`]: OPC Classic (DA) servers, `opcda://host/ProgId`
//! - [`UnifiedClient`]: OPC UA servers, `opc.tcp://[user:password@]host:port`
//!
//! Both implement [`bridge_core::Client`] on top of the same session engine
//! and differ only in the endpoint they accept and what they expose about it.

mod base;
mod classic;
mod unified;

pub use classic::ClassicClient;
pub use unified::UnifiedClient;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default interval at which monitored tags are sampled.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_millis(100);

/// Settings shared by every client a factory creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Sampling interval of monitors.
    pub monitor_interval: Duration,

    /// Application name presented to servers.
    pub application_name: String,

    /// Requested session timeout.
    pub session_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            application_name: "OPC Bridge".to_string(),
            session_timeout: Duration::from_secs(60),
        }
    }
}

impl ClientSettings {
    /// Sets the monitor interval.
    pub fn with_monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = interval;
        self
    }

    /// Sets the application name.
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }
}

/// Implements [`bridge_core::Client`] by delegating to the `inner` engine.
macro_rules! delegate_client {
    ($client:ty) => {
        #[async_trait::async_trait]
        impl bridge_core::Client for $client {
            fn address(&self) -> &bridge_core::SourceAddress {
                self.inner.address()
            }

            fn status(&self) -> bridge_core::ConnectionStatus {
                self.inner.status()
            }

            async fn connect(&self) -> bridge_core::ClientResult<()> {
                self.inner.connect().await
            }

            async fn dispose(&self) {
                self.inner.dispose().await
            }

            async fn read(&self, tag: &bridge_core::TagId) -> bridge_core::ClientResult<bridge_core::ReadEvent> {
                self.inner.read(tag).await
            }

            async fn write(
                &self,
                tag: &bridge_core::TagId,
                value: bridge_core::Value,
            ) -> bridge_core::ClientResult<()> {
                self.inner.write(tag, value).await
            }

            async fn monitor_with(
                &self,
                tags: &[bridge_core::TagId],
                mode: bridge_core::MonitorMode,
                callback: bridge_core::MonitorCallback,
            ) -> bridge_core::ClientResult<bridge_core::MonitorHandle> {
                self.inner.monitor(tags, mode, callback).await
            }

            fn events(&self) -> tokio::sync::broadcast::Receiver<bridge_core::ClientEvent> {
                self.inner.events()
            }

            fn stats(&self) -> bridge_core::ClientStatsSnapshot {
                self.inner.stats()
            }
        }
    };
}

pub(crate) use delegate_client;
