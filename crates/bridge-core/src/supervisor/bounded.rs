// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Bounded connect and liveness probe.
//!
//! Both run the client call on a separate task and wait at most the given
//! bound. Exceeding the bound resolves as `ClientError::Timeout`; the call
//! itself is not cancelled and its late result is discarded.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::client::Client;
use crate::error::{ClientError, ClientResult};

/// Connects `client` within `timeout`.
///
/// If the caller gave up and the connect later succeeds, the client is
/// disposed so the abandoned session does not linger.
pub async fn connect_bounded(client: Arc<dyn Client>, timeout: Duration) -> ClientResult<()> {
    let (tx, rx) = oneshot::channel();
    let worker = client.clone();

    tokio::spawn(async move {
        let result = worker.connect().await;
        if let Err(Ok(())) = tx.send(result) {
            tracing::debug!(
                address = %worker.address(),
                "Abandoned connect completed late, disposing"
            );
            worker.dispose().await;
        }
    });

    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(ClientError::connection(
            client.address().url(),
            "connect task ended without a result",
        )),
        Err(_) => Err(ClientError::timeout("connect", timeout)),
    }
}

/// Connects and immediately disposes `probe` within `timeout`.
pub async fn probe_bounded(probe: Arc<dyn Client>, timeout: Duration) -> ClientResult<()> {
    let address = probe.address().url().to_string();
    let task = tokio::spawn(async move {
        let result = probe.connect().await;
        probe.dispose().await;
        result
    });

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(ClientError::connection(
            address,
            format!("probe task failed: {}", join_error),
        )),
        Err(_) => Err(ClientError::timeout("liveness probe", timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientFactory;
    use crate::testing::{ScriptedFactory, ScriptedSource};
    use crate::types::{ClientKind, SourceAddress};
    use std::sync::atomic::Ordering;

    fn address() -> SourceAddress {
        SourceAddress::new("opc.tcp://plc:4840", ClientKind::Unified)
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_within_bound() {
        let source = ScriptedSource::new(true);
        source.set_connect_delay(Duration::from_millis(1200));
        let client = ScriptedFactory { source: source.clone() }.create(&address()).unwrap();

        connect_bounded(client.clone(), Duration::from_secs(5)).await.unwrap();
        assert!(client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout_disposes_late_success() {
        let source = ScriptedSource::new(true);
        source.set_connect_delay(Duration::from_secs(8));
        let client = ScriptedFactory { source: source.clone() }.create(&address()).unwrap();

        let err = connect_bounded(client.clone(), Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout { .. }));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(source.connects.load(Ordering::SeqCst), 1);
        assert_eq!(source.disposals.load(Ordering::SeqCst), 1);
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_probe_disposes_after_connect() {
        let source = ScriptedSource::new(true);
        let probe = ScriptedFactory { source: source.clone() }.create(&address()).unwrap();

        probe_bounded(probe.clone(), Duration::from_secs(5)).await.unwrap();
        assert!(!probe.is_connected());
        assert_eq!(source.disposals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_probe_reports_connect_failure() {
        let source = ScriptedSource::new(false);
        let probe = ScriptedFactory { source }.create(&address()).unwrap();

        let err = probe_bounded(probe, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, ClientError::Connection { .. }));
    }
}
