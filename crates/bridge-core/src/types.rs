// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core types shared by clients, the registry and the supervisor.
//!
//! - [`TagId`]: dot-delimited identifier of a data point on a source
//! - [`ClientKind`]: the closed set of protocol families
//! - [`SourceAddress`]: endpoint URL plus its resolved family
//! - [`ConnectionStatus`]: the client state machine
//! - [`StatusCode`] / [`Quality`]: protocol status and the quality derived from it
//! - [`ReadEvent`]: immutable snapshot returned by reads and monitors

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::value::{FromValue, Value};

// =============================================================================
// TagId
// =============================================================================

/// Fully-qualified identifier of a single data point on a source.
///
/// # Examples
///
/// ```
/// use bridge_core::types::TagId;
///
/// let tag = TagId::new("Pasteurization.TestSwitch");
/// assert_eq!(tag.as_str(), "Pasteurization.TestSwitch");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(String);

impl TagId {
    /// Creates a new tag ID.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the ID and returns the inner string.
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TagId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TagId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for TagId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// ClientKind
// =============================================================================

/// Protocol family of a source.
///
/// Resolved once per source at startup; nothing else in the bridge inspects
/// the concrete client type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientKind {
    /// OPC Classic (Data Access).
    Classic,

    /// OPC Unified Architecture.
    Unified,
}

impl ClientKind {
    /// Returns the family name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientKind::Classic => "classic",
            ClientKind::Unified => "unified",
        }
    }

    /// Infers the family from a URL scheme.
    ///
    /// `opcda://` is Classic; `opc.tcp://`, `opc.https://` and `opc.wss://`
    /// are Unified.
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split_once("://")?.0.to_ascii_lowercase();
        match scheme.as_str() {
            "opcda" => Some(ClientKind::Classic),
            "opc.tcp" | "opc.https" | "opc.wss" => Some(ClientKind::Unified),
            _ => None,
        }
    }
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ClientKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" | "da" | "opcda" => Ok(ClientKind::Classic),
            "unified" | "ua" | "opcua" => Ok(ClientKind::Unified),
            other => Err(ClientError::unknown_family(other)),
        }
    }
}

// =============================================================================
// SourceAddress
// =============================================================================

/// An endpoint URL and the protocol family used to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceAddress {
    url: String,
    kind: ClientKind,
}

impl SourceAddress {
    /// Creates an address with an explicit family.
    pub fn new(url: impl Into<String>, kind: ClientKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }

    /// Resolves an address from a URL and an optional family name.
    ///
    /// When `family` is `None` the family is inferred from the URL scheme.
    pub fn resolve(url: impl Into<String>, family: Option<&str>) -> ClientResult<Self> {
        let url = url.into();
        let kind = match family {
            Some(name) => name.parse()?,
            None => ClientKind::from_url(&url).ok_or_else(|| {
                ClientError::unknown_family(url.split_once("://").map_or("", |(s, _)| s))
            })?,
        };
        Ok(Self { url, kind })
    }

    /// Returns the endpoint URL.
    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the protocol family.
    #[inline]
    pub fn kind(&self) -> ClientKind {
        self.kind
    }
}

impl fmt::Display for SourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

// =============================================================================
// ConnectionStatus
// =============================================================================

/// Connection state of a client.
///
/// There is no visible "connecting" state; `connect` completes with either
/// outcome before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No usable session.
    #[default]
    NotConnected,

    /// Session established.
    Connected,
}

impl ConnectionStatus {
    /// Returns `true` if connected.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::NotConnected => write!(f, "NotConnected"),
            ConnectionStatus::Connected => write!(f, "Connected"),
        }
    }
}

// =============================================================================
// StatusCode / Quality
// =============================================================================

/// Raw protocol status code.
///
/// The top two bits carry severity: `00` good, `01` uncertain, `10` bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    /// Operation succeeded.
    pub const GOOD: StatusCode = StatusCode(0);
    /// Generic bad status.
    pub const BAD: StatusCode = StatusCode(0x8000_0000);
    /// The node does not exist on the server.
    pub const BAD_NODE_ID_UNKNOWN: StatusCode = StatusCode(0x8034_0000);
    /// The node does not accept writes.
    pub const BAD_NOT_WRITABLE: StatusCode = StatusCode(0x803B_0000);
    /// The value's type does not match the node.
    pub const BAD_TYPE_MISMATCH: StatusCode = StatusCode(0x8074_0000);
    /// The server has no communication with the data source.
    pub const BAD_NO_COMMUNICATION: StatusCode = StatusCode(0x8031_0000);

    /// Returns the raw bits.
    #[inline]
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Returns `true` if the severity is good.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.0 & 0xC000_0000 == 0
    }

    /// Returns `true` if the severity is bad.
    #[inline]
    pub fn is_bad(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Good/Bad flag attached to every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// The value is trustworthy.
    #[default]
    Good,

    /// The value is not trustworthy.
    Bad,
}

impl Quality {
    /// Derives quality from a protocol status; uncertain counts as bad.
    #[inline]
    pub fn from_status(status: StatusCode) -> Self {
        if status.is_good() {
            Quality::Good
        } else {
            Quality::Bad
        }
    }

    /// Returns `true` if good.
    #[inline]
    pub fn is_good(&self) -> bool {
        matches!(self, Quality::Good)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Good => write!(f, "Good"),
            Quality::Bad => write!(f, "Bad"),
        }
    }
}

// =============================================================================
// ReadEvent
// =============================================================================

/// Immutable snapshot of a tag returned by reads and delivered to monitors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadEvent {
    /// The tag this snapshot belongs to.
    pub tag: TagId,

    /// The value.
    pub value: Value,

    /// Quality derived from the protocol status.
    pub quality: Quality,

    /// Raw protocol status.
    pub status: StatusCode,

    /// Timestamp assigned by the data source.
    pub source_timestamp: Option<DateTime<Utc>>,

    /// Timestamp assigned by the server.
    pub server_timestamp: Option<DateTime<Utc>>,
}

impl ReadEvent {
    /// Creates a snapshot; quality follows `status`.
    pub fn new(tag: TagId, value: Value, status: StatusCode) -> Self {
        Self {
            tag,
            value,
            quality: Quality::from_status(status),
            status,
            source_timestamp: None,
            server_timestamp: None,
        }
    }

    /// Sets both timestamps.
    pub fn with_timestamps(
        mut self,
        source: Option<DateTime<Utc>>,
        server: Option<DateTime<Utc>>,
    ) -> Self {
        self.source_timestamp = source;
        self.server_timestamp = server;
        self
    }

    /// Casts the value to `T`.
    pub fn get<T: FromValue>(&self) -> ClientResult<T> {
        self.value.cast(self.tag.as_str())
    }

    /// Returns `true` if quality is good.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.quality.is_good()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_kind_from_str() {
        assert_eq!("classic".parse::<ClientKind>().unwrap(), ClientKind::Classic);
        assert_eq!("DA".parse::<ClientKind>().unwrap(), ClientKind::Classic);
        assert_eq!("Unified".parse::<ClientKind>().unwrap(), ClientKind::Unified);

        let err = "modbus".parse::<ClientKind>().unwrap_err();
        assert!(matches!(err, ClientError::UnknownProtocolFamily { .. }));
    }

    #[test]
    fn test_source_address_resolve() {
        let addr =
            SourceAddress::resolve("opcda://192.168.0.153/Matrikon.OPC.Simulation.1", None).unwrap();
        assert_eq!(addr.kind(), ClientKind::Classic);

        let addr = SourceAddress::resolve("opc.tcp://plc:4840", None).unwrap();
        assert_eq!(addr.kind(), ClientKind::Unified);

        let addr = SourceAddress::resolve("opc.tcp://plc:4840", Some("classic")).unwrap();
        assert_eq!(addr.kind(), ClientKind::Classic);

        assert!(SourceAddress::resolve("http://plc", None).is_err());
    }

    #[test]
    fn test_quality_from_status() {
        assert_eq!(Quality::from_status(StatusCode::GOOD), Quality::Good);
        assert_eq!(Quality::from_status(StatusCode::BAD_NOT_WRITABLE), Quality::Bad);
        assert_eq!(Quality::from_status(StatusCode(0x4000_0000)), Quality::Bad);
    }

    #[test]
    fn test_read_event_get() {
        let event = ReadEvent::new(TagId::new("A.B"), Value::Float64(2.5), StatusCode::GOOD);
        assert!(event.is_good());
        assert_eq!(event.get::<f64>().unwrap(), 2.5);
        assert!(matches!(
            event.get::<bool>(),
            Err(ClientError::TagCast { .. })
        ));
    }
}
