// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error hierarchy for the bridge core.
//!
//! # Error Hierarchy
//!
//! ```text
//! BridgeError (root)
//! ├── ClientError        - Source client operations (connect/read/write/monitor)
//! ├── AddressSpaceError  - Address-space construction and lookup
//! └── SchedulerError     - Recurring task scheduling
//! ```
//!
//! Health-check bodies never let a `ClientError` escape; they convert it into
//! a state transition. Direct `read`/`write` callers receive it unchanged.
//!
//! # Examples
//!
//! ```
//! use bridge_core::error::{BridgeError, ClientError};
//! use std::time::Duration;
//!
//! let error = ClientError::timeout("connect", Duration::from_secs(5));
//! assert!(error.is_retryable());
//!
//! let bridge_error: BridgeError = error.into();
//! assert!(bridge_error.is_retryable());
//! ```

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// BridgeError - Root Error Type
// =============================================================================

/// The root error type for the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Source client error.
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Address-space error.
    #[error("Address space error: {0}")]
    AddressSpace(#[from] AddressSpaceError),

    /// Scheduler error.
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Adapter failure.
    #[error("Adapter '{adapter}' failed: {message}")]
    Adapter {
        /// Adapter name.
        adapter: String,
        /// Error message.
        message: String,
    },

    /// Internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl BridgeError {
    /// Creates an adapter error.
    pub fn adapter(adapter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Adapter {
            adapter: adapter.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::Client(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns the error type for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            BridgeError::Client(e) => e.error_type(),
            BridgeError::AddressSpace(_) => "address_space",
            BridgeError::Scheduler(_) => "scheduler",
            BridgeError::Adapter { .. } => "adapter",
            BridgeError::Internal { .. } => "internal",
        }
    }
}

// =============================================================================
// ClientError
// =============================================================================

/// Errors raised by protocol clients.
///
/// The first six variants are the bridge's error taxonomy; `InvalidRequest`
/// covers malformed calls such as monitoring an empty tag list.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level connect failure.
    #[error("Connection to '{address}' failed: {message}")]
    Connection {
        /// Source address.
        address: String,
        /// Error message.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A bounded operation exceeded its deadline.
    #[error("{operation} timed out after {duration:?}")]
    Timeout {
        /// Operation that timed out.
        operation: String,
        /// The bound that was exceeded.
        duration: Duration,
    },

    /// Operation attempted on a client that is not connected.
    #[error("Client for '{address}' is not connected")]
    NotConnected {
        /// Source address.
        address: String,
    },

    /// The value's runtime type is incompatible with the requested type.
    #[error("Tag '{tag}' holds {actual}, cannot cast to {expected}")]
    TagCast {
        /// Tag identifier.
        tag: String,
        /// Requested type.
        expected: &'static str,
        /// Runtime type of the stored value.
        actual: &'static str,
    },

    /// The remote rejected an operation or reported a bad status.
    #[error("Protocol error on '{tag}': {message} (status 0x{status:08X})")]
    Protocol {
        /// Tag identifier, or the address for session-level errors.
        tag: String,
        /// Error message.
        message: String,
        /// Raw protocol status code.
        status: u32,
    },

    /// Configuration names an unsupported protocol family.
    #[error("Unknown protocol family '{family}'")]
    UnknownProtocolFamily {
        /// The unrecognised family.
        family: String,
    },

    /// Malformed request.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Error message.
        message: String,
    },
}

impl ClientError {
    /// Creates a connection error.
    pub fn connection(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            address: address.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a connection error with an underlying source.
    pub fn connection_with<E>(
        address: impl Into<String>,
        message: impl Into<String>,
        source: E,
    ) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection {
            address: address.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Creates a not-connected error.
    pub fn not_connected(address: impl Into<String>) -> Self {
        Self::NotConnected {
            address: address.into(),
        }
    }

    /// Creates a tag cast error.
    pub fn tag_cast(tag: impl Into<String>, expected: &'static str, actual: &'static str) -> Self {
        Self::TagCast {
            tag: tag.into(),
            expected,
            actual,
        }
    }

    /// Creates a protocol error.
    pub fn protocol(tag: impl Into<String>, message: impl Into<String>, status: u32) -> Self {
        Self::Protocol {
            tag: tag.into(),
            message: message.into(),
            status,
        }
    }

    /// Creates an unknown protocol family error.
    pub fn unknown_family(family: impl Into<String>) -> Self {
        Self::UnknownProtocolFamily {
            family: family.into(),
        }
    }

    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Returns `true` if retrying the operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Connection { .. }
                | ClientError::Timeout { .. }
                | ClientError::NotConnected { .. }
        )
    }

    /// Returns `true` if the error indicates the session is unusable.
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            ClientError::Connection { .. } | ClientError::NotConnected { .. }
        )
    }

    /// Returns the error type for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            ClientError::Connection { .. } => "connection",
            ClientError::Timeout { .. } => "timeout",
            ClientError::NotConnected { .. } => "not_connected",
            ClientError::TagCast { .. } => "tag_cast",
            ClientError::Protocol { .. } => "protocol",
            ClientError::UnknownProtocolFamily { .. } => "unknown_protocol_family",
            ClientError::InvalidRequest { .. } => "invalid_request",
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Connection { address, .. } => {
                format!("소스 '{}'에 연결할 수 없습니다", address)
            }
            ClientError::Timeout { operation, .. } => {
                format!("'{}' 작업 시간이 초과되었습니다", operation)
            }
            ClientError::NotConnected { address } => {
                format!("소스 '{}'가 연결되어 있지 않습니다", address)
            }
            ClientError::TagCast { tag, .. } => format!("태그 '{}'의 형식이 맞지 않습니다", tag),
            ClientError::Protocol { tag, .. } => format!("'{}' 요청이 거부되었습니다", tag),
            ClientError::UnknownProtocolFamily { family } => {
                format!("지원하지 않는 프로토콜 '{}'입니다", family)
            }
            ClientError::InvalidRequest { .. } => "잘못된 요청입니다".to_string(),
        }
    }
}

impl Clone for ClientError {
    fn clone(&self) -> Self {
        match self {
            ClientError::Connection {
                address, message, ..
            } => ClientError::Connection {
                address: address.clone(),
                message: message.clone(),
                source: None,
            },
            ClientError::Timeout {
                operation,
                duration,
            } => ClientError::Timeout {
                operation: operation.clone(),
                duration: *duration,
            },
            ClientError::NotConnected { address } => ClientError::NotConnected {
                address: address.clone(),
            },
            ClientError::TagCast {
                tag,
                expected,
                actual,
            } => ClientError::TagCast {
                tag: tag.clone(),
                expected,
                actual,
            },
            ClientError::Protocol {
                tag,
                message,
                status,
            } => ClientError::Protocol {
                tag: tag.clone(),
                message: message.clone(),
                status: *status,
            },
            ClientError::UnknownProtocolFamily { family } => ClientError::UnknownProtocolFamily {
                family: family.clone(),
            },
            ClientError::InvalidRequest { message } => ClientError::InvalidRequest {
                message: message.clone(),
            },
        }
    }
}

// =============================================================================
// AddressSpaceError
// =============================================================================

/// Errors raised while building or querying the address space.
#[derive(Debug, Error)]
pub enum AddressSpaceError {
    /// Two nodes resolved to the same identifier.
    #[error("Duplicate node id '{node_id}'")]
    DuplicateNode {
        /// The duplicated identifier.
        node_id: String,
    },

    /// A name is not usable as a node identifier segment.
    #[error("Invalid node name '{name}': {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// No variable with the given identifier.
    #[error("Variable '{node_id}' not found")]
    VariableNotFound {
        /// The requested identifier.
        node_id: String,
    },

    /// The front end was attached more than once.
    #[error("Address space is already attached to a front end")]
    AlreadyAttached,

    /// The front end refused a node.
    #[error("Front end rejected node '{node_id}': {message}")]
    FrontEnd {
        /// The rejected node.
        node_id: String,
        /// Error message.
        message: String,
    },
}

impl AddressSpaceError {
    /// Creates a variable-not-found error.
    pub fn variable_not_found(node_id: impl Into<String>) -> Self {
        Self::VariableNotFound {
            node_id: node_id.into(),
        }
    }

    /// Creates a front-end error.
    pub fn front_end(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FrontEnd {
            node_id: node_id.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// SchedulerError
// =============================================================================

/// Errors raised by the recurring task scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A task with this key is already scheduled.
    #[error("Task '{key}' is already scheduled")]
    AlreadyScheduled {
        /// Task key.
        key: String,
    },

    /// No task with this key.
    #[error("Task '{key}' not found")]
    NotFound {
        /// Task key.
        key: String,
    },

    /// The scheduler has been shut down.
    #[error("Scheduler is shut down")]
    ShutDown,
}

// =============================================================================
// Result aliases
// =============================================================================

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type for address-space operations.
pub type AddressSpaceResult<T> = Result<T, AddressSpaceError>;

// =============================================================================
// Tests
// =============================================================================
