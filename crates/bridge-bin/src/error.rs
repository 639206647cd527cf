// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the bridge binary.

use bridge_config::ConfigError;
use bridge_core::{AddressSpaceError, BridgeError};
use thiserror::Error;

/// Result type alias for bridge-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Failures of the bridge binary, one variant per startup stage.
///
/// | Stage | Exit code |
/// |---|---|
/// | configuration missing, unreadable or invalid | 1 |
/// | address space build or front-end attach | 2 |
/// | front end construction or start | 3 |
/// | supervisor start | 4 |
/// | command output rendering | 5 |
#[derive(Debug, Error)]
pub enum BinError {
    /// Neither a configuration file nor an in-memory configuration was given.
    #[error("No configuration provided")]
    NoConfiguration,

    /// Configuration could not be loaded or validated.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The address space could not be built or attached to the front end.
    #[error("Address space error: {0}")]
    AddressSpace(#[from] AddressSpaceError),

    /// The front end could not be created or started.
    #[error("Front end failed: {0}")]
    FrontEnd(#[source] BridgeError),

    /// Connection supervision could not be started.
    #[error("Supervisor failed to start: {0}")]
    Supervisor(#[source] BridgeError),

    /// A command could not render its output.
    #[error("Cannot render output: {0}")]
    Output(String),

    /// Error with context.
    #[error("{context}: {source}")]
    WithContext {
        /// The context description.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Creates an output rendering error.
    pub fn output(err: impl std::fmt::Display) -> Self {
        Self::Output(err.to_string())
    }

    /// Adds context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoConfiguration | Self::Config(_) => 1,
            Self::AddressSpace(_) => 2,
            Self::FrontEnd(_) => 3,
            Self::Supervisor(_) => 4,
            Self::Output(_) => 5,
            Self::WithContext { source, .. } => source.exit_code(),
        }
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Reports an error and its cause chain on stderr.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {}", error);

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {}", cause);
        source = cause.source();
    }
}

/// Reports an error and exits with the appropriate code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_context() {
        let err = BinError::NoConfiguration.with_context("validate");
        assert_eq!(err.to_string(), "validate: No configuration provided");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_codes_follow_startup_stage() {
        let space: BinError = AddressSpaceError::DuplicateNode {
            node_id: "Cooling".to_string(),
        }
        .into();
        assert_eq!(space.exit_code(), 2);
        assert_eq!(BinError::FrontEnd(BridgeError::internal("x")).exit_code(), 3);
        assert_eq!(BinError::Supervisor(BridgeError::internal("x")).exit_code(), 4);
        assert_eq!(BinError::output("x").exit_code(), 5);
    }
}
