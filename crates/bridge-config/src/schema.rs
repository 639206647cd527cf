// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema definitions.
//!
//! ```yaml
//! server:
//!   enabled: true
//!   port: 4840
//! sources:
//!   - url: opcda://192.168.0.153/Matrikon.OPC.Simulation.1
//!     simulated: true
//!     initial_values:
//!       Pasteurization.TestSwitch: true
//!       Pasteurization.TestMonitor: 3
//! groups:
//!   - name: Pasteurization
//!     description: Pasteurization line
//!     variables:
//!       - name: Switch
//! supervisor:
//!   interval_ms: 10000
//! logging:
//!   level: info
//! ```

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use bridge_core::address_space::validate_node_name;
use bridge_core::{AddressSpaceError, GroupDefinition, SourceAddress, SupervisorConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Constants
// =============================================================================

/// Default Ping/Patrol interval in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 10_000;

/// Default connect and probe bound in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Default bound on disposing one client in milliseconds.
pub const DEFAULT_DISPOSE_TIMEOUT_MS: u64 = 2_000;

/// Default shutdown grace in milliseconds.
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 5_000;

/// Default monitor interval in milliseconds.
pub const DEFAULT_MONITOR_INTERVAL_MS: u64 = 100;

/// Default UA server port.
pub const DEFAULT_SERVER_PORT: u16 = 4840;

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Front-end server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Source addresses, in start order.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// Variable groups of the address space.
    #[serde(default)]
    pub groups: Vec<GroupDefinition>,

    /// Supervisor timings.
    #[serde(default)]
    pub supervisor: SupervisorSection,

    /// Client settings.
    #[serde(default)]
    pub client: ClientSection,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Validates the entire configuration.
    ///
    /// Checks that every source resolves to a known protocol family, that
    /// source URLs are unique, that group and variable names are usable node
    /// id segments and unique in their scope, and that timings are non-zero.
    pub fn validate(&self) -> ConfigResult<()> {
        self.server.validate()?;

        let mut urls = HashSet::new();
        for (i, source) in self.sources.iter().enumerate() {
            source.validate(i)?;
            if !urls.insert(source.url.as_str()) {
                return Err(ConfigError::validation(
                    format!("sources[{}].url", i),
                    format!("duplicate source '{}'", source.url),
                ));
            }
        }

        let mut groups = HashSet::new();
        for (i, group) in self.groups.iter().enumerate() {
            check_name(&format!("groups[{}].name", i), &group.name)?;
            if !groups.insert(group.name.as_str()) {
                return Err(AddressSpaceError::DuplicateNode {
                    node_id: group.name.clone(),
                }
                .into());
            }

            let mut variables = HashSet::new();
            for (j, variable) in group.variables.iter().enumerate() {
                check_name(&format!("groups[{}].variables[{}].name", i, j), &variable.name)?;
                if !variables.insert(variable.name.as_str()) {
                    return Err(AddressSpaceError::DuplicateNode {
                        node_id: format!("{}.{}", group.name, variable.name),
                    }
                    .into());
                }
            }
        }

        self.supervisor.validate()?;
        self.client.validate()?;
        Ok(())
    }

    /// Resolves every source into a [`SourceAddress`].
    pub fn resolve_sources(&self) -> ConfigResult<Vec<SourceAddress>> {
        self.sources.iter().map(SourceConfig::address).collect()
    }

    /// Returns a source configuration by URL.
    pub fn get_source(&self, url: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.url == url)
    }

    /// Returns the total number of variables across all groups.
    pub fn variable_count(&self) -> usize {
        self.groups.iter().map(|g| g.variables.len()).sum()
    }
}

fn check_name(field: &str, name: &str) -> ConfigResult<()> {
    validate_node_name(name).map_err(|e| match e {
        AddressSpaceError::InvalidName { reason, .. } => ConfigError::validation(field, reason),
        other => other.into(),
    })
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Front-end server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Serve the address space over OPC UA. Without it the bridge runs
    /// headless and only logs variable changes.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Application name announced by the server.
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Namespace URI of the bridge nodes.
    #[serde(default = "default_namespace_uri")]
    pub namespace_uri: String,
}

fn default_enabled() -> bool {
    true
}

fn default_application_name() -> String {
    "OPC Bridge".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_SERVER_PORT
}

fn default_namespace_uri() -> String {
    "urn:opc-bridge".to_string()
}

impl ServerConfig {
    /// Validates the server configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.enabled && self.port == 0 {
            return Err(ConfigError::validation("server.port", "cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::validation("server.host", "cannot be empty"));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            application_name: default_application_name(),
            host: default_host(),
            port: default_port(),
            namespace_uri: default_namespace_uri(),
        }
    }
}

// =============================================================================
// Source Configuration
// =============================================================================

/// One configured source address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Endpoint URL.
    pub url: String,

    /// Protocol family (`classic` or `unified`). Inferred from the URL scheme
    /// when absent.
    #[serde(default)]
    pub family: Option<String>,

    /// Serve this source from the in-memory simulated stack.
    #[serde(default)]
    pub simulated: bool,

    /// Tag values the simulated stack starts with.
    #[serde(default)]
    pub initial_values: HashMap<String, serde_json::Value>,
}

impl SourceConfig {
    /// Creates a source with an inferred family.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            family: None,
            simulated: false,
            initial_values: HashMap::new(),
        }
    }

    /// Resolves the source into a [`SourceAddress`].
    pub fn address(&self) -> ConfigResult<SourceAddress> {
        SourceAddress::resolve(self.url.clone(), self.family.as_deref())
            .map_err(|e| ConfigError::invalid_source(&self.url, e))
    }

    fn validate(&self, index: usize) -> ConfigResult<()> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::validation(
                format!("sources[{}].url", index),
                "cannot be empty",
            ));
        }
        if !self.simulated && !self.initial_values.is_empty() {
            return Err(ConfigError::validation(
                format!("sources[{}].initial_values", index),
                "only allowed on simulated sources",
            ));
        }
        self.address().map(|_| ())
    }
}

// =============================================================================
// Supervisor Configuration
// =============================================================================

/// Supervisor timings in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupervisorSection {
    /// Ping/Patrol interval.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Bound on connect attempts and liveness probes.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Bound on disposing one removed client.
    #[serde(default = "default_dispose_timeout_ms")]
    pub dispose_timeout_ms: u64,

    /// Bound on disposing every client at shutdown.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_dispose_timeout_ms() -> u64 {
    DEFAULT_DISPOSE_TIMEOUT_MS
}

fn default_shutdown_grace_ms() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_MS
}

impl SupervisorSection {
    /// Validates the supervisor timings.
    pub fn validate(&self) -> ConfigResult<()> {
        let fields = [
            ("supervisor.interval_ms", self.interval_ms),
            ("supervisor.connect_timeout_ms", self.connect_timeout_ms),
            ("supervisor.dispose_timeout_ms", self.dispose_timeout_ms),
            ("supervisor.shutdown_grace_ms", self.shutdown_grace_ms),
        ];
        for (field, value) in fields {
            if value == 0 {
                return Err(ConfigError::validation(field, "must be greater than 0"));
            }
        }
        Ok(())
    }

    /// Converts to the runtime supervisor configuration.
    pub fn to_supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            interval: Duration::from_millis(self.interval_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            dispose_timeout: Duration::from_millis(self.dispose_timeout_ms),
            shutdown_grace: Duration::from_millis(self.shutdown_grace_ms),
        }
    }
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            dispose_timeout_ms: default_dispose_timeout_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Settings shared by every client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    /// Monitor sampling interval.
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,

    /// Application name sent when opening sessions.
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Requested session timeout.
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
}

fn default_monitor_interval_ms() -> u64 {
    DEFAULT_MONITOR_INTERVAL_MS
}

fn default_session_timeout_ms() -> u64 {
    60_000
}

impl ClientSection {
    /// Validates the client settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.monitor_interval_ms == 0 {
            return Err(ConfigError::validation(
                "client.monitor_interval_ms",
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Returns the monitor interval.
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    /// Returns the session timeout.
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            monitor_interval_ms: default_monitor_interval_ms(),
            application_name: default_application_name(),
            session_timeout_ms: default_session_timeout_ms(),
        }
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warn level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the filter directive for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parses a level name, accepting `warning` for `warn`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Single-line compact text.
    Compact,
    /// JSON lines for log shippers.
    Json,
}

impl LogFormat {
    /// Returns the format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::ClientKind;

    fn config_with_groups(groups: Vec<GroupDefinition>) -> BridgeConfig {
        BridgeConfig {
            groups,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert!(config.server.enabled);
        assert_eq!(config.server.port, 4840);
        assert_eq!(config.supervisor.to_supervisor_config(), SupervisorConfig::default());
        assert_eq!(config.client.monitor_interval(), Duration::from_millis(100));
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_family_inferred_from_scheme() {
        let config = BridgeConfig {
            sources: vec![
                SourceConfig::new("opcda://192.168.0.153/Matrikon.OPC.Simulation.1"),
                SourceConfig::new("opc.tcp://plc:4840"),
            ],
            ..Default::default()
        };
        let addresses = config.resolve_sources().unwrap();
        assert_eq!(addresses[0].kind(), ClientKind::Classic);
        assert_eq!(addresses[1].kind(), ClientKind::Unified);
    }

    #[test]
    fn test_unknown_family_rejected() {
        let mut source = SourceConfig::new("opc.tcp://plc:4840");
        source.family = Some("bacnet".to_string());
        let config = BridgeConfig {
            sources: vec![source],
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Source {
                source: bridge_core::ClientError::UnknownProtocolFamily { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_source_rejected() {
        let config = BridgeConfig {
            sources: vec![
                SourceConfig::new("opc.tcp://plc:4840"),
                SourceConfig::new("opc.tcp://plc:4840"),
            ],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn test_group_names_checked() {
        let dotted = config_with_groups(vec![GroupDefinition::new("Line.1", "")]);
        assert!(matches!(dotted.validate(), Err(ConfigError::Validation { .. })));

        let duplicate = config_with_groups(vec![
            GroupDefinition::new("Cooling", ""),
            GroupDefinition::new("Cooling", ""),
        ]);
        assert!(matches!(
            duplicate.validate(),
            Err(ConfigError::AddressSpace(AddressSpaceError::DuplicateNode { .. }))
        ));

        let duplicate_variable = config_with_groups(vec![GroupDefinition::new("Cooling", "")
            .with_variable("Switch", "")
            .with_variable("Switch", "")]);
        assert!(duplicate_variable.validate().is_err());
    }

    #[test]
    fn test_initial_values_need_simulated_source() {
        let mut source = SourceConfig::new("opc.tcp://plc:4840");
        source
            .initial_values
            .insert("Line1.Speed".to_string(), serde_json::json!(3));
        let config = BridgeConfig {
            sources: vec![source],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = BridgeConfig::default();
        config.supervisor.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("loud"), None);
        assert_eq!(LogLevel::Debug.to_string(), "debug");
    }
}
