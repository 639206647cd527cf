// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loader.
//!
//! Loading runs in a fixed order:
//!
//! ```text
//! read file ─▶ resolve ${VAR} / ${VAR:default} ─▶ parse (by extension)
//!           ─▶ apply BRIDGE_* overrides ─▶ validate
//! ```
//!
//! # Environment Overrides
//!
//! | Variable                          | Field                     |
//! |-----------------------------------|---------------------------|
//! | `BRIDGE_LOG_LEVEL`                | `logging.level`           |
//! | `BRIDGE_SERVER_ENABLED`           | `server.enabled`          |
//! | `BRIDGE_SERVER_PORT`              | `server.port`             |
//! | `BRIDGE_SUPERVISOR_INTERVAL_MS`   | `supervisor.interval_ms`  |
//! | `BRIDGE_SOURCES_<n>_URL`          | `sources[n].url`          |
//! | `BRIDGE_SOURCES_<n>_SIMULATED`    | `sources[n].simulated`    |

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{BridgeConfig, LogLevel};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "BRIDGE";

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "bridge.yaml";

// =============================================================================
// ConfigLoader
// =============================================================================

/// Loads and validates [`BridgeConfig`] documents.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_prefix: String,
    resolve_env_vars: bool,
}

impl ConfigLoader {
    /// Creates a loader with the `BRIDGE` prefix and environment handling on.
    pub fn new() -> Self {
        Self {
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            resolve_env_vars: true,
        }
    }

    /// Creates a builder.
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::new()
    }

    /// Sets the prefix of override variables.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables placeholders and overrides.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Loads configuration from a file.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<BridgeConfig> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let content = self.read_file(path)?;
        let format = ConfigFormat::from_path(path)?;
        let mut config = self.parse_content(&content, format, path)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        config.validate()?;

        info!(
            sources = config.sources.len(),
            groups = config.groups.len(),
            variables = config.variable_count(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Loads configuration from a string.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<BridgeConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };
        let mut config: BridgeConfig = parse_str(&content, format)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn read_file(&self, path: &Path) -> ConfigResult<String> {
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
    }

    fn parse_content(
        &self,
        content: &str,
        format: ConfigFormat,
        path: &Path,
    ) -> ConfigResult<BridgeConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };

        if format == ConfigFormat::Yaml {
            return serde_yaml::from_str(&content).map_err(|e| match e.location() {
                Some(location) => ConfigError::parse_at_line(path, e.to_string(), location.line()),
                None => ConfigError::parse(path, e.to_string()),
            });
        }

        parse_str(&content, format).map_err(|e| match e {
            ConfigError::Serialization { message } => ConfigError::parse(path, message),
            other => other,
        })
    }

    /// Replaces `${VAR}` and `${VAR:default}` with environment values.
    ///
    /// Unset variables without a default are kept verbatim, so the document
    /// usually fails validation at that field.
    fn resolve_env_placeholders(&self, content: &str) -> String {
        let mut result = String::with_capacity(content.len());
        let mut chars = content.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' || chars.peek() != Some(&'{') {
                result.push(c);
                continue;
            }
            chars.next();

            let mut body = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                body.push(c);
            }

            if !closed {
                result.push_str("${");
                result.push_str(&body);
                continue;
            }

            let (name, default) = match body.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (body.as_str(), None),
            };

            match (env::var(name), default) {
                (Ok(value), _) => result.push_str(&value),
                (Err(_), Some(default)) => result.push_str(default),
                (Err(_), None) => {
                    warn!(variable = name, "Environment variable not found");
                    result.push_str("${");
                    result.push_str(name);
                    result.push('}');
                }
            }
        }

        result
    }

    fn apply_env_overrides(&self, config: &mut BridgeConfig) -> ConfigResult<()> {
        let prefix = &self.env_prefix;

        if let Some(value) = self.var(&format!("{}_LOG_LEVEL", prefix)) {
            config.logging.level = LogLevel::parse(&value).ok_or_else(|| {
                ConfigError::invalid_env_var(
                    format!("{}_LOG_LEVEL", prefix),
                    "expected trace, debug, info, warn or error",
                )
            })?;
        }

        if let Some(value) = self.var(&format!("{}_SERVER_ENABLED", prefix)) {
            config.server.enabled = parse_bool(&value);
        }
        if let Some(value) = self.var(&format!("{}_SERVER_PORT", prefix)) {
            config.server.port = parse_number(&format!("{}_SERVER_PORT", prefix), &value)?;
        }
        if let Some(value) = self.var(&format!("{}_SUPERVISOR_INTERVAL_MS", prefix)) {
            config.supervisor.interval_ms =
                parse_number(&format!("{}_SUPERVISOR_INTERVAL_MS", prefix), &value)?;
        }

        for (i, source) in config.sources.iter_mut().enumerate() {
            let source_prefix = format!("{}_SOURCES_{}", prefix, i);

            if let Some(value) = self.var(&format!("{}_URL", source_prefix)) {
                source.url = value;
            }
            if let Some(value) = self.var(&format!("{}_SIMULATED", source_prefix)) {
                source.simulated = parse_bool(&value);
            }
        }

        Ok(())
    }

    fn var(&self, name: &str) -> Option<String> {
        let value = env::var(name).ok()?;
        debug!(variable = name, "Applying environment override");
        Some(value)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigLoaderBuilder
// =============================================================================

/// Builder for [`ConfigLoader`].
#[derive(Debug, Default)]
pub struct ConfigLoaderBuilder {
    env_prefix: Option<String>,
    resolve_env_vars: Option<bool>,
}

impl ConfigLoaderBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the environment variable prefix.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Enables or disables environment handling.
    pub fn resolve_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = Some(enabled);
        self
    }

    /// Builds the loader.
    pub fn build(self) -> ConfigLoader {
        let defaults = ConfigLoader::new();
        ConfigLoader {
            env_prefix: self.env_prefix.unwrap_or(defaults.env_prefix),
            resolve_env_vars: self.resolve_env_vars.unwrap_or(defaults.resolve_env_vars),
        }
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_str<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> ConfigResult<T> {
    match format {
        ConfigFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "enabled"
    )
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid_env_var(name, "expected a number"))
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads configuration from a file with default settings.
///
/// ```no_run
/// use bridge_config::load_config;
///
/// let config = load_config("bridge.yaml").unwrap();
/// println!("sources: {}", config.sources.len());
/// ```
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<BridgeConfig> {
    ConfigLoader::new().load(path)
}

/// Loads configuration from a string with the specified format.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<BridgeConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

/// Returns the path to load when none is given.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

// =============================================================================
// Tests
// =============================================================================
