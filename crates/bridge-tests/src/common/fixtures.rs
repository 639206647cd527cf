// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built test data shared by the integration suites.

use bridge_core::{ClientKind, GroupDefinition, SourceAddress};

// =============================================================================
// Source Fixtures
// =============================================================================

/// Standard source addresses.
pub struct SourceFixtures;

impl SourceFixtures {
    /// The Matrikon simulation server feeding the pasteurization line.
    pub const CLASSIC_URL: &'static str = "opcda://192.168.0.153/Matrikon.OPC.Simulation.1";

    /// A UA server on the plant network.
    pub const UNIFIED_URL: &'static str = "opc.tcp://192.168.0.20:4840";

    /// Classic source.
    pub fn classic() -> SourceAddress {
        SourceAddress::new(Self::CLASSIC_URL, ClientKind::Classic)
    }

    /// Unified source.
    pub fn unified() -> SourceAddress {
        SourceAddress::new(Self::UNIFIED_URL, ClientKind::Unified)
    }

    /// `count` distinct unified sources.
    pub fn unified_batch(count: usize) -> Vec<SourceAddress> {
        (0..count)
            .map(|i| SourceAddress::new(format!("opc.tcp://10.0.0.{}:4840", i + 1), ClientKind::Unified))
            .collect()
    }
}

// =============================================================================
// Group Fixtures
// =============================================================================

/// Standard group definitions.
pub struct GroupFixtures;

impl GroupFixtures {
    /// The two plant lines, each with a single `Switch`.
    pub fn plant() -> Vec<GroupDefinition> {
        vec![
            GroupDefinition::new("Pasteurization", "Pasteurization line").with_variable("Switch", "Line running"),
            GroupDefinition::new("Cooling", "Cooling line").with_variable("Switch", "Line running"),
        ]
    }
}

// =============================================================================
// Config Fixtures
// =============================================================================

/// Configuration documents.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// A complete YAML configuration with one simulated source.
    pub fn plant_yaml() -> &'static str {
        r#"
server:
  enabled: false
sources:
  - url: "opcda://192.168.0.153/Matrikon.OPC.Simulation.1"
    simulated: true
    initial_values:
      Pasteurization.TestMonitor: 3.5
      Pasteurization.TestSwitch: true
  - url: "opc.tcp://192.168.0.20:4840"
groups:
  - name: Pasteurization
    description: Pasteurization line
    variables:
      - name: Switch
  - name: Cooling
    variables:
      - name: Switch
supervisor:
  interval_ms: 10000
logging:
  level: debug
"#
    }

    /// The same configuration as TOML.
    pub fn plant_toml() -> &'static str {
        r#"
[server]
enabled = false

[[sources]]
url = "opcda://192.168.0.153/Matrikon.OPC.Simulation.1"
simulated = true

[sources.initial_values]
"Pasteurization.TestMonitor" = 3.5
"Pasteurization.TestSwitch" = true

[[sources]]
url = "opc.tcp://192.168.0.20:4840"

[[groups]]
name = "Pasteurization"
description = "Pasteurization line"
variables = [{ name = "Switch" }]

[[groups]]
name = "Cooling"
variables = [{ name = "Switch" }]
"#
    }
}
