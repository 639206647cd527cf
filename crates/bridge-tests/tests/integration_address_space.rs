// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Address Space Integration Tests
//!
//! - `test_build_*`: Groups and variables built from definitions
//! - `test_attach_*`: Registration with a front end
//! - `test_set_value_*`: Value, quality and timestamp updates

use bridge_core::{
    AccessLevel, AddressSpace, AddressSpaceError, GroupDefinition, Quality, Value,
};
use bridge_tests::prelude::*;
use chrono::Utc;

// =============================================================================
// Build
// =============================================================================

#[test]
fn test_build_plant_groups() {
    let space = AddressSpace::build(&GroupFixtures::plant()).unwrap();

    let ids: Vec<&str> = space.groups().iter().map(|g| g.node_id().as_str()).collect();
    assert_eq!(ids, vec!["Pasteurization", "Cooling"]);

    let variables: Vec<&str> = space.variables().map(|v| v.node_id().as_str()).collect();
    assert_eq!(variables, vec!["Pasteurization.Switch", "Cooling.Switch"]);

    let pasteurization = space.group("Pasteurization").unwrap();
    assert_eq!(pasteurization.description(), "Pasteurization line");

    let switch = space.variable("Cooling.Switch").unwrap();
    assert_eq!(switch.name(), "Switch");
    assert_eq!(switch.group_id().as_str(), "Cooling");
    assert_eq!(switch.group().unwrap().node_id().as_str(), "Cooling");
    assert_eq!(switch.access_level(), AccessLevel::CurrentReadOrWrite);
    assert!(!switch.historizing());
}

#[test]
fn test_build_same_variable_name_in_different_groups() {
    let space = AddressSpace::build(&GroupFixtures::plant()).unwrap();
    assert_eq!(space.variable_count(), 2);
    assert!(space.variable("Switch").is_none());
}

#[test]
fn test_build_rejects_duplicate_group() {
    let err = AddressSpace::build(&[
        GroupDefinition::new("Cooling", ""),
        GroupDefinition::new("Cooling", "again"),
    ])
    .err()
    .unwrap();
    assert!(matches!(err, AddressSpaceError::DuplicateNode { node_id } if node_id == "Cooling"));
}

#[test]
fn test_build_rejects_duplicate_variable() {
    let err = AddressSpace::build(&[GroupDefinition::new("Cooling", "")
        .with_variable("Switch", "")
        .with_variable("Switch", "")])
    .err()
    .unwrap();
    assert!(matches!(err, AddressSpaceError::DuplicateNode { node_id } if node_id == "Cooling.Switch"));
}

#[test]
fn test_build_rejects_dotted_and_empty_names() {
    for name in ["Line.1", "", "  "] {
        let result = AddressSpace::build(&[GroupDefinition::new(name, "")]);
        assert!(
            matches!(result, Err(AddressSpaceError::InvalidName { .. })),
            "'{name}' should be rejected"
        );
    }

    let result = AddressSpace::build(&[GroupDefinition::new("Cooling", "").with_variable("A.B", "")]);
    assert!(matches!(result, Err(AddressSpaceError::InvalidName { .. })));
}

// =============================================================================
// Attach
// =============================================================================

#[test]
fn test_attach_registers_groups_before_their_variables() {
    let space = AddressSpace::build(&GroupFixtures::plant()).unwrap();
    let front_end = RecordingFrontEnd::new();

    space.attach(front_end.clone()).unwrap();

    assert!(space.is_attached());
    assert_eq!(
        front_end.registered(),
        vec!["Pasteurization", "Pasteurization.Switch", "Cooling", "Cooling.Switch"]
    );
}

#[test]
fn test_attach_twice_fails() {
    let space = AddressSpace::build(&GroupFixtures::plant()).unwrap();
    space.attach(RecordingFrontEnd::new()).unwrap();

    let err = space.attach(RecordingFrontEnd::new()).unwrap_err();
    assert!(matches!(err, AddressSpaceError::AlreadyAttached));
}

#[test]
fn test_attach_surfaces_front_end_rejection() {
    let space = AddressSpace::build(&GroupFixtures::plant()).unwrap();
    let front_end = RecordingFrontEnd::new();
    front_end.reject("Cooling.Switch");

    let err = space.attach(front_end).unwrap_err();
    assert!(matches!(err, AddressSpaceError::FrontEnd { node_id, .. } if node_id == "Cooling.Switch"));
}

// =============================================================================
// SetValue
// =============================================================================

#[test]
fn test_set_value_stamps_call_time_and_good_quality() {
    let space = AddressSpace::build(&GroupFixtures::plant()).unwrap();
    let switch = space.variable("Pasteurization.Switch").unwrap();
    switch.set_quality(Quality::Bad);

    let before = Utc::now();
    let first = switch.set_value(false);
    let after = Utc::now();
    assert!(first.snapshot.timestamp >= before && first.snapshot.timestamp <= after);
    assert_eq!(first.snapshot.quality, Quality::Good);

    let second = switch.set_value(false);
    assert_eq!(second.snapshot.quality, Quality::Good);
    assert_eq!(second.snapshot.value, Value::Bool(false));
    assert!(second.snapshot.timestamp >= first.snapshot.timestamp);
}

#[test]
fn test_set_value_notifies_front_end_on_every_call() {
    let space = AddressSpace::build(&GroupFixtures::plant()).unwrap();
    let front_end = RecordingFrontEnd::new();
    space.attach(front_end.clone()).unwrap();

    space.set_value("Cooling.Switch", false).unwrap();
    space.set_value("Cooling.Switch", false).unwrap();

    let changes = front_end.changes_for("Cooling.Switch");
    assert_eq!(changes.len(), 2);
    assert!(changes.iter().all(|c| c.quality == Quality::Good));
    assert!(changes[1].timestamp >= changes[0].timestamp);
    assert!(front_end.changes_for("Pasteurization.Switch").is_empty());
}

#[test]
fn test_set_value_unknown_variable_fails() {
    let space = AddressSpace::build(&GroupFixtures::plant()).unwrap();
    let err = space.set_value("Cooling.Pump", true).unwrap_err();
    assert!(matches!(err, AddressSpaceError::VariableNotFound { .. }));
}

#[tokio::test]
async fn test_set_value_broadcasts_to_subscribers() {
    let space = AddressSpace::build(&GroupFixtures::plant()).unwrap();
    let switch = space.variable("Pasteurization.Switch").unwrap();
    let mut changes = switch.subscribe();

    switch.set_value(true);

    let change = changes.recv().await.unwrap();
    assert_eq!(change.node_id.as_str(), "Pasteurization.Switch");
    assert_eq!(change.snapshot.value, Value::Bool(true));
}
