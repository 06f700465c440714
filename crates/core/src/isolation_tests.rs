// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    missing = { None, DEFAULT_MUTEX_NAME },
    blank = { Some("  "), DEFAULT_MUTEX_NAME },
    named = { Some("deploy-web"), "deploy-web" },
)]
fn mutex_name_defaults(name: Option<&str>, expected: &str) {
    let config = IsolationConfiguration::new(ScriptIsolationLevel::FullIsolation, name, Duration::ZERO);
    assert_eq!(config.mutex_name, expected);
}

#[test]
fn timeout_serializes_as_millis() {
    let config = IsolationConfiguration::new(ScriptIsolationLevel::NoIsolation, None, Duration::from_secs(2));
    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(json["mutex_timeout"], 2000);
    let back: IsolationConfiguration = serde_json::from_value(json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn unbounded_timeout_saturates() {
    let json = serde_json::to_value(IsolationConfiguration::default()).unwrap();
    assert_eq!(json["mutex_timeout"], u64::MAX);
}
