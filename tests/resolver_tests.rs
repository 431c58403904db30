mod common;

use common::sample_directory;
use tailnet_admin::directory::{Device, DeviceDirectory};
use tailnet_admin::resolver::{resolve, resolve_one, Target, UnresolvedReason};

fn ids(devices: &[Device]) -> Vec<&str> {
    devices.iter().map(|d| d.id.as_str()).collect()
}

#[test]
fn test_reports_unknown_identifier() {
    let directory = sample_directory();
    let identifiers = vec!["A".to_string(), "ghost".to_string()];

    let resolution = resolve(Target::Devices(&identifiers), &directory);

    assert_eq!(ids(&resolution.matched), vec!["A"]);
    assert_eq!(resolution.unmatched.len(), 1);
    assert_eq!(resolution.unmatched[0].identifier, "ghost");
    assert_eq!(resolution.unmatched[0].reason, UnresolvedReason::NotFound);
    assert_eq!(resolution.unmatched[0].reason.to_string(), "not found");
}

#[test]
fn test_matches_name_case_insensitively() {
    let directory = sample_directory();
    let identifiers = vec!["BRAVO".to_string(), "Charlie".to_string()];

    let resolution = resolve(Target::Devices(&identifiers), &directory);

    assert_eq!(ids(&resolution.matched), vec!["B", "C"]);
    assert!(resolution.unmatched.is_empty());
}

#[test]
fn test_id_match_takes_precedence_over_name() {
    let directory = DeviceDirectory::from_devices(vec![
        Device::new("web", "db-host", ["db"]),
        Device::new("n2", "web", ["web"]),
    ]);

    let device = resolve_one("web", &directory).unwrap();
    assert_eq!(device.name, "db-host");
}

#[test]
fn test_id_match_is_case_sensitive() {
    let directory = sample_directory();
    assert_eq!(
        resolve_one("a", &directory).unwrap_err(),
        UnresolvedReason::NotFound
    );
}

#[test]
fn test_shared_name_is_ambiguous() {
    let directory = DeviceDirectory::from_devices(vec![
        Device::new("n1", "laptop", ["dev"]),
        Device::new("n2", "Laptop", ["dev"]),
        Device::new("n3", "server", ["prod"]),
    ]);
    let identifiers = vec!["laptop".to_string(), "server".to_string()];

    let resolution = resolve(Target::Devices(&identifiers), &directory);

    assert_eq!(ids(&resolution.matched), vec!["n3"]);
    assert_eq!(
        resolution.unmatched[0].reason,
        UnresolvedReason::Ambiguous(vec!["n1".to_string(), "n2".to_string()])
    );
    assert!(resolution.unmatched[0].reason.to_string().starts_with("ambiguous"));
}

#[test]
fn test_all_target_returns_whole_directory() {
    let directory = sample_directory();
    let resolution = resolve(Target::All, &directory);

    assert_eq!(ids(&resolution.matched), vec!["A", "B", "C"]);
    assert!(resolution.unmatched.is_empty());
}

#[test]
fn test_keeps_identifier_order_and_drops_duplicates() {
    let directory = sample_directory();
    let identifiers = vec![
        "C".to_string(),
        "alpha".to_string(),
        "charlie".to_string(),
    ];

    let resolution = resolve(Target::Devices(&identifiers), &directory);

    assert_eq!(ids(&resolution.matched), vec!["C", "A"]);
    assert!(resolution.unmatched.is_empty());
}

#[test]
fn test_blank_identifier_is_not_found() {
    let directory = sample_directory();
    assert_eq!(
        resolve_one("   ", &directory).unwrap_err(),
        UnresolvedReason::NotFound
    );
}

#[test]
fn test_identifier_is_trimmed() {
    let directory = sample_directory();
    assert_eq!(resolve_one(" B ", &directory).unwrap().id, "B");
}
