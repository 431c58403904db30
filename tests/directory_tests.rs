mod common;

use common::{sample_devices, sample_directory, tags, FakeApi};
use tailnet_admin::directory::DeviceDirectory;
use tailnet_admin::error::AdminError;

#[tokio::test]
async fn test_load_keeps_service_order() -> anyhow::Result<()> {
    let api = FakeApi::new(sample_devices());
    let directory = DeviceDirectory::load(&api).await?;

    let ids: Vec<&str> = directory.devices().iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
    assert_eq!(directory.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_listing_failure_is_directory_unavailable() {
    let api = FakeApi::unavailable();
    let err = DeviceDirectory::load(&api).await.unwrap_err();

    assert!(matches!(err, AdminError::DirectoryUnavailable(_)));
    assert!(err.to_string().contains("503"));
}

#[test]
fn test_device_tags_lookup() {
    let directory = sample_directory();

    assert_eq!(directory.device_tags("C"), Some(&tags(&["prod", "dev"])));
    assert_eq!(directory.device_tags("missing"), None);
}

#[test]
fn test_tag_inventory_groups_devices_by_tag() {
    let directory = sample_directory();
    let inventory = directory.tag_inventory();

    let tags: Vec<&str> = inventory.keys().copied().collect();
    assert_eq!(tags, vec!["dev", "prod"]);

    let prod: Vec<&str> = inventory["prod"].iter().map(|d| d.id.as_str()).collect();
    assert_eq!(prod, vec!["A", "C"]);
}

#[test]
fn test_filter_by_name_and_tag() {
    let directory = sample_directory();

    let by_name = directory.filter(Some("AR"), None);
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].id, "C");

    let by_tag = directory.filter(None, Some("dev"));
    let ids: Vec<&str> = by_tag.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["B", "C"]);

    assert_eq!(directory.filter(None, None).len(), 3);
    assert!(directory.filter(Some("alpha"), Some("dev")).is_empty());
}
