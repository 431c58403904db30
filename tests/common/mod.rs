// Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use tailnet_admin::api::DeviceApi;
use tailnet_admin::directory::{Device, DeviceDirectory};
use tailnet_admin::error::ApiError;
use tailnet_admin::tag::TagSet;

/// In-memory stand-in for the Tailscale API
///
/// Records every write, and can be told to reject the listing or the
/// writes for specific devices.
#[derive(Default)]
pub struct FakeApi {
    devices: Vec<Device>,
    listing_fails: bool,
    failing_devices: HashSet<String>,
    writes: Mutex<Vec<(String, TagSet)>>,
}

impl FakeApi {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            devices,
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            listing_fails: true,
            ..Self::default()
        }
    }

    pub fn failing_writes_for(mut self, device_id: &str) -> Self {
        self.failing_devices.insert(device_id.to_string());
        self
    }

    pub fn writes(&self) -> Vec<(String, TagSet)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn written_ids(&self) -> Vec<String> {
        self.writes().into_iter().map(|(id, _)| id).collect()
    }
}

#[async_trait]
impl DeviceApi for FakeApi {
    async fn list_devices(&self) -> Result<Vec<Device>, ApiError> {
        if self.listing_fails {
            return Err(ApiError::Status {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(self.devices.clone())
    }

    async fn set_device_tags(&self, device_id: &str, tags: &TagSet) -> Result<(), ApiError> {
        self.writes
            .lock()
            .unwrap()
            .push((device_id.to_string(), tags.clone()));

        if self.failing_devices.contains(device_id) {
            return Err(ApiError::Status {
                status: 403,
                message: format!("not allowed to tag {}", device_id),
            });
        }
        Ok(())
    }
}

pub fn tags(items: &[&str]) -> TagSet {
    items.iter().map(|s| s.to_string()).collect()
}

/// A: {prod}, B: {dev}, C: {prod, dev}
pub fn sample_devices() -> Vec<Device> {
    vec![
        Device::new("A", "alpha", ["prod"]),
        Device::new("B", "bravo", ["dev"]),
        Device::new("C", "charlie", ["prod", "dev"]),
    ]
}

pub fn sample_directory() -> DeviceDirectory {
    DeviceDirectory::from_devices(sample_devices())
}
