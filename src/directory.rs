//! The tailnet's device list, fetched once per command
//!
//! [`DeviceDirectory::load`] performs the only read of the device list in a
//! command. Everything downstream (resolution, planning, reporting) works on
//! the loaded snapshot; nothing re-reads a device's tags from the service.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::api::DeviceApi;
use crate::error::AdminError;
use crate::tag::TagSet;

/// A device in the tailnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Stable identifier assigned by the service
    pub id: String,
    /// Display name (the device's hostname)
    pub name: String,
    /// Current tags, without the `tag:` prefix
    pub tags: TagSet,
    /// Primary tailnet address, empty if unknown
    pub ip: String,
    pub os: String,
    pub last_seen: String,
}

impl Device {
    /// Creates a device with only the fields the tag engine cares about
    pub fn new<I, S>(id: impl Into<String>, name: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            tags: tags.into_iter().map(Into::into).collect(),
            ip: String::new(),
            os: String::new(),
            last_seen: String::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Read-only snapshot of every device in the tailnet, in service order
#[derive(Debug, Clone, Default)]
pub struct DeviceDirectory {
    devices: Vec<Device>,
}

impl DeviceDirectory {
    /// Fetches the device list once
    ///
    /// Any failure of the listing call is fatal for the command: resolving
    /// identifiers against a partial directory could silently skip devices.
    pub async fn load<A>(api: &A) -> Result<Self, AdminError>
    where
        A: DeviceApi + ?Sized,
    {
        debug!("Loading device directory");
        let devices = api
            .list_devices()
            .await
            .map_err(AdminError::DirectoryUnavailable)?;

        info!("Loaded {} devices", devices.len());
        Ok(Self::from_devices(devices))
    }

    pub fn from_devices(devices: Vec<Device>) -> Self {
        Self { devices }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Looks a device up by its exact ID
    pub fn get(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// Current tags of a device, as of the load
    pub fn device_tags(&self, id: &str) -> Option<&TagSet> {
        self.get(id).map(|d| &d.tags)
    }

    /// Every tag in use, mapped to the devices carrying it
    ///
    /// Tags are sorted; devices keep directory order.
    pub fn tag_inventory(&self) -> BTreeMap<&str, Vec<&Device>> {
        let mut inventory: BTreeMap<&str, Vec<&Device>> = BTreeMap::new();
        for device in &self.devices {
            for tag in &device.tags {
                inventory.entry(tag.as_str()).or_default().push(device);
            }
        }
        inventory
    }

    /// Devices whose name contains `name` (case-insensitive) and that carry `tag`
    ///
    /// Either filter may be omitted.
    pub fn filter<'a>(&'a self, name: Option<&str>, tag: Option<&str>) -> Vec<&'a Device> {
        let name = name.map(str::to_lowercase);
        self.devices
            .iter()
            .filter(|d| {
                name.as_deref()
                    .map_or(true, |n| d.name.to_lowercase().contains(n))
            })
            .filter(|d| tag.map_or(true, |t| d.has_tag(t)))
            .collect()
    }
}
