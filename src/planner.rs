//! Computing proposed tag sets
//!
//! [`plan`] is a pure function: given an operation and the candidate devices
//! it returns, for each device, the tags it has and the tags it should have.
//! It performs no I/O, so previews and real runs share the exact same
//! decisions.
//!
//! Tags handed to [`TagOperation`] are expected in normalized form (see
//! [`crate::tag::normalize_tag`]).

use std::fmt;

use serde::Serialize;

use crate::directory::Device;
use crate::resolver::Target;
use crate::tag::{format_tags, TagSet};

/// A bulk tag edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOperation {
    /// Replace `old` with `new` on every device carrying `old`
    Rename { old: String, new: String },
    /// Add `tag` to every device carrying `trigger`
    AddIfHas { trigger: String, tag: String },
    /// Add `tag` to every device lacking `missing`
    AddIfMissing { missing: String, tag: String },
    /// Remove `tag` from the listed devices, or from all devices when the
    /// list is empty
    Remove { tag: String, devices: Vec<String> },
    /// Add `tags` to the listed devices
    Add { devices: Vec<String>, tags: TagSet },
    /// Replace the tags of the listed devices with exactly `tags`
    Set { devices: Vec<String>, tags: TagSet },
}

impl TagOperation {
    /// The devices this operation is scoped to
    pub fn target(&self) -> Target<'_> {
        match self {
            TagOperation::Rename { .. }
            | TagOperation::AddIfHas { .. }
            | TagOperation::AddIfMissing { .. } => Target::All,
            TagOperation::Remove { devices, .. } if devices.is_empty() => Target::All,
            TagOperation::Remove { devices, .. }
            | TagOperation::Add { devices, .. }
            | TagOperation::Set { devices, .. } => Target::Devices(devices),
        }
    }

    /// Tags this device should carry after the operation
    pub fn apply_to(&self, current: &TagSet) -> TagSet {
        match self {
            TagOperation::Rename { old, new } => {
                if !current.contains(old) {
                    return current.clone();
                }
                let mut proposed = current.clone();
                proposed.remove(old);
                proposed.insert(new.clone());
                proposed
            }
            TagOperation::AddIfHas { trigger, tag } => with_tag_if(current, tag, current.contains(trigger)),
            TagOperation::AddIfMissing { missing, tag } => {
                with_tag_if(current, tag, !current.contains(missing))
            }
            TagOperation::Remove { tag, .. } => {
                let mut proposed = current.clone();
                proposed.remove(tag);
                proposed
            }
            TagOperation::Add { tags, .. } => current.union(tags).cloned().collect(),
            TagOperation::Set { tags, .. } => tags.clone(),
        }
    }
}

fn with_tag_if(current: &TagSet, tag: &str, condition: bool) -> TagSet {
    let mut proposed = current.clone();
    if condition {
        proposed.insert(tag.to_string());
    }
    proposed
}

impl fmt::Display for TagOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagOperation::Rename { old, new } => write!(f, "rename tag {} to {}", old, new),
            TagOperation::AddIfHas { trigger, tag } => {
                write!(f, "add tag {} to devices with tag {}", tag, trigger)
            }
            TagOperation::AddIfMissing { missing, tag } => {
                write!(f, "add tag {} to devices without tag {}", tag, missing)
            }
            TagOperation::Remove { tag, devices } if devices.is_empty() => {
                write!(f, "remove tag {} from all devices", tag)
            }
            TagOperation::Remove { tag, devices } => {
                write!(f, "remove tag {} from {} device(s)", tag, devices.len())
            }
            TagOperation::Add { devices, tags } => {
                write!(f, "add tags {} to {} device(s)", format_tags(tags), devices.len())
            }
            TagOperation::Set { devices, tags } => {
                write!(f, "set tags of {} device(s) to {}", devices.len(), format_tags(tags))
            }
        }
    }
}

/// One device's planned change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub device: Device,
    pub current: TagSet,
    pub proposed: TagSet,
}

impl PlanEntry {
    /// Whether applying this entry would change anything
    pub fn is_change(&self) -> bool {
        self.current != self.proposed
    }
}

/// Planned changes for one operation, in candidate order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub entries: Vec<PlanEntry>,
}

impl Plan {
    /// Entries that would change their device
    pub fn changes(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.is_change())
    }

    pub fn change_count(&self) -> usize {
        self.changes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Plans `op` over `candidates`
///
/// Pure: one entry per candidate, in candidate order, including devices
/// whose tags would not change.
///
/// # Examples
///
/// ```
/// use tailnet_admin::directory::Device;
/// use tailnet_admin::planner::{plan, TagOperation};
///
/// let devices = vec![
///     Device::new("1", "web", ["dev"]),
///     Device::new("2", "db", ["prod"]),
/// ];
/// let op = TagOperation::Rename { old: "dev".into(), new: "staging".into() };
///
/// let plan = plan(&op, &devices);
/// assert_eq!(plan.entries.len(), 2);
/// assert_eq!(plan.change_count(), 1);
/// assert!(plan.entries[0].proposed.contains("staging"));
/// ```
pub fn plan(op: &TagOperation, candidates: &[Device]) -> Plan {
    let entries = candidates
        .iter()
        .map(|device| PlanEntry {
            device: device.clone(),
            current: device.tags.clone(),
            proposed: op.apply_to(&device.tags),
        })
        .collect();

    Plan { entries }
}
