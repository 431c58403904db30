//! Mapping user-supplied device identifiers onto the directory
//!
//! An identifier is first compared against device IDs (exact match), then
//! against display names ignoring case. Identifiers that match nothing, or
//! whose name matches several devices, are reported back instead of failing
//! the command, so one typo does not block the other devices.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::directory::{Device, DeviceDirectory};

/// Which devices an operation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// Every device in the directory
    All,
    /// Only the named devices, in the given order
    Devices(&'a [String]),
}

/// Why an identifier could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "candidates", rename_all = "snake_case")]
pub enum UnresolvedReason {
    NotFound,
    /// Several devices share the name; their IDs are listed
    Ambiguous(Vec<String>),
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::NotFound => write!(f, "not found"),
            UnresolvedReason::Ambiguous(ids) => {
                write!(f, "ambiguous, matches {}", ids.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unresolved {
    pub identifier: String,
    #[serde(flatten)]
    pub reason: UnresolvedReason,
}

/// Outcome of resolving a set of identifiers
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub matched: Vec<Device>,
    pub unmatched: Vec<Unresolved>,
}

/// Resolves a single identifier
pub fn resolve_one<'a>(
    identifier: &str,
    directory: &'a DeviceDirectory,
) -> Result<&'a Device, UnresolvedReason> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(UnresolvedReason::NotFound);
    }

    if let Some(device) = directory.get(identifier) {
        return Ok(device);
    }

    let needle = identifier.to_lowercase();
    let by_name: Vec<&Device> = directory
        .devices()
        .iter()
        .filter(|d| d.name.to_lowercase() == needle)
        .collect();

    match by_name.as_slice() {
        [] => Err(UnresolvedReason::NotFound),
        [device] => Ok(*device),
        many => Err(UnresolvedReason::Ambiguous(
            many.iter().map(|d| d.id.clone()).collect(),
        )),
    }
}

/// Resolves the devices an operation targets
///
/// [`Target::All`] yields the whole directory. For [`Target::Devices`],
/// matched devices keep the order of `identifiers`, and a device named twice
/// is only returned once.
pub fn resolve(target: Target<'_>, directory: &DeviceDirectory) -> Resolution {
    let identifiers = match target {
        Target::All => {
            return Resolution {
                matched: directory.devices().to_vec(),
                unmatched: Vec::new(),
            }
        }
        Target::Devices(identifiers) => identifiers,
    };

    let mut resolution = Resolution::default();
    let mut seen = HashSet::new();

    for identifier in identifiers {
        match resolve_one(identifier, directory) {
            Ok(device) => {
                if seen.insert(device.id.clone()) {
                    debug!("Resolved {:?} to device {}", identifier, device.id);
                    resolution.matched.push(device.clone());
                } else {
                    debug!("{:?} names device {} again, skipping", identifier, device.id);
                }
            }
            Err(reason) => {
                debug!("Could not resolve {:?}: {}", identifier, reason);
                resolution.unmatched.push(Unresolved {
                    identifier: identifier.clone(),
                    reason,
                });
            }
        }
    }

    resolution
}
