//! Applying a plan, one device at a time
//!
//! Writes are issued sequentially in plan order. A failed write is recorded
//! against its device and the run moves on; the report always accounts for
//! every entry of the plan.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::DeviceApi;
use crate::directory::Device;
use crate::planner::{Plan, PlanEntry};
use crate::tag::TagSet;

/// What happened to one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    /// Proposed tags equal current tags; never written
    Unchanged,
    /// Dry run: would have been written
    WouldChange,
    Applied,
    /// The write was rejected or never completed
    Failed(String),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Unchanged => "unchanged",
            Outcome::WouldChange => "would change",
            Outcome::Applied => "applied",
            Outcome::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceOutcome {
    pub device: Device,
    pub current: TagSet,
    pub proposed: TagSet,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Counts per outcome kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub unchanged: usize,
    pub would_change: usize,
    pub applied: usize,
    pub failed: usize,
}

/// Result of executing a plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub applied_mode: bool,
    pub outcomes: Vec<DeviceOutcome>,
}

impl ExecutionReport {
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for entry in &self.outcomes {
            match entry.outcome {
                Outcome::Unchanged => summary.unchanged += 1,
                Outcome::WouldChange => summary.would_change += 1,
                Outcome::Applied => summary.applied += 1,
                Outcome::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }

    /// Devices whose write failed, with the reason
    pub fn failures(&self) -> Vec<(&Device, &str)> {
        self.outcomes
            .iter()
            .filter_map(|entry| match &entry.outcome {
                Outcome::Failed(reason) => Some((&entry.device, reason.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes
            .iter()
            .any(|entry| matches!(entry.outcome, Outcome::Failed(_)))
    }

    /// Number of writes that were issued
    pub fn attempted(&self) -> usize {
        let summary = self.summary();
        summary.applied + summary.failed
    }
}

fn outcome_for(entry: &PlanEntry, outcome: Outcome) -> DeviceOutcome {
    DeviceOutcome {
        device: entry.device.clone(),
        current: entry.current.clone(),
        proposed: entry.proposed.clone(),
        outcome,
    }
}

/// Executes `plan`
///
/// With `apply` false nothing is written and every changing entry is
/// reported as [`Outcome::WouldChange`]. With `apply` true each changing
/// entry is written exactly once, in plan order. A failed write is recorded
/// as [`Outcome::Failed`] and the remaining entries are still attempted.
///
/// # Arguments
///
/// * `plan` - Entries produced by [`crate::planner::plan`]
/// * `apply` - Whether to write changes or only report them
/// * `api` - Where writes go
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use tailnet_admin::api::{TailscaleClient, DEFAULT_API_URL};
/// use tailnet_admin::directory::DeviceDirectory;
/// use tailnet_admin::executor::execute;
/// use tailnet_admin::planner::{plan, TagOperation};
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = TailscaleClient::new(
///     DEFAULT_API_URL,
///     "example.com",
///     "tskey-api-xxxx",
///     Duration::from_secs(10),
/// )?;
/// let directory = DeviceDirectory::load(&client).await?;
/// let op = TagOperation::Rename { old: "dev".into(), new: "staging".into() };
///
/// // Dry run first
/// let report = execute(&plan(&op, directory.devices()), false, &client).await;
/// println!("{} would change", report.summary().would_change);
/// # Ok(())
/// # }
/// ```
pub async fn execute<A>(plan: &Plan, apply: bool, api: &A) -> ExecutionReport
where
    A: DeviceApi + ?Sized,
{
    let mut outcomes = Vec::with_capacity(plan.entries.len());

    for entry in &plan.entries {
        let outcome = if !entry.is_change() {
            Outcome::Unchanged
        } else if !apply {
            Outcome::WouldChange
        } else {
            debug!("Writing tags for {} ({})", entry.device.name, entry.device.id);
            match api.set_device_tags(&entry.device.id, &entry.proposed).await {
                Ok(()) => Outcome::Applied,
                Err(e) => {
                    warn!("Failed to update {} ({}): {}", entry.device.name, entry.device.id, e);
                    Outcome::Failed(e.to_string())
                }
            }
        };
        outcomes.push(outcome_for(entry, outcome));
    }

    let report = ExecutionReport {
        applied_mode: apply,
        outcomes,
    };
    let summary = report.summary();
    info!(
        "Execution finished: {} applied, {} failed, {} would change, {} unchanged",
        summary.applied, summary.failed, summary.would_change, summary.unchanged
    );
    report
}
