//! Bulk tag operations end to end
//!
//! [`TagEngine`] ties the pieces together for one invocation:
//! load the directory, resolve the target devices, plan, then execute.

use serde::Serialize;
use tracing::info;

use crate::api::DeviceApi;
use crate::directory::DeviceDirectory;
use crate::error::AdminError;
use crate::executor::{execute, ExecutionReport};
use crate::planner::{plan, Plan, TagOperation};
use crate::resolver::{resolve, Unresolved};

/// Everything that happened while running one operation
#[derive(Debug, Clone, Serialize)]
pub struct TagRun {
    #[serde(serialize_with = "serialize_display")]
    pub operation: TagOperation,
    pub unresolved: Vec<Unresolved>,
    #[serde(skip)]
    pub plan: Plan,
    pub report: ExecutionReport,
}

fn serialize_display<S: serde::Serializer>(
    op: &TagOperation,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(op)
}

impl TagRun {
    /// Fails when writes were attempted and at least one was rejected
    ///
    /// Dry runs always succeed.
    pub fn check(&self) -> Result<(), AdminError> {
        if !self.report.applied_mode || !self.report.has_failures() {
            return Ok(());
        }
        Err(AdminError::WritesFailed {
            failed: self.report.summary().failed,
            attempted: self.report.attempted(),
        })
    }
}

/// Runs tag operations against a [`DeviceApi`]
pub struct TagEngine<'a, A: ?Sized> {
    api: &'a A,
}

impl<'a, A> TagEngine<'a, A>
where
    A: DeviceApi + ?Sized,
{
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Loads the directory and runs `operation` over it
    ///
    /// Only a directory failure is returned as an error; per-device problems
    /// are part of the returned [`TagRun`].
    pub async fn run(&self, operation: TagOperation, apply: bool) -> Result<TagRun, AdminError> {
        let directory = DeviceDirectory::load(self.api).await?;
        Ok(self.run_on(&directory, operation, apply).await)
    }

    /// Runs `operation` over an already loaded directory
    pub async fn run_on(
        &self,
        directory: &DeviceDirectory,
        operation: TagOperation,
        apply: bool,
    ) -> TagRun {
        info!("Running operation: {} (apply: {})", operation, apply);

        let resolution = resolve(operation.target(), directory);
        let plan = plan(&operation, &resolution.matched);
        info!(
            "Planned {} device(s), {} change(s), {} unresolved identifier(s)",
            plan.entries.len(),
            plan.change_count(),
            resolution.unmatched.len()
        );

        let report = execute(&plan, apply, self.api).await;

        TagRun {
            operation,
            unresolved: resolution.unmatched,
            plan,
            report,
        }
    }
}
