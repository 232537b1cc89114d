// ABOUTME: Deployment state marker types for the type state pattern.
// ABOUTME: Each state carries exactly the data that exists at that point of the deployment.

use std::fmt;

use super::error::DeployError;
use crate::cluster::{ServiceDescription, TaskDefinition};
use crate::types::TaskDefinitionArn;

/// Lifecycle phase of one service, as shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Describing,
    Cloning,
    Registering,
    Updating,
    Stabilizing,
    Committing,
    RollingBack,
    Deregistering,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Describing => "describing",
            Phase::Cloning => "cloning",
            Phase::Registering => "registering",
            Phase::Updating => "updating",
            Phase::Stabilizing => "stabilizing",
            Phase::Committing => "committing",
            Phase::RollingBack => "rolling back",
            Phase::Deregistering => "deregistering",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// The two revisions a deployment juggles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revisions {
    /// Revision the service pointed at before the run.
    pub original: TaskDefinitionArn,
    /// Newly registered, mutated revision.
    pub candidate: TaskDefinitionArn,
}

/// How a deployment was finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Committed,
    RolledBack,
}

/// Initial state: nothing fetched yet.
/// Available actions: `describe()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Initialized;

/// Live service fetched.
/// Available actions: `clone_task_definition()`
#[derive(Debug, Clone)]
pub struct Described {
    pub(crate) live: ServiceDescription,
}

/// Original task definition fetched.
/// Available actions: `register()`
#[derive(Debug, Clone)]
pub struct Cloned {
    pub(crate) live: ServiceDescription,
    pub(crate) original: TaskDefinition,
}

/// Candidate revision registered; the service is still untouched.
/// Available actions: `update()`
#[derive(Debug, Clone)]
pub struct Registered {
    pub(crate) live: ServiceDescription,
    pub(crate) revisions: Revisions,
}

/// Update attempted. A failure is recorded, not returned.
/// Available actions: `stabilize()`
#[derive(Debug, Clone)]
pub struct Updated {
    pub(crate) live: ServiceDescription,
    pub(crate) revisions: Revisions,
    pub(crate) failure: Option<DeployError>,
}

/// Stabilization attempted; the status code is now known.
/// Available actions: `commit()`, `rollback()`
#[derive(Debug, Clone)]
pub struct Stabilized {
    pub(crate) live: ServiceDescription,
    pub(crate) revisions: Revisions,
    pub(crate) failure: Option<DeployError>,
}

/// Group decision applied.
/// Available actions: `deregister()`
#[derive(Debug, Clone)]
pub struct Finalized {
    pub(crate) revisions: Revisions,
    pub(crate) resolution: Resolution,
    pub(crate) rollback_error: Option<DeployError>,
}

/// Obsolete revision deregistered (or the attempt failed and was recorded).
#[derive(Debug, Clone)]
pub struct Completed {
    pub(crate) revisions: Revisions,
    pub(crate) resolution: Resolution,
    pub(crate) deregistered: TaskDefinitionArn,
    pub(crate) cleanup_error: Option<DeployError>,
}
