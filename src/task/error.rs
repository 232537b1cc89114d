// ABOUTME: Error types for one-off task runs.
// ABOUTME: Every failure carries the process exit code the run command reports.

use std::time::Duration;

use crate::cluster::ControlPlaneError;

/// The task stopped but its log output could not be read.
pub const LOGS_FAILED_EXIT_CODE: u8 = 10;

/// A container was stopped by the cluster rather than exiting on its own.
pub const CONTAINER_STOPPED_EXIT_CODE: u8 = 11;

/// The task did not reach `STOPPED`.
pub const WAIT_FAILED_EXIT_CODE: u8 = 3;

/// Errors that can occur while running a one-off task.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RunError {
    #[error("invalid task run request: {0}")]
    InvalidRequest(String),

    #[error("can't get task definition: {0}")]
    DescribeFailed(ControlPlaneError),

    #[error("can't find container {0} in the task definition")]
    ContainerNotFound(String),

    #[error("no region for the awslogs driver (set `region:` or use a task definition ARN)")]
    MissingRegion,

    #[error("can't register task definition: {0}")]
    RegisterFailed(ControlPlaneError),

    #[error("can't run task: {0}")]
    RunFailed(ControlPlaneError),

    #[error("no tasks could be run: {0}")]
    NoTasks(String),

    #[error("task did not stop: {0}")]
    WaitFailed(ControlPlaneError),

    #[error("task did not stop within {}", humantime_serde::re::humantime::format_duration(*.0))]
    WaitTimeout(Duration),

    #[error("can't describe stopped task: {0}")]
    DescribeTasksFailed(ControlPlaneError),

    #[error("can't fetch task logs: {0}")]
    LogsFailed(ControlPlaneError),

    #[error("container {container} was stopped: {reason}")]
    ContainerStopped { container: String, reason: String },

    #[error("container {container} exited with {code}")]
    Exited { container: String, code: i32 },
}

impl RunError {
    /// Process exit code for this failure.
    ///
    /// A container's own non-zero exit code is passed through; codes that
    /// don't fit a process status become 1.
    pub fn code(&self) -> u8 {
        match self {
            RunError::WaitFailed(_) | RunError::WaitTimeout(_) => WAIT_FAILED_EXIT_CODE,
            RunError::LogsFailed(_) => LOGS_FAILED_EXIT_CODE,
            RunError::ContainerStopped { .. } => CONTAINER_STOPPED_EXIT_CODE,
            RunError::Exited { code, .. } => u8::try_from(*code)
                .ok()
                .filter(|c| *c != 0)
                .unwrap_or(1),
            RunError::InvalidRequest(_)
            | RunError::DescribeFailed(_)
            | RunError::ContainerNotFound(_)
            | RunError::MissingRegion
            | RunError::RegisterFailed(_)
            | RunError::RunFailed(_)
            | RunError::NoTasks(_)
            | RunError::DescribeTasksFailed(_) => 1,
        }
    }
}
