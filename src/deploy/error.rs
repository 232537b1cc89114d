// ABOUTME: Error types for deployment operations.
// ABOUTME: Each per-service failure maps to the status code its worker reports.

use std::time::Duration;

use crate::cluster::ControlPlaneError;
use crate::types::ServiceName;

/// Errors that can occur while deploying a group of services.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeployError {
    /// The request named no services.
    #[error("can't deploy anything if no service is set")]
    NoServices,

    /// The request is malformed.
    #[error("invalid deployment request: {0}")]
    InvalidRequest(String),

    /// The describe call itself failed.
    #[error("can't describe service: {0}")]
    DescribeFailed(ControlPlaneError),

    /// The control plane does not know the service.
    #[error("service not found in cluster")]
    ServiceNotFound,

    /// The describe call returned a failure list.
    #[error("control plane reported failures: {0}")]
    DescribeFailures(String),

    /// The live task definition could not be fetched.
    #[error("can't get task definition: {0}")]
    CloneFailed(ControlPlaneError),

    /// The mutated task definition could not be registered.
    #[error("can't register task definition: {0}")]
    RegisterFailed(ControlPlaneError),

    /// The service could not be pointed at the new revision.
    #[error("can't update the service: {0}")]
    UpdateFailed(ControlPlaneError),

    /// The control plane reported the service failed to stabilize.
    #[error("service did not stabilize: {0}")]
    StabilizeFailed(ControlPlaneError),

    /// The service did not stabilize within the configured timeout.
    #[error("service did not stabilize within {}", humantime_serde::re::humantime::format_duration(*.0))]
    StabilizeTimeout(Duration),

    /// Re-pointing the service at its original revision failed.
    #[error("rollback failed: {0}")]
    RollbackFailed(String),

    /// The obsolete revision could not be deregistered.
    #[error("can't deregister task definition: {0}")]
    DeregisterFailed(ControlPlaneError),

    /// The worker task ended without producing a result.
    #[error("deployment worker aborted: {0}")]
    WorkerAborted(String),

    /// Aggregate failure for the whole group.
    #[error("one or more services failed to deploy: {}", join_names(.failed))]
    ServicesFailed { failed: Vec<ServiceName> },
}

impl DeployError {
    /// Status code a worker reports for this failure.
    ///
    /// Codes 1-4 mean the service was never touched; 5 means the service was
    /// pointed at the new revision and must be rolled back.
    pub fn code(&self) -> u8 {
        match self {
            DeployError::DescribeFailed(_) | DeployError::ServiceNotFound => 1,
            DeployError::DescribeFailures(_) => 2,
            DeployError::CloneFailed(_) => 3,
            DeployError::RegisterFailed(_) => 4,
            DeployError::UpdateFailed(_)
            | DeployError::StabilizeFailed(_)
            | DeployError::StabilizeTimeout(_) => 5,
            DeployError::NoServices
            | DeployError::InvalidRequest(_)
            | DeployError::RollbackFailed(_)
            | DeployError::DeregisterFailed(_)
            | DeployError::WorkerAborted(_)
            | DeployError::ServicesFailed { .. } => 1,
        }
    }
}

fn join_names(names: &[ServiceName]) -> String {
    names
        .iter()
        .map(ServiceName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
