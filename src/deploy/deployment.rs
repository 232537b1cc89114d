// ABOUTME: Generic deployment struct parameterized by state marker.
// ABOUTME: State types carry their own data for compile-time guarantees.

use crate::cluster::{ServiceDescription, TaskDefinition};
use crate::types::{ServiceName, TaskDefinitionArn};

use super::error::DeployError;
use super::state::{
    Cloned, Completed, Described, Finalized, Initialized, Registered, Resolution, Revisions,
    Stabilized, Updated,
};

/// A deployment of one service in progress, parameterized by its current state.
///
/// The state type parameter `S` carries state-specific data (the live service,
/// the original and candidate revisions) directly in the state type. A candidate
/// revision can only be deregistered once a group decision has been applied,
/// and the original can only be restored once a candidate exists.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) cluster: String,
    pub(crate) service: ServiceName,
    pub(crate) state: S,
}

impl Deployment<Initialized> {
    /// Start a deployment of `service` in `cluster`.
    pub fn new(cluster: impl Into<String>, service: ServiceName) -> Self {
        Deployment {
            cluster: cluster.into(),
            service,
            state: Initialized,
        }
    }
}

impl<S> Deployment<S> {
    pub fn service_name(&self) -> &ServiceName {
        &self.service
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Internal helper to move to the next state.
    pub(crate) fn transition<T>(self, state: T) -> Deployment<T> {
        Deployment {
            cluster: self.cluster,
            service: self.service,
            state,
        }
    }
}

impl Deployment<Described> {
    pub fn live(&self) -> &ServiceDescription {
        &self.state.live
    }
}

impl Deployment<Cloned> {
    pub fn live(&self) -> &ServiceDescription {
        &self.state.live
    }

    /// The task definition the service pointed at before the run.
    pub fn original(&self) -> &TaskDefinition {
        &self.state.original
    }
}

impl Deployment<Registered> {
    pub fn live(&self) -> &ServiceDescription {
        &self.state.live
    }

    pub fn revisions(&self) -> &Revisions {
        &self.state.revisions
    }
}

impl Deployment<Updated> {
    pub fn revisions(&self) -> &Revisions {
        &self.state.revisions
    }

    pub fn failure(&self) -> Option<&DeployError> {
        self.state.failure.as_ref()
    }
}

impl Deployment<Stabilized> {
    pub fn revisions(&self) -> &Revisions {
        &self.state.revisions
    }

    pub fn failure(&self) -> Option<&DeployError> {
        self.state.failure.as_ref()
    }

    /// Status code reported to the rollback coordinator.
    pub fn code(&self) -> u8 {
        self.state.failure.as_ref().map_or(0, DeployError::code)
    }
}

impl Deployment<Finalized> {
    pub fn revisions(&self) -> &Revisions {
        &self.state.revisions
    }

    pub fn resolution(&self) -> Resolution {
        self.state.resolution
    }

    pub fn rollback_error(&self) -> Option<&DeployError> {
        self.state.rollback_error.as_ref()
    }

    /// The revision nothing references anymore once the decision is applied.
    pub fn obsolete_revision(&self) -> &TaskDefinitionArn {
        match self.state.resolution {
            Resolution::Committed => &self.state.revisions.original,
            Resolution::RolledBack => &self.state.revisions.candidate,
        }
    }
}

impl Deployment<Completed> {
    pub fn revisions(&self) -> &Revisions {
        &self.state.revisions
    }

    pub fn resolution(&self) -> Resolution {
        self.state.resolution
    }

    /// The revision that was deregistered (or attempted).
    pub fn deregistered(&self) -> &TaskDefinitionArn {
        &self.state.deregistered
    }

    pub fn cleanup_error(&self) -> Option<&DeployError> {
        self.state.cleanup_error.as_ref()
    }
}
