// ABOUTME: State transition methods for a single service deployment.
// ABOUTME: Each method consumes self and returns the next state.

use std::time::Duration;

use crate::cluster::{
    ControlPlaneError, RegisterTaskDefinition, ServiceDescription, ServiceOps, TaskDefinitionOps,
};
use crate::types::TaskDefinitionArn;

use super::Deployment;
use super::error::DeployError;
use super::mutator::{TagOverrides, mutate};
use super::state::{
    Cloned, Completed, Described, Finalized, Initialized, Registered, Resolution, Revisions,
    Stabilized, Updated,
};

/// Wait for `live` to stabilize, giving up after `timeout`.
async fn wait_bounded<C: ServiceOps>(
    control_plane: &C,
    live: &ServiceDescription,
    timeout: Duration,
) -> Result<(), DeployError> {
    match tokio::time::timeout(
        timeout,
        control_plane.wait_until_stable(&live.cluster_arn, &live.service_arn),
    )
    .await
    {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(DeployError::StabilizeFailed(e)),
        Err(_) => Err(DeployError::StabilizeTimeout(timeout)),
    }
}

// =============================================================================
// Initialized -> Described
// =============================================================================

impl Deployment<Initialized> {
    /// Fetch the live service.
    ///
    /// # Errors
    ///
    /// `DescribeFailed` or `ServiceNotFound` (code 1) when the call fails or
    /// returns nothing, `DescribeFailures` (code 2) when the control plane
    /// reports per-service failures.
    #[must_use = "deployment state must be used"]
    pub async fn describe<C: ServiceOps>(
        self,
        control_plane: &C,
    ) -> Result<Deployment<Described>, DeployError> {
        let output = control_plane
            .describe_service(&self.cluster, &self.service)
            .await
            .map_err(|e| match e {
                ControlPlaneError::NotFound(_) => DeployError::ServiceNotFound,
                other => DeployError::DescribeFailed(other),
            })?;

        if !output.failures.is_empty() {
            let reasons = output
                .failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(DeployError::DescribeFailures(reasons));
        }

        let live = output.service.ok_or(DeployError::ServiceNotFound)?;
        tracing::debug!(
            service = %self.service,
            task_definition = %live.task_definition,
            "described live service"
        );

        Ok(self.transition(Described { live }))
    }
}

// =============================================================================
// Described -> Cloned
// =============================================================================

impl Deployment<Described> {
    /// Fetch the task definition the live service points at.
    ///
    /// # Errors
    ///
    /// `CloneFailed` (code 3).
    #[must_use = "deployment state must be used"]
    pub async fn clone_task_definition<C: TaskDefinitionOps>(
        self,
        control_plane: &C,
    ) -> Result<Deployment<Cloned>, DeployError> {
        let original = control_plane
            .describe_task_definition(&self.state.live.task_definition)
            .await
            .map_err(DeployError::CloneFailed)?;

        let Described { live } = self.state;
        Ok(Deployment {
            cluster: self.cluster,
            service: self.service,
            state: Cloned { live, original },
        })
    }
}

// =============================================================================
// Cloned -> Registered
// =============================================================================

impl Deployment<Cloned> {
    /// Register a mutated copy of the original as the candidate revision.
    ///
    /// # Errors
    ///
    /// `RegisterFailed` (code 4).
    #[must_use = "deployment state must be used"]
    pub async fn register<C: TaskDefinitionOps>(
        self,
        control_plane: &C,
        overrides: &TagOverrides,
    ) -> Result<Deployment<Registered>, DeployError> {
        let containers = mutate(&self.state.original.container_definitions, overrides);
        let input = RegisterTaskDefinition::from_template(&self.state.original, containers);

        let candidate = control_plane
            .register_task_definition(&input)
            .await
            .map_err(DeployError::RegisterFailed)?;

        tracing::info!(
            service = %self.service,
            original = %self.state.original.task_definition_arn,
            candidate = %candidate.task_definition_arn,
            "registered candidate revision"
        );

        let Cloned { live, original } = self.state;
        let revisions = Revisions {
            original: original.task_definition_arn,
            candidate: candidate.task_definition_arn,
        };
        Ok(Deployment {
            cluster: self.cluster,
            service: self.service,
            state: Registered { live, revisions },
        })
    }
}

// =============================================================================
// Registered -> Updated
// =============================================================================

impl Deployment<Registered> {
    /// Point the service at the candidate revision.
    ///
    /// A failure is recorded in the next state rather than returned, so the
    /// deployment still reaches the decision gate and its cleanup.
    #[must_use = "deployment state must be used"]
    pub async fn update<C: ServiceOps>(self, control_plane: &C) -> Deployment<Updated> {
        let Registered { live, revisions } = self.state;

        let failure = control_plane
            .update_service(&live.cluster_arn, &live.service_arn, &revisions.candidate)
            .await
            .err()
            .map(DeployError::UpdateFailed);

        if let Some(err) = &failure {
            tracing::error!(service = %self.service, error = %err, "update failed");
        }

        Deployment {
            cluster: self.cluster,
            service: self.service,
            state: Updated {
                live,
                revisions,
                failure,
            },
        }
    }
}

// =============================================================================
// Updated -> Stabilized
// =============================================================================

impl Deployment<Updated> {
    /// Wait for the service to stabilize on the candidate, bounded by `timeout`.
    ///
    /// Skipped when the update already failed.
    #[must_use = "deployment state must be used"]
    pub async fn stabilize<C: ServiceOps>(
        self,
        control_plane: &C,
        timeout: Duration,
    ) -> Deployment<Stabilized> {
        let Updated {
            live,
            revisions,
            failure,
        } = self.state;

        let failure = match failure {
            Some(err) => Some(err),
            None => wait_bounded(control_plane, &live, timeout).await.err(),
        };

        match &failure {
            Some(err) => tracing::error!(service = %self.service, error = %err, "service did not stabilize"),
            None => tracing::info!(service = %self.service, "service stable on candidate"),
        }

        Deployment {
            cluster: self.cluster,
            service: self.service,
            state: Stabilized {
                live,
                revisions,
                failure,
            },
        }
    }
}

// =============================================================================
// Stabilized -> Finalized
// =============================================================================

impl Deployment<Stabilized> {
    /// Keep the candidate. The original becomes obsolete.
    #[must_use = "deployment state must be used"]
    pub fn commit(self) -> Deployment<Finalized> {
        let Stabilized { revisions, .. } = self.state;
        Deployment {
            cluster: self.cluster,
            service: self.service,
            state: Finalized {
                revisions,
                resolution: Resolution::Committed,
                rollback_error: None,
            },
        }
    }

    /// Re-point the service at the original revision and wait for it to
    /// stabilize again. The candidate becomes obsolete.
    ///
    /// Errors are recorded, never retried.
    #[must_use = "deployment state must be used"]
    pub async fn rollback<C: ServiceOps>(
        self,
        control_plane: &C,
        timeout: Duration,
    ) -> Deployment<Finalized> {
        let Stabilized {
            live, revisions, ..
        } = self.state;

        let result = match control_plane
            .update_service(&live.cluster_arn, &live.service_arn, &revisions.original)
            .await
        {
            Ok(()) => wait_bounded(control_plane, &live, timeout).await,
            Err(e) => Err(DeployError::UpdateFailed(e)),
        };

        let rollback_error = result
            .err()
            .map(|e| DeployError::RollbackFailed(e.to_string()));

        match &rollback_error {
            Some(err) => tracing::error!(service = %self.service, error = %err, "rollback failed"),
            None => tracing::info!(
                service = %self.service,
                task_definition = %revisions.original,
                "rolled back to original revision"
            ),
        }

        Deployment {
            cluster: self.cluster,
            service: self.service,
            state: Finalized {
                revisions,
                resolution: Resolution::RolledBack,
                rollback_error,
            },
        }
    }
}

// =============================================================================
// Finalized -> Completed
// =============================================================================

impl Deployment<Finalized> {
    /// Deregister the obsolete revision. Runs exactly once per deployment;
    /// a failure is recorded and the revision is leaked.
    #[must_use = "deployment state must be used"]
    pub async fn deregister<C: TaskDefinitionOps>(self, control_plane: &C) -> Deployment<Completed> {
        let target: TaskDefinitionArn = self.obsolete_revision().clone();

        let cleanup_error = match control_plane.deregister_task_definition(&target).await {
            Ok(()) => {
                tracing::debug!(service = %self.service, task_definition = %target, "deregistered revision");
                None
            }
            Err(e) => {
                tracing::warn!(service = %self.service, task_definition = %target, error = %e, "deregister failed");
                Some(DeployError::DeregisterFailed(e))
            }
        };

        let Finalized {
            revisions,
            resolution,
            ..
        } = self.state;

        Deployment {
            cluster: self.cluster,
            service: self.service,
            state: Completed {
                revisions,
                resolution,
                deregistered: target,
                cleanup_error,
            },
        }
    }
}
