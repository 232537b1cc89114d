// ABOUTME: Cleanup for a service whose worker task died mid-deployment.
// ABOUTME: Finishes the remaining steps from the last checkpoint the worker published.

use crate::cluster::{ControlPlane, ServiceDescription};
use crate::diagnostics::{Diagnostics, Warning};
use crate::types::ServiceName;

use super::Deployment;
use super::coordinator::Decision;
use super::error::DeployError;
use super::request::DeploymentRequest;
use super::state::{Finalized, Phase, Resolution, Revisions, Stabilized};
use super::worker::ServiceOutcome;

/// Cluster-visible progress of one worker, published as it advances.
#[derive(Debug, Clone, Default)]
pub enum Checkpoint {
    /// Nothing in the cluster has changed yet.
    #[default]
    Untouched,
    /// A candidate exists; the service still points at the original.
    Registered {
        live: ServiceDescription,
        revisions: Revisions,
    },
    /// The service may point at the candidate.
    Updated {
        live: ServiceDescription,
        revisions: Revisions,
    },
    /// The group decision was applied; the obsolete revision is still registered.
    Finalized {
        revisions: Revisions,
        resolution: Resolution,
    },
    /// Cleanup ran.
    Released,
}

/// Apply the group decision and clean up for a worker that ended without an
/// outcome. The service still counts as failed.
pub(crate) async fn recover<C: ControlPlane>(
    control_plane: &C,
    request: &DeploymentRequest,
    service: ServiceName,
    checkpoint: Checkpoint,
    decision: Decision,
    error: DeployError,
) -> ServiceOutcome {
    let mut outcome = ServiceOutcome::aborted(service.clone(), error);
    let mut diagnostics = Diagnostics::default();
    let cluster = request.cluster().to_string();

    let finalized = match checkpoint {
        Checkpoint::Untouched | Checkpoint::Released => return outcome,
        Checkpoint::Registered { revisions, .. } => Deployment {
            cluster,
            service: service.clone(),
            state: Finalized {
                revisions,
                resolution: Resolution::RolledBack,
                rollback_error: None,
            },
        },
        Checkpoint::Updated { live, revisions } => {
            outcome.decision = Some(decision);
            let stabilized = Deployment {
                cluster,
                service: service.clone(),
                state: Stabilized {
                    live,
                    revisions,
                    failure: None,
                },
            };
            match decision {
                Decision::Commit => stabilized.commit(),
                Decision::Rollback => {
                    stabilized
                        .rollback(control_plane, request.stabilize_timeout())
                        .await
                }
            }
        }
        Checkpoint::Finalized {
            revisions,
            resolution,
        } => {
            outcome.decision = Some(match resolution {
                Resolution::Committed => Decision::Commit,
                Resolution::RolledBack => Decision::Rollback,
            });
            Deployment {
                cluster,
                service: service.clone(),
                state: Finalized {
                    revisions,
                    resolution,
                    rollback_error: None,
                },
            }
        }
    };

    tracing::warn!(
        service = %service,
        resolution = ?finalized.resolution(),
        "cleaning up after aborted worker"
    );

    if let Some(err) = finalized.rollback_error() {
        diagnostics.warn(Warning::rollback(format!("{service}: {err}")));
    }

    let completed = finalized.deregister(control_plane).await;
    if let Some(err) = completed.cleanup_error() {
        diagnostics.warn(Warning::deregister(format!(
            "{service}: {} leaked: {err}",
            completed.deregistered()
        )));
    }

    outcome.phase = Phase::Done;
    outcome.deregistered = Some(completed.deregistered().clone());
    outcome.warnings = diagnostics.into_warnings();
    outcome
}
