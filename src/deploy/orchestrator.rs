// ABOUTME: Fans a deployment out to one worker per service and aggregates the result.
// ABOUTME: Owns the rollback coordinator and derives the process exit code.

use std::sync::Arc;

use tokio_util::task::TaskTracker;

use crate::cluster::ControlPlane;
use crate::diagnostics::Warning;
use crate::output::Output;
use crate::types::ServiceName;

use super::coordinator::{Decision, RollbackCoordinator};
use super::error::DeployError;
use super::recovery::recover;
use super::request::DeploymentRequest;
use super::worker::{ServiceOutcome, ServiceWorker};

/// Exit code when at least one service failed to deploy.
pub const DEPLOY_FAILED_EXIT_CODE: u8 = 127;

/// Exit code for usage errors caught before any work starts.
pub const USAGE_EXIT_CODE: u8 = 1;

/// Aggregate result of one run.
#[derive(Debug, Clone)]
pub struct DeploymentSummary {
    outcomes: Vec<ServiceOutcome>,
    decision: Option<Decision>,
}

impl DeploymentSummary {
    /// Per-service outcomes, in request order.
    pub fn outcomes(&self) -> &[ServiceOutcome] {
        &self.outcomes
    }

    /// The group decision, if the coordinator finished.
    pub fn decision(&self) -> Option<Decision> {
        self.decision
    }

    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(ServiceOutcome::succeeded)
    }

    /// 0 if every service succeeded, `DEPLOY_FAILED_EXIT_CODE` otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.succeeded() {
            0
        } else {
            DEPLOY_FAILED_EXIT_CODE
        }
    }

    pub fn failed_services(&self) -> Vec<ServiceName> {
        self.outcomes
            .iter()
            .filter(|o| !o.succeeded())
            .map(|o| o.service.clone())
            .collect()
    }

    /// The error surfaced to the caller when any service failed.
    pub fn error(&self) -> Option<DeployError> {
        let failed = self.failed_services();
        if failed.is_empty() {
            None
        } else {
            Some(DeployError::ServicesFailed { failed })
        }
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Warning> {
        self.outcomes.iter().flat_map(|o| o.warnings.iter())
    }
}

/// Runs deployments against one shared control plane.
pub struct Orchestrator<C> {
    control_plane: Arc<C>,
    output: Output,
}

impl<C: ControlPlane + 'static> Orchestrator<C> {
    pub fn new(control_plane: Arc<C>, output: Output) -> Self {
        Self {
            control_plane,
            output,
        }
    }

    /// Deploy every service in `request` concurrently.
    ///
    /// Returns once every worker and its tailer has finished. A worker that
    /// dies has the group decision applied to its service and its obsolete
    /// revision deregistered on its behalf.
    pub async fn deploy(&self, request: DeploymentRequest) -> DeploymentSummary {
        let request = Arc::new(request);
        let services: Vec<ServiceName> = request.services().iter().cloned().collect();

        tracing::info!(
            cluster = %request.cluster(),
            services = services.len(),
            "starting deployment"
        );

        let (coordinator, gates) = RollbackCoordinator::new(&services);
        let coordinator = tokio::spawn(coordinator.run());
        let tailers = TaskTracker::new();

        let (workers, checkpoints): (Vec<_>, Vec<_>) = gates
            .into_iter()
            .map(|gate| {
                let worker = ServiceWorker::new(
                    Arc::clone(&self.control_plane),
                    Arc::clone(&request),
                    gate,
                    self.output.clone(),
                )
                .tracked_by(tailers.clone());
                let checkpoint = worker.checkpoint();
                (tokio::spawn(worker.run()), checkpoint)
            })
            .unzip();

        let results = futures::future::join_all(workers).await;

        let decision = match coordinator.await {
            Ok(verdict) => Some(verdict.decision),
            Err(e) => {
                tracing::error!(error = %e, "coordinator task failed");
                None
            }
        };

        // A dead worker's tailer was cancelled when the worker unwound.
        tailers.close();
        tailers.wait().await;

        let mut outcomes = Vec::with_capacity(results.len());
        for ((result, service), checkpoint) in results.into_iter().zip(services).zip(checkpoints) {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(service = %service, error = %e, "worker task failed");
                    let last = checkpoint.borrow().clone();
                    recover(
                        &*self.control_plane,
                        &request,
                        service,
                        last,
                        decision.unwrap_or(Decision::Rollback),
                        DeployError::WorkerAborted(e.to_string()),
                    )
                    .await
                }
            };
            outcomes.push(outcome);
        }

        DeploymentSummary { outcomes, decision }
    }
}
