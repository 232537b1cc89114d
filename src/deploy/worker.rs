// ABOUTME: Drives one service through its whole deployment lifecycle.
// ABOUTME: Owns the service's state, its status tailer, and its side of the decision gate.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::cluster::ControlPlane;
use crate::diagnostics::{Diagnostics, Warning};
use crate::output::Output;
use crate::types::{ServiceName, TaskDefinitionArn};

use super::Deployment;
use super::coordinator::{Decision, DecisionGate};
use super::error::DeployError;
use super::recovery::Checkpoint;
use super::request::DeploymentRequest;
use super::state::{Phase, Registered};
use super::tailer::StatusTailer;

/// Structured result of one worker.
#[derive(Debug, Clone)]
pub struct ServiceOutcome {
    pub service: ServiceName,
    /// Last phase entered.
    pub phase: Phase,
    /// Code reported before the group decision; 0 on success.
    pub code: u8,
    pub error: Option<DeployError>,
    /// `None` when the worker stopped before a candidate existed.
    pub decision: Option<Decision>,
    /// Revision deregistered during cleanup.
    pub deregistered: Option<TaskDefinitionArn>,
    pub warnings: Vec<Warning>,
    /// Events printed by the service's tailer.
    pub events_seen: usize,
}

impl ServiceOutcome {
    /// Outcome for a worker whose task died before it could produce one.
    pub fn aborted(service: ServiceName, error: DeployError) -> Self {
        Self {
            service,
            phase: Phase::Done,
            code: error.code(),
            error: Some(error),
            decision: None,
            deregistered: None,
            warnings: Vec::new(),
            events_seen: 0,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.code == 0
    }
}

/// Runs one service's deployment.
pub struct ServiceWorker<C> {
    control_plane: Arc<C>,
    request: Arc<DeploymentRequest>,
    gate: DecisionGate,
    output: Output,
    phase: Phase,
    checkpoint: watch::Sender<Checkpoint>,
    tailers: TaskTracker,
}

impl<C: ControlPlane + 'static> ServiceWorker<C> {
    /// The service is the one `gate` was created for.
    pub fn new(
        control_plane: Arc<C>,
        request: Arc<DeploymentRequest>,
        gate: DecisionGate,
        output: Output,
    ) -> Self {
        let (checkpoint, _) = watch::channel(Checkpoint::default());
        Self {
            control_plane,
            request,
            gate,
            output,
            phase: Phase::Describing,
            checkpoint,
            tailers: TaskTracker::new(),
        }
    }

    /// Spawn the status tailer on `tracker` so the caller can wait for it
    /// even if this worker dies.
    pub fn tracked_by(mut self, tracker: TaskTracker) -> Self {
        self.tailers = tracker;
        self
    }

    pub fn service(&self) -> &ServiceName {
        self.gate.service()
    }

    /// The worker's latest cluster-visible progress. Still readable after the
    /// worker is gone.
    pub fn checkpoint(&self) -> watch::Receiver<Checkpoint> {
        self.checkpoint.subscribe()
    }

    pub async fn run(mut self) -> ServiceOutcome {
        let control_plane = Arc::clone(&self.control_plane);
        let cp = &*control_plane;
        let service = self.service().clone();
        let mut diagnostics = Diagnostics::default();

        let registered = match self.prepare(cp).await {
            Ok(registered) => registered,
            Err(err) => return self.abandon(err),
        };
        self.checkpoint.send_replace(Checkpoint::Registered {
            live: registered.live().clone(),
            revisions: registered.revisions().clone(),
        });

        let cancel = CancellationToken::new();
        let tailer = StatusTailer::new(
            Arc::clone(&control_plane),
            self.request.cluster(),
            service.clone(),
            self.request.poll_interval(),
            self.output.clone(),
        );
        let tail_handle = self.tailers.spawn(tailer.run(cancel.clone()));
        let _stop_tailer = cancel.clone().drop_guard();

        self.checkpoint.send_replace(Checkpoint::Updated {
            live: registered.live().clone(),
            revisions: registered.revisions().clone(),
        });
        self.enter(Phase::Updating);
        let updated = registered.update(cp).await;
        self.enter(Phase::Stabilizing);
        let stabilized = updated
            .stabilize(cp, self.request.stabilize_timeout())
            .await;

        let code = stabilized.code();
        let error = stabilized.failure().cloned();
        if let Some(err) = &error {
            self.output.service_error(&service, &err.to_string());
        }

        self.gate.report(code);
        let decision = self.gate.decision().await;

        let finalized = match decision {
            Decision::Commit => {
                self.enter(Phase::Committing);
                stabilized.commit()
            }
            Decision::Rollback => {
                self.enter(Phase::RollingBack);
                stabilized
                    .rollback(cp, self.request.stabilize_timeout())
                    .await
            }
        };

        self.checkpoint.send_replace(Checkpoint::Finalized {
            revisions: finalized.revisions().clone(),
            resolution: finalized.resolution(),
        });
        if let Some(err) = finalized.rollback_error() {
            diagnostics.warn(Warning::rollback(format!("{service}: {err}")));
        }

        cancel.cancel();
        let events_seen = match tail_handle.await {
            Ok(summary) => {
                if let Some(last_error) = &summary.last_error {
                    diagnostics.warn(Warning::tailer(format!(
                        "{service}: {} event poll(s) failed, last: {last_error}",
                        summary.failed_polls
                    )));
                }
                summary.printed
            }
            Err(e) => {
                diagnostics.warn(Warning::tailer(format!(
                    "{service}: status tailer stopped abnormally: {e}"
                )));
                0
            }
        };

        self.enter(Phase::Deregistering);
        let completed = finalized.deregister(cp).await;
        self.checkpoint.send_replace(Checkpoint::Released);
        if let Some(err) = completed.cleanup_error() {
            diagnostics.warn(Warning::deregister(format!(
                "{service}: {} leaked: {err}",
                completed.deregistered()
            )));
        }

        self.enter(Phase::Done);

        ServiceOutcome {
            service,
            phase: self.phase,
            code,
            error,
            decision: Some(decision),
            deregistered: Some(completed.deregistered().clone()),
            warnings: diagnostics.into_warnings(),
            events_seen,
        }
    }

    /// Describe, clone and register. Nothing in the cluster changes if this fails.
    async fn prepare(&mut self, cp: &C) -> Result<Deployment<Registered>, DeployError> {
        self.enter(Phase::Describing);
        let described = Deployment::new(self.request.cluster(), self.service().clone())
            .describe(cp)
            .await?;

        self.enter(Phase::Cloning);
        let cloned = described.clone_task_definition(cp).await?;

        self.enter(Phase::Registering);
        cloned.register(cp, self.request.overrides()).await
    }

    /// Report an early failure and stop; there is no candidate to clean up.
    fn abandon(mut self, err: DeployError) -> ServiceOutcome {
        let service = self.service().clone();
        tracing::error!(service = %service, phase = %self.phase, error = %err, "deployment failed");
        self.output.service_error(&service, &err.to_string());
        self.gate.report(err.code());

        ServiceOutcome {
            service,
            phase: self.phase,
            code: err.code(),
            error: Some(err),
            decision: None,
            deregistered: None,
            warnings: Vec::new(),
            events_seen: 0,
        }
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        tracing::info!(service = %self.gate.service(), %phase, "phase");
        self.output.phase(self.gate.service(), phase);
    }
}
