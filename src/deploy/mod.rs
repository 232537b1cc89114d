// ABOUTME: Group deployment of ECS services using the type state pattern.
// ABOUTME: Exports the per-service state machine, coordinator, tailer and orchestrator.

mod coordinator;
mod deployment;
mod error;
mod mutator;
mod orchestrator;
mod recovery;
mod request;
mod state;
mod tailer;
mod transitions;
mod worker;

pub use coordinator::{
    ABANDONED_CODE, Decision, DecisionGate, RollbackCoordinator, ServiceReport, Verdict,
};
pub use deployment::Deployment;
pub use error::DeployError;
pub use mutator::{CONTAINER_NAME_PLACEHOLDER, TagOverrides, mutate};
pub use orchestrator::{
    DEPLOY_FAILED_EXIT_CODE, DeploymentSummary, Orchestrator, USAGE_EXIT_CODE,
};
pub use recovery::Checkpoint;
pub use request::{DEFAULT_POLL_INTERVAL, DEFAULT_STABILIZE_TIMEOUT, DeploymentRequest};
pub use state::{
    Cloned, Completed, Described, Finalized, Initialized, Phase, Registered, Resolution,
    Revisions, Stabilized, Updated,
};
pub use tailer::{StatusTailer, TailSummary};
pub use worker::{ServiceOutcome, ServiceWorker};
