// ABOUTME: Composable capability traits for the cluster control plane.
// ABOUTME: Defines service, task definition, task and log capabilities plus the ControlPlane umbrella.

use async_trait::async_trait;

use super::error::ControlPlaneError;
use super::types::{
    DescribeServiceOutput, RegisterTaskDefinition, RunTask, RunTaskOutput, ServiceEvent, Task,
    TaskDefinition,
};
use crate::types::{ClusterArn, ServiceArn, ServiceName, TaskArn, TaskDefinitionArn};

/// Service lifecycle operations.
#[async_trait]
pub trait ServiceOps: Send + Sync {
    /// Describe a single service in a cluster.
    async fn describe_service(
        &self,
        cluster: &str,
        service: &ServiceName,
    ) -> Result<DescribeServiceOutput, ControlPlaneError>;

    /// Point a service at a task definition revision.
    async fn update_service(
        &self,
        cluster: &ClusterArn,
        service: &ServiceArn,
        task_definition: &TaskDefinitionArn,
    ) -> Result<(), ControlPlaneError>;

    /// Block until the control plane reports the service stable.
    async fn wait_until_stable(
        &self,
        cluster: &ClusterArn,
        service: &ServiceArn,
    ) -> Result<(), ControlPlaneError>;

    /// Fetch the service's recent lifecycle events, in any order.
    async fn list_service_events(
        &self,
        cluster: &str,
        service: &ServiceName,
    ) -> Result<Vec<ServiceEvent>, ControlPlaneError>;
}

/// Task definition revision operations.
#[async_trait]
pub trait TaskDefinitionOps: Send + Sync {
    /// Fetch the full definition of a revision.
    async fn describe_task_definition(
        &self,
        task_definition: &TaskDefinitionArn,
    ) -> Result<TaskDefinition, ControlPlaneError>;

    /// Register a new revision and return it.
    async fn register_task_definition(
        &self,
        input: &RegisterTaskDefinition,
    ) -> Result<TaskDefinition, ControlPlaneError>;

    /// Mark a revision inactive.
    async fn deregister_task_definition(
        &self,
        task_definition: &TaskDefinitionArn,
    ) -> Result<(), ControlPlaneError>;
}

/// One-off task operations.
#[async_trait]
pub trait TaskOps: Send + Sync {
    /// Start tasks from a registered revision.
    async fn run_task(&self, input: &RunTask) -> Result<RunTaskOutput, ControlPlaneError>;

    /// Block until every task in `tasks` has stopped.
    async fn wait_until_stopped(
        &self,
        cluster: &str,
        tasks: &[TaskArn],
    ) -> Result<(), ControlPlaneError>;

    async fn describe_tasks(
        &self,
        cluster: &str,
        tasks: &[TaskArn],
    ) -> Result<Vec<Task>, ControlPlaneError>;
}

/// Container log access.
#[async_trait]
pub trait LogOps: Send + Sync {
    /// Every message in a log stream, oldest first.
    async fn fetch_log_messages(
        &self,
        group: &str,
        stream: &str,
    ) -> Result<Vec<String>, ControlPlaneError>;

    async fn delete_log_stream(&self, group: &str, stream: &str)
    -> Result<(), ControlPlaneError>;
}

/// Everything a deployment needs from the control plane.
pub trait ControlPlane: ServiceOps + TaskDefinitionOps {}

impl<T: ServiceOps + TaskDefinitionOps> ControlPlane for T {}
