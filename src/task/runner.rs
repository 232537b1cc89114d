// ABOUTME: Runs one task from a throwaway revision and maps the stopped task to an exit code.
// ABOUTME: The revision is always deregistered once registered, whatever happens to the task.

use std::sync::Arc;

use super::error::RunError;
use super::request::{STARTED_BY, TaskRunRequest};
use crate::cluster::{
    LogConfiguration, LogOps, NetworkConfiguration, RegisterTaskDefinition, RunTask, Task,
    TaskContainer, TaskDefinitionOps, TaskOps,
};
use crate::deploy::mutate;
use crate::diagnostics::{Diagnostics, Warning};
use crate::output::Output;
use crate::types::{TaskArn, TaskDefinitionArn};

/// What happened to one task run.
#[derive(Debug, Default)]
pub struct TaskRunOutcome {
    /// The started task, once the cluster accepted it.
    pub task: Option<TaskArn>,
    /// Containers of the stopped task.
    pub containers: Vec<TaskContainer>,
    /// The throwaway revision, once it has been deregistered.
    pub deregistered: Option<TaskDefinitionArn>,
    pub warnings: Vec<Warning>,
    pub error: Option<RunError>,
}

impl TaskRunOutcome {
    /// 0 on success, otherwise the code of the failure.
    pub fn exit_code(&self) -> u8 {
        self.error.as_ref().map_or(0, RunError::code)
    }
}

/// Decide how a stopped task went from its containers.
///
/// The target container decides first: a stop reason, or no exit code at
/// all, means the cluster killed it, and a non-zero exit is passed through.
/// When the target exited cleanly, any other container the cluster stopped
/// still fails the run.
pub fn exit_verdict(target: &str, containers: &[TaskContainer]) -> Result<(), RunError> {
    let stopped = |container: &TaskContainer, reason: &str| RunError::ContainerStopped {
        container: container.name.clone(),
        reason: reason.to_string(),
    };

    let Some(container) = containers.iter().find(|c| c.name == target) else {
        return Err(RunError::ContainerStopped {
            container: target.to_string(),
            reason: "not reported by the stopped task".to_string(),
        });
    };

    if let Some(reason) = &container.reason {
        return Err(stopped(container, reason));
    }
    match container.exit_code {
        None => return Err(stopped(container, "no exit code")),
        Some(0) => {}
        Some(code) => {
            return Err(RunError::Exited {
                container: container.name.clone(),
                code,
            });
        }
    }

    match containers
        .iter()
        .find(|c| c.name != target && c.reason.is_some())
    {
        Some(other) => Err(stopped(other, other.reason.as_deref().unwrap_or_default())),
        None => Ok(()),
    }
}

/// Runs one-off tasks against a control plane.
pub struct TaskRunner<C> {
    control_plane: Arc<C>,
    output: Output,
}

impl<C> TaskRunner<C>
where
    C: TaskDefinitionOps + TaskOps + LogOps,
{
    pub fn new(control_plane: Arc<C>, output: Output) -> Self {
        Self {
            control_plane,
            output,
        }
    }

    /// Register a throwaway revision, run it once, wait for it to stop, relay
    /// its logs and deregister the revision.
    pub async fn run(&self, request: &TaskRunRequest) -> TaskRunOutcome {
        let mut outcome = TaskRunOutcome::default();
        let mut diagnostics = Diagnostics::default();

        let candidate = match self.register(request).await {
            Ok(candidate) => candidate,
            Err(err) => {
                tracing::error!(task_definition = %request.task_definition(), error = %err, "task not started");
                outcome.error = Some(err);
                return outcome;
            }
        };

        let result = self
            .execute(request, &candidate, &mut outcome, &mut diagnostics)
            .await;

        match self
            .control_plane
            .deregister_task_definition(&candidate)
            .await
        {
            Ok(()) => {
                tracing::debug!(task_definition_arn = %candidate, "deregistered the task definition");
                outcome.deregistered = Some(candidate);
            }
            Err(err) => {
                diagnostics.warn(Warning::deregister(format!("{candidate} leaked: {err}")));
            }
        }

        outcome.error = result.err();
        outcome.warnings = diagnostics.into_warnings();
        outcome
    }

    // =========================================================================
    // Prepare
    // =========================================================================

    async fn register(&self, request: &TaskRunRequest) -> Result<TaskDefinitionArn, RunError> {
        let template = self
            .control_plane
            .describe_task_definition(request.task_definition())
            .await
            .map_err(RunError::DescribeFailed)?;

        let region = match request.log_group() {
            Some(_) => Some(
                request
                    .region()
                    .or_else(|| template.task_definition_arn.region())
                    .ok_or(RunError::MissingRegion)?
                    .to_string(),
            ),
            None => None,
        };

        let mut containers = mutate(&template.container_definitions, request.overrides());
        let target = containers
            .iter_mut()
            .find(|c| c.name == request.container())
            .ok_or_else(|| RunError::ContainerNotFound(request.container().to_string()))?;

        if let Some(command) = request.container_command() {
            tracing::debug!(container_name = %target.name, ?command, "command changed");
            target.command = Some(command);
        }
        if let (Some(group), Some(region)) = (request.log_group(), region.as_deref()) {
            target.log_configuration = Some(LogConfiguration::awslogs(
                region,
                group,
                request.stream_prefix(),
            ));
        }

        let input = RegisterTaskDefinition::from_template(&template, containers);
        let registered = self
            .control_plane
            .register_task_definition(&input)
            .await
            .map_err(RunError::RegisterFailed)?;

        tracing::debug!(
            task_definition_arn = %registered.task_definition_arn,
            "registered the task definition"
        );
        Ok(registered.task_definition_arn)
    }

    // =========================================================================
    // Run and wait
    // =========================================================================

    async fn execute(
        &self,
        request: &TaskRunRequest,
        candidate: &TaskDefinitionArn,
        outcome: &mut TaskRunOutcome,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), RunError> {
        let cluster = request.cluster();
        let input = RunTask {
            cluster: cluster.to_string(),
            task_definition: candidate.clone(),
            count: 1,
            started_by: STARTED_BY.to_string(),
            launch_type: request.launch_type().map(str::to_string),
            network_configuration: request.network().cloned().map(|awsvpc_configuration| {
                NetworkConfiguration {
                    awsvpc_configuration,
                }
            }),
        };

        let started = self
            .control_plane
            .run_task(&input)
            .await
            .map_err(RunError::RunFailed)?;
        let tasks: Vec<TaskArn> = started.tasks.iter().map(|t| t.task_arn.clone()).collect();
        if tasks.is_empty() {
            let failures = started
                .failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>();
            return Err(RunError::NoTasks(if failures.is_empty() {
                "check that the cluster has enough resources".to_string()
            } else {
                failures.join("; ")
            }));
        }
        outcome.task = tasks.first().cloned();

        for task in &tasks {
            tracing::debug!(task_arn = %task, "started task");
        }
        self.output.progress(&format!(
            "Waiting for task {} to finish",
            tasks[0].short_name()
        ));

        match tokio::time::timeout(
            request.stop_timeout(),
            self.control_plane.wait_until_stopped(cluster, &tasks),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(RunError::WaitFailed(err)),
            Err(_) => return Err(RunError::WaitTimeout(request.stop_timeout())),
        }

        let stopped = self
            .control_plane
            .describe_tasks(cluster, &tasks)
            .await
            .map_err(RunError::DescribeTasksFailed)?;
        outcome.containers = stopped
            .iter()
            .flat_map(|t| t.containers.iter().cloned())
            .collect();
        log_exits(&outcome.containers);

        let verdict = exit_verdict(request.container(), &outcome.containers);

        // A container the cluster stopped may never have written a stream.
        let exited = target_of(&stopped, request.container()).filter(|(_, c)| c.reason.is_none());
        if let (Some(group), Some((task, _))) = (request.log_group(), exited) {
            self.relay_logs(request, group, task, diagnostics).await?;
        }

        verdict
    }

    // =========================================================================
    // Logs
    // =========================================================================

    async fn relay_logs(
        &self,
        request: &TaskRunRequest,
        group: &str,
        task: &Task,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), RunError> {
        let stream = format!(
            "{}/{}/{}",
            request.stream_prefix(),
            request.container(),
            task.task_arn.short_name()
        );

        let fetched = self.control_plane.fetch_log_messages(group, &stream).await;
        if let Ok(lines) = &fetched {
            for line in lines {
                self.output.task_log(request.container(), line);
            }
        }

        match self.control_plane.delete_log_stream(group, &stream).await {
            Ok(()) => tracing::debug!(log_group = %group, log_stream = %stream, "deleted log stream"),
            Err(err) => diagnostics.warn(Warning::logs(format!(
                "log stream {group}/{stream} not removed: {err}"
            ))),
        }

        fetched.map(|_| ()).map_err(RunError::LogsFailed)
    }
}

fn target_of<'a>(tasks: &'a [Task], container: &str) -> Option<(&'a Task, &'a TaskContainer)> {
    tasks.iter().find_map(|task| {
        task.containers
            .iter()
            .find(|c| c.name == container)
            .map(|c| (task, c))
    })
}

fn log_exits(containers: &[TaskContainer]) {
    for container in containers {
        match (&container.reason, container.exit_code) {
            (None, Some(0)) => {
                tracing::info!(container_name = %container.name, "container exited")
            }
            (Some(reason), _) => {
                tracing::error!(container_name = %container.name, reason = %reason, "container exited")
            }
            (None, exit_code) => {
                tracing::error!(container_name = %container.name, ?exit_code, "container exited")
            }
        }
    }
}
