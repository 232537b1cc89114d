// ABOUTME: Control-plane backend that drives the `aws` command line.
// ABOUTME: Each capability call runs `aws ecs` or `aws logs` and parses its JSON output.

use std::ffi::OsString;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use snafu::{ResultExt, Snafu, ensure};
use tokio::process::Command;

use super::error::ControlPlaneError;
use super::traits::{LogOps, ServiceOps, TaskDefinitionOps, TaskOps};
use super::types::{
    DescribeFailure, DescribeServiceOutput, RegisterTaskDefinition, RunTask, RunTaskOutput,
    ServiceDescription, ServiceEvent, Task, TaskDefinition,
};
use crate::types::{ClusterArn, ServiceArn, ServiceName, TaskArn, TaskDefinitionArn};

/// Failure running or reading an `aws` CLI invocation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AwsCliError {
    #[snafu(display("failed to run `aws {subcommand}`: {source}"))]
    Spawn {
        subcommand: String,
        source: std::io::Error,
    },

    #[snafu(display("`aws {subcommand}` exited with {status}: {stderr}"))]
    Failed {
        subcommand: String,
        status: String,
        stderr: String,
    },

    #[snafu(display("could not parse `aws {subcommand}` output: {source}"))]
    Parse {
        subcommand: String,
        source: serde_json::Error,
    },

    #[snafu(display("could not encode `aws {subcommand}` input: {source}"))]
    Encode {
        subcommand: String,
        source: serde_json::Error,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwsCliErrorKind {
    /// The CLI binary could not be started.
    Spawn,
    /// The CLI ran and reported a missing resource.
    NotFound,
    /// A `wait` subcommand gave up.
    Waiter,
    /// The CLI ran and reported any other failure.
    Api,
    /// Input or output JSON could not be handled.
    Json,
}

impl AwsCliError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> AwsCliErrorKind {
        match self {
            AwsCliError::Spawn { .. } => AwsCliErrorKind::Spawn,
            AwsCliError::Failed { stderr, .. } => classify_stderr(stderr),
            AwsCliError::Parse { .. } | AwsCliError::Encode { .. } => AwsCliErrorKind::Json,
        }
    }
}

fn classify_stderr(stderr: &str) -> AwsCliErrorKind {
    if stderr.contains("Waiter") {
        AwsCliErrorKind::Waiter
    } else if stderr.contains("NotFoundException")
        || stderr.contains("ResourceNotFoundException")
        || stderr.contains("Unable to describe task definition")
    {
        AwsCliErrorKind::NotFound
    } else {
        AwsCliErrorKind::Api
    }
}

impl From<AwsCliError> for ControlPlaneError {
    fn from(err: AwsCliError) -> Self {
        let message = err.to_string();
        match err.kind() {
            AwsCliErrorKind::Spawn => ControlPlaneError::Transport(message),
            AwsCliErrorKind::NotFound => ControlPlaneError::NotFound(message),
            AwsCliErrorKind::Waiter => ControlPlaneError::Waiter(message),
            AwsCliErrorKind::Api => ControlPlaneError::Api(message),
            AwsCliErrorKind::Json => ControlPlaneError::InvalidResponse(message),
        }
    }
}

/// Control plane reached through the `aws` CLI.
///
/// Credentials and region come from the CLI's own configuration; only the
/// profile (and optionally the region) is chosen here.
#[derive(Debug, Clone)]
pub struct AwsCli {
    program: OsString,
    profile: Option<String>,
    region: Option<String>,
}

impl Default for AwsCli {
    fn default() -> Self {
        Self::new()
    }
}

impl AwsCli {
    pub fn new() -> Self {
        Self {
            program: OsString::from("aws"),
            profile: None,
            region: None,
        }
    }

    /// Use a named profile from `~/.aws/config`.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Override the region from the profile.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Run a different executable instead of `aws` found on `PATH`.
    pub fn program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, api: &str, subcommand: &str, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(api).arg(subcommand).args(args);
        cmd.args(["--output", "json"]);
        if let Some(profile) = &self.profile {
            cmd.arg("--profile").arg(profile);
        }
        if let Some(region) = &self.region {
            cmd.arg("--region").arg(region);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run `aws ecs <subcommand> <args>` and return its stdout.
    async fn run(&self, subcommand: &str, args: &[&str]) -> Result<Vec<u8>, AwsCliError> {
        self.invoke("ecs", subcommand, args).await
    }

    /// Run `aws <api> <subcommand> <args>` and return its stdout.
    async fn invoke(
        &self,
        api: &str,
        subcommand: &str,
        args: &[&str],
    ) -> Result<Vec<u8>, AwsCliError> {
        tracing::debug!(api, subcommand, ?args, "running aws");

        let label = format!("{api} {subcommand}");
        let output = self
            .command(api, subcommand, args)
            .output()
            .await
            .context(SpawnSnafu {
                subcommand: label.as_str(),
            })?;

        ensure!(
            output.status.success(),
            FailedSnafu {
                subcommand: label.as_str(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
        );

        Ok(output.stdout)
    }

    async fn run_json<T: DeserializeOwned>(
        &self,
        subcommand: &str,
        args: &[&str],
    ) -> Result<T, AwsCliError> {
        self.invoke_json("ecs", subcommand, args).await
    }

    async fn invoke_json<T: DeserializeOwned>(
        &self,
        api: &str,
        subcommand: &str,
        args: &[&str],
    ) -> Result<T, AwsCliError> {
        let stdout = self.invoke(api, subcommand, args).await?;
        serde_json::from_slice(&stdout).context(ParseSnafu {
            subcommand: format!("{api} {subcommand}"),
        })
    }
}

#[derive(Debug, Deserialize)]
struct DescribeServicesResponse {
    #[serde(default)]
    services: Vec<ServiceDescription>,
    #[serde(default)]
    failures: Vec<DescribeFailure>,
}

impl From<DescribeServicesResponse> for DescribeServiceOutput {
    fn from(response: DescribeServicesResponse) -> Self {
        DescribeServiceOutput {
            service: response.services.into_iter().next(),
            failures: response.failures,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskDefinitionResponse {
    task_definition: TaskDefinition,
}

#[derive(Debug, Deserialize)]
struct DescribeTasksResponse {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    failures: Vec<DescribeFailure>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogEventsResponse {
    #[serde(default)]
    events: Vec<LogEvent>,
    next_forward_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LogEvent {
    message: String,
}

#[async_trait]
impl ServiceOps for AwsCli {
    async fn describe_service(
        &self,
        cluster: &str,
        service: &ServiceName,
    ) -> Result<DescribeServiceOutput, ControlPlaneError> {
        let response: DescribeServicesResponse = self
            .run_json(
                "describe-services",
                &["--cluster", cluster, "--services", service.as_str()],
            )
            .await?;
        Ok(response.into())
    }

    async fn update_service(
        &self,
        cluster: &ClusterArn,
        service: &ServiceArn,
        task_definition: &TaskDefinitionArn,
    ) -> Result<(), ControlPlaneError> {
        self.run(
            "update-service",
            &[
                "--cluster",
                cluster.as_str(),
                "--service",
                service.as_str(),
                "--task-definition",
                task_definition.as_str(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn wait_until_stable(
        &self,
        cluster: &ClusterArn,
        service: &ServiceArn,
    ) -> Result<(), ControlPlaneError> {
        // `aws ecs wait` takes the waiter name as its first argument.
        self.run(
            "wait",
            &[
                "services-stable",
                "--cluster",
                cluster.as_str(),
                "--services",
                service.as_str(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn list_service_events(
        &self,
        cluster: &str,
        service: &ServiceName,
    ) -> Result<Vec<ServiceEvent>, ControlPlaneError> {
        let output = self.describe_service(cluster, service).await?;
        output
            .service
            .map(|s| s.events)
            .ok_or_else(|| ControlPlaneError::NotFound(format!("service {service}")))
    }
}

#[async_trait]
impl TaskDefinitionOps for AwsCli {
    async fn describe_task_definition(
        &self,
        task_definition: &TaskDefinitionArn,
    ) -> Result<TaskDefinition, ControlPlaneError> {
        let response: TaskDefinitionResponse = self
            .run_json(
                "describe-task-definition",
                &["--task-definition", task_definition.as_str()],
            )
            .await?;
        Ok(response.task_definition)
    }

    async fn register_task_definition(
        &self,
        input: &RegisterTaskDefinition,
    ) -> Result<TaskDefinition, ControlPlaneError> {
        let subcommand = "register-task-definition";
        let input_json = serde_json::to_string(input).context(EncodeSnafu {
            subcommand: "ecs register-task-definition",
        })?;
        let response: TaskDefinitionResponse = self
            .run_json(subcommand, &["--cli-input-json", input_json.as_str()])
            .await?;
        Ok(response.task_definition)
    }

    async fn deregister_task_definition(
        &self,
        task_definition: &TaskDefinitionArn,
    ) -> Result<(), ControlPlaneError> {
        self.run(
            "deregister-task-definition",
            &["--task-definition", task_definition.as_str()],
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl TaskOps for AwsCli {
    async fn run_task(&self, input: &RunTask) -> Result<RunTaskOutput, ControlPlaneError> {
        let input_json = serde_json::to_string(input).context(EncodeSnafu {
            subcommand: "ecs run-task",
        })?;
        Ok(self
            .run_json("run-task", &["--cli-input-json", input_json.as_str()])
            .await?)
    }

    async fn wait_until_stopped(
        &self,
        cluster: &str,
        tasks: &[TaskArn],
    ) -> Result<(), ControlPlaneError> {
        let mut args = vec!["tasks-stopped", "--cluster", cluster, "--tasks"];
        args.extend(tasks.iter().map(TaskArn::as_str));
        self.run("wait", &args).await?;
        Ok(())
    }

    async fn describe_tasks(
        &self,
        cluster: &str,
        tasks: &[TaskArn],
    ) -> Result<Vec<Task>, ControlPlaneError> {
        let mut args = vec!["--cluster", cluster, "--tasks"];
        args.extend(tasks.iter().map(TaskArn::as_str));
        let response: DescribeTasksResponse = self.run_json("describe-tasks", &args).await?;
        if let Some(failure) = response.failures.first() {
            return Err(ControlPlaneError::NotFound(format!("task {failure}")));
        }
        Ok(response.tasks)
    }
}

#[async_trait]
impl LogOps for AwsCli {
    async fn fetch_log_messages(
        &self,
        group: &str,
        stream: &str,
    ) -> Result<Vec<String>, ControlPlaneError> {
        let mut messages = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut args = vec![
                "--log-group-name",
                group,
                "--log-stream-name",
                stream,
                "--start-from-head",
            ];
            if let Some(token) = &token {
                args.extend(["--next-token", token.as_str()]);
            }
            let page: LogEventsResponse = self
                .invoke_json("logs", "get-log-events", &args)
                .await?;
            let exhausted = page.events.is_empty() || page.next_forward_token == token;
            messages.extend(page.events.into_iter().map(|e| e.message));
            // The forward token repeats once the end of the stream is reached.
            if exhausted {
                return Ok(messages);
            }
            token = page.next_forward_token;
        }
    }

    async fn delete_log_stream(&self, group: &str, stream: &str) -> Result<(), ControlPlaneError> {
        self.invoke(
            "logs",
            "delete-log-stream",
            &["--log-group-name", group, "--log-stream-name", stream],
        )
        .await?;
        Ok(())
    }
}
