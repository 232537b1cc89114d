// ABOUTME: Immutable description of one one-off task run.
// ABOUTME: Names the template, the container to drive, its command, and where its logs go.

use std::time::Duration;

use super::error::RunError;
use crate::cluster::AwsVpcConfiguration;
use crate::deploy::TagOverrides;
use crate::types::TaskDefinitionArn;

/// Default bound on waiting for the task to stop.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(1800);

/// `startedBy` value attached to every task this tool starts.
pub const STARTED_BY: &str = "ecsroll";

/// What to run, where, and how to capture its output.
#[derive(Debug, Clone)]
pub struct TaskRunRequest {
    cluster: String,
    task_definition: TaskDefinitionArn,
    container: String,
    command: Vec<String>,
    shell: bool,
    overrides: TagOverrides,
    log_group: Option<String>,
    region: Option<String>,
    launch_type: Option<String>,
    network: Option<AwsVpcConfiguration>,
    stop_timeout: Duration,
}

impl TaskRunRequest {
    /// Run `container` of the `task_definition` family (or revision ARN) in
    /// `cluster`.
    ///
    /// # Errors
    ///
    /// Returns `RunError::InvalidRequest` if any of the three is blank.
    pub fn new(
        cluster: impl Into<String>,
        task_definition: impl Into<String>,
        container: impl Into<String>,
    ) -> Result<Self, RunError> {
        let cluster = cluster.into();
        let task_definition = task_definition.into();
        let container = container.into();

        for (what, value) in [
            ("cluster", &cluster),
            ("task definition", &task_definition),
            ("container", &container),
        ] {
            if value.trim().is_empty() {
                return Err(RunError::InvalidRequest(format!("{what} cannot be empty")));
            }
        }

        Ok(Self {
            cluster,
            task_definition: TaskDefinitionArn::new(task_definition),
            container,
            command: Vec::new(),
            shell: false,
            overrides: TagOverrides::default(),
            log_group: None,
            region: None,
            launch_type: None,
            network: None,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        })
    }

    /// Replace the container's command. Empty keeps the template's command.
    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }

    /// Join the command into one `sh -c` line.
    pub fn with_shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_overrides(mut self, overrides: TagOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Capture the container's output in this CloudWatch log group.
    pub fn with_log_group(mut self, group: impl Into<String>) -> Self {
        self.log_group = Some(group.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_launch_type(mut self, launch_type: impl Into<String>) -> Self {
        self.launch_type = Some(launch_type.into());
        self
    }

    pub fn with_network(mut self, network: AwsVpcConfiguration) -> Self {
        self.network = Some(network);
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn task_definition(&self) -> &TaskDefinitionArn {
        &self.task_definition
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn overrides(&self) -> &TagOverrides {
        &self.overrides
    }

    pub fn log_group(&self) -> Option<&str> {
        self.log_group.as_deref()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn launch_type(&self) -> Option<&str> {
        self.launch_type.as_deref()
    }

    pub fn network(&self) -> Option<&AwsVpcConfiguration> {
        self.network.as_ref()
    }

    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    /// The command to set on the container, if any.
    pub fn container_command(&self) -> Option<Vec<String>> {
        if self.command.is_empty() {
            return None;
        }
        if self.shell {
            Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                self.command.join(" "),
            ])
        } else {
            Some(self.command.clone())
        }
    }

    /// Log stream prefix: the cluster's short name.
    pub fn stream_prefix(&self) -> &str {
        self.cluster.rsplit('/').next().unwrap_or(&self.cluster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TaskRunRequest {
        TaskRunRequest::new("prod", "migrate", "app").unwrap()
    }

    #[test]
    fn rejects_blank_fields() {
        assert!(matches!(
            TaskRunRequest::new("prod", " ", "app"),
            Err(RunError::InvalidRequest(_))
        ));
        assert!(matches!(
            TaskRunRequest::new("prod", "migrate", ""),
            Err(RunError::InvalidRequest(_))
        ));
    }

    #[test]
    fn empty_command_keeps_template_command() {
        assert_eq!(request().container_command(), None);
        assert_eq!(request().with_shell(true).container_command(), None);
    }

    #[test]
    fn command_is_passed_as_is() {
        let req = request().with_command(vec!["./manage.py".into(), "migrate".into()]);
        assert_eq!(
            req.container_command(),
            Some(vec!["./manage.py".to_string(), "migrate".to_string()])
        );
    }

    #[test]
    fn shell_joins_command_into_one_line() {
        let req = request()
            .with_command(vec!["echo".into(), "$HOME".into(), "&&".into(), "ls".into()])
            .with_shell(true);
        assert_eq!(
            req.container_command(),
            Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo $HOME && ls".to_string()
            ])
        );
    }

    #[test]
    fn stream_prefix_is_cluster_short_name() {
        let req =
            TaskRunRequest::new("arn:aws:ecs:eu-west-1:123456789012:cluster/prod", "m", "app")
                .unwrap();
        assert_eq!(req.stream_prefix(), "prod");
        assert_eq!(request().stream_prefix(), "prod");
    }
}
