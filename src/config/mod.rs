// ABOUTME: Configuration types and parsing for ecsroll.yml.
// ABOUTME: Handles YAML parsing, file discovery, and merging CLI overrides.

mod deserialize;

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::cluster::{AwsCli, AwsVpcConfiguration};
use crate::deploy::{
    DEFAULT_POLL_INTERVAL, DEFAULT_STABILIZE_TIMEOUT, DeployError, DeploymentRequest,
};
use crate::deploy::TagOverrides;
use crate::error::{Error, Result};
use crate::task::{DEFAULT_STOP_TIMEOUT, TaskRunRequest};
use crate::types::ServiceName;
use deserialize::{deserialize_service_names, deserialize_tag_list};

pub const CONFIG_FILENAME: &str = "ecsroll.yml";
pub const CONFIG_FILENAME_ALT: &str = "ecsroll.yaml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub cluster: Option<String>,

    /// Credential profile handed to the `aws` CLI.
    #[serde(default)]
    pub profile: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub image_tag: Option<String>,

    #[serde(default, deserialize_with = "deserialize_tag_list")]
    pub image_tags: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_service_names")]
    pub services: Vec<ServiceName>,

    #[serde(default)]
    pub containers: Option<Vec<String>>,

    #[serde(default)]
    pub workdir: Option<String>,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    #[serde(default = "default_stabilize_timeout", with = "humantime_serde")]
    pub stabilize_timeout: Duration,

    /// Settings for one-off task runs.
    #[serde(default)]
    pub run: RunConfig,
}

/// The `run:` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Family (latest revision) or revision ARN to copy.
    #[serde(default)]
    pub task_definition: Option<String>,

    #[serde(default)]
    pub container: Option<String>,

    /// CloudWatch log group that captures the container's output.
    #[serde(default)]
    pub log_group: Option<String>,

    #[serde(default)]
    pub launch_type: Option<String>,

    /// Subnets for `awsvpc` tasks. Empty means no network configuration is sent.
    #[serde(default)]
    pub subnets: Vec<String>,

    #[serde(default)]
    pub security_groups: Vec<String>,

    #[serde(default)]
    pub assign_public_ip: bool,

    /// Run the command through `sh -c`.
    #[serde(default)]
    pub shell: bool,

    #[serde(default = "default_stop_timeout", with = "humantime_serde")]
    pub stop_timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            task_definition: None,
            container: None,
            log_group: None,
            launch_type: None,
            subnets: Vec::new(),
            security_groups: Vec::new(),
            assign_public_ip: false,
            shell: false,
            stop_timeout: default_stop_timeout(),
        }
    }
}

fn default_stop_timeout() -> Duration {
    DEFAULT_STOP_TIMEOUT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cluster: None,
            profile: None,
            region: None,
            image_tag: None,
            image_tags: Vec::new(),
            services: Vec::new(),
            containers: None,
            workdir: None,
            poll_interval: default_poll_interval(),
            stabilize_timeout: default_stabilize_timeout(),
            run: RunConfig::default(),
        }
    }
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn default_stabilize_timeout() -> Duration {
    DEFAULT_STABILIZE_TIMEOUT
}

/// Values given on the command line or through `ECS_*` variables.
/// Anything set here wins over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub cluster: Option<String>,
    pub profile: Option<String>,
    pub region: Option<String>,
    pub image_tag: Option<String>,
    pub image_tags: Option<Vec<String>>,
    pub services: Vec<ServiceName>,
    pub containers: Option<Vec<String>>,
    pub workdir: Option<String>,
    pub poll_interval: Option<Duration>,
    pub stabilize_timeout: Option<Duration>,
}

/// Command-line values for the `run:` section.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub task_definition: Option<String>,
    pub container: Option<String>,
    pub log_group: Option<String>,
    pub launch_type: Option<String>,
    pub subnets: Option<Vec<String>>,
    pub security_groups: Option<Vec<String>>,
    pub assign_public_ip: Option<bool>,
    pub shell: Option<bool>,
    pub stop_timeout: Option<Duration>,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load `ecsroll.yml` (or `.yaml`) from `dir`, or an empty config if neither exists.
    pub fn discover(dir: &Path) -> Result<Self> {
        for name in [CONFIG_FILENAME, CONFIG_FILENAME_ALT] {
            let path = dir.join(name);
            if path.exists() {
                tracing::debug!(path = %path.display(), "using config file");
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load `path` if given, otherwise discover in `dir`.
    pub fn resolve(path: Option<&Path>, dir: &Path) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::discover(dir),
        }
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if overrides.cluster.is_some() {
            self.cluster = overrides.cluster;
        }
        if overrides.profile.is_some() {
            self.profile = overrides.profile;
        }
        if overrides.region.is_some() {
            self.region = overrides.region;
        }
        if overrides.image_tag.is_some() {
            self.image_tag = overrides.image_tag;
        }
        if let Some(tags) = overrides.image_tags {
            self.image_tags = tags;
        }
        if !overrides.services.is_empty() {
            self.services = overrides.services;
        }
        if overrides.containers.is_some() {
            self.containers = overrides.containers;
        }
        if overrides.workdir.is_some() {
            self.workdir = overrides.workdir;
        }
        if let Some(interval) = overrides.poll_interval {
            self.poll_interval = interval;
        }
        if let Some(timeout) = overrides.stabilize_timeout {
            self.stabilize_timeout = timeout;
        }
        self
    }

    pub fn with_run_overrides(mut self, overrides: RunOverrides) -> Self {
        let run = &mut self.run;
        if overrides.task_definition.is_some() {
            run.task_definition = overrides.task_definition;
        }
        if overrides.container.is_some() {
            run.container = overrides.container;
        }
        if overrides.log_group.is_some() {
            run.log_group = overrides.log_group;
        }
        if overrides.launch_type.is_some() {
            run.launch_type = overrides.launch_type;
        }
        if let Some(subnets) = overrides.subnets {
            run.subnets = subnets;
        }
        if let Some(groups) = overrides.security_groups {
            run.security_groups = groups;
        }
        if let Some(public) = overrides.assign_public_ip {
            run.assign_public_ip = public;
        }
        if let Some(shell) = overrides.shell {
            run.shell = shell;
        }
        if let Some(timeout) = overrides.stop_timeout {
            run.stop_timeout = timeout;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        if self.stabilize_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "stabilize_timeout must be greater than zero".to_string(),
            ));
        }
        if let Some(containers) = &self.containers
            && containers.is_empty()
        {
            return Err(Error::InvalidConfig(
                "containers filter cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The cluster to operate on.
    pub fn cluster(&self) -> Result<&str> {
        self.cluster
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or(Error::MissingCluster)
    }

    /// Build the deployment request.
    pub fn into_request(self) -> Result<DeploymentRequest> {
        self.validate()?;
        let cluster = self.cluster()?.to_string();

        let mut request = DeploymentRequest::new(cluster, self.services).map_err(|e| match e {
            DeployError::NoServices => Error::NoServices,
            other => Error::Deploy(other),
        })?;

        if let Some(tag) = self.image_tag {
            request = request.with_image_tag(tag);
        }
        if !self.image_tags.is_empty() {
            request = request.with_image_tags(self.image_tags);
        }
        if let Some(containers) = self.containers {
            request = request.with_containers(containers);
        }
        if let Some(workdir) = self.workdir {
            request = request.with_workdir(workdir);
        }

        Ok(request
            .with_poll_interval(self.poll_interval)
            .with_stabilize_timeout(self.stabilize_timeout))
    }

    /// Build a one-off task run of `command`.
    pub fn into_run_request(self, command: Vec<String>) -> Result<TaskRunRequest> {
        let cluster = self.cluster()?.to_string();
        let run = self.run;

        if run.stop_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "run.stop_timeout must be greater than zero".to_string(),
            ));
        }
        if run.subnets.is_empty() && !run.security_groups.is_empty() {
            return Err(Error::InvalidConfig(
                "run.security_groups need run.subnets".to_string(),
            ));
        }
        let task_definition = run
            .task_definition
            .filter(|t| !t.trim().is_empty())
            .ok_or(Error::MissingTaskDefinition)?;
        let container = run
            .container
            .filter(|c| !c.trim().is_empty())
            .ok_or(Error::MissingContainer)?;

        let mut request = TaskRunRequest::new(cluster, task_definition, container)?
            .with_command(command)
            .with_shell(run.shell)
            .with_overrides(TagOverrides {
                image_tag: self.image_tag,
                image_tags: self.image_tags,
                containers: None,
                workdir: self.workdir,
            })
            .with_stop_timeout(run.stop_timeout);

        if let Some(group) = run.log_group {
            request = request.with_log_group(group);
        }
        if let Some(region) = self.region {
            request = request.with_region(region);
        }
        if let Some(launch_type) = run.launch_type {
            request = request.with_launch_type(launch_type);
        }
        if !run.subnets.is_empty() {
            request = request.with_network(AwsVpcConfiguration {
                subnets: run.subnets,
                security_groups: run.security_groups,
                assign_public_ip: if run.assign_public_ip { "ENABLED" } else { "DISABLED" }
                    .to_string(),
            });
        }
        Ok(request)
    }

    /// The `aws` CLI backend with this config's profile and region.
    pub fn aws_cli(&self) -> AwsCli {
        let mut cli = AwsCli::new();
        if let Some(profile) = &self.profile {
            cli = cli.profile(profile);
        }
        if let Some(region) = &self.region {
            cli = cli.region(region);
        }
        cli
    }
}
