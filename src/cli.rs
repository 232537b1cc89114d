// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments; ECS_* variables back most flags.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use ecsroll::config::{Overrides, RunOverrides};
use ecsroll::output::OutputMode;
use ecsroll::types::ServiceName;
use humantime_serde::re::humantime;

#[derive(Parser)]
#[command(name = "ecsroll")]
#[command(about = "Rolling deployments with group rollback for ECS services")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Only print the final result and errors
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (defaults to ./ecsroll.yml when present)
    #[arg(long, global = true, env = "ECS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Credential profile passed to the aws CLI
    #[arg(long, global = true, env = "ECS_PROFILE")]
    pub profile: Option<String>,

    /// Region passed to the aws CLI
    #[arg(long, global = true, env = "ECS_REGION")]
    pub region: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy a new image tag to a group of services, rolling all back if any fails
    Deploy {
        /// Cluster name or ARN
        #[arg(short, long, env = "ECS_CLUSTER")]
        cluster: Option<String>,

        /// Service to deploy (repeat or comma-separate)
        #[arg(short = 's', long = "service", env = "ECS_SERVICES", value_delimiter = ',')]
        services: Vec<ServiceName>,

        /// Tag applied to every container
        #[arg(short = 't', long, env = "ECS_IMAGE_TAG")]
        image_tag: Option<String>,

        /// Tags by container position, comma-separated; leave a slot empty to skip it
        #[arg(long, env = "ECS_IMAGE_TAGS", value_delimiter = ',')]
        image_tags: Option<Vec<String>>,

        /// Only touch these containers (comma-separated names)
        #[arg(long, value_delimiter = ',')]
        containers: Option<Vec<String>>,

        /// Working directory set on touched containers
        #[arg(long, env = "ECS_WORKDIR")]
        workdir: Option<String>,

        /// Interval between event polls, e.g. "10s"
        #[arg(long, value_parser = humantime::parse_duration)]
        poll_interval: Option<Duration>,

        /// Give up waiting for a service to stabilize after this long, e.g. "10m"
        #[arg(long, value_parser = humantime::parse_duration)]
        stabilize_timeout: Option<Duration>,
    },

    /// Run a one-off task from a copy of a task definition and exit with its status
    ///
    /// Without --container, the first argument names the container and the
    /// rest is its command.
    Run {
        /// Cluster name or ARN
        #[arg(short, long, env = "ECS_CLUSTER")]
        cluster: Option<String>,

        /// Task definition family or revision ARN to copy
        #[arg(short = 'd', long, env = "ECS_TASK_DEFINITION")]
        task_definition: Option<String>,

        /// Container whose command is replaced
        #[arg(long)]
        container: Option<String>,

        /// Tag applied to every container
        #[arg(short = 't', long, env = "ECS_IMAGE_TAG")]
        image_tag: Option<String>,

        /// Tags by container position, comma-separated; leave a slot empty to skip it
        #[arg(long, env = "ECS_IMAGE_TAGS", value_delimiter = ',')]
        image_tags: Option<Vec<String>>,

        /// Working directory set on every container
        #[arg(long, env = "ECS_WORKDIR")]
        workdir: Option<String>,

        /// CloudWatch log group to capture the container's output in
        #[arg(short = 'l', long, env = "ECS_LOG_GROUP")]
        log_group: Option<String>,

        /// Launch type, e.g. FARGATE or EC2
        #[arg(long)]
        launch_type: Option<String>,

        /// Subnets for awsvpc tasks (comma-separated)
        #[arg(long, value_delimiter = ',')]
        subnets: Option<Vec<String>>,

        /// Security groups for awsvpc tasks (comma-separated)
        #[arg(long, value_delimiter = ',')]
        security_groups: Option<Vec<String>>,

        /// Give the task a public IP
        #[arg(long)]
        public_ip: bool,

        /// Run the command through `sh -c`
        #[arg(long)]
        shell: bool,

        /// Give up waiting for the task to stop after this long, e.g. "30m"
        #[arg(long, value_parser = humantime::parse_duration)]
        stop_timeout: Option<Duration>,

        /// [CONTAINER] COMMAND...
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Stream a service's events until interrupted
    Events {
        /// Cluster name or ARN
        #[arg(short, long, env = "ECS_CLUSTER")]
        cluster: Option<String>,

        /// Service to watch
        #[arg(short = 's', long = "service")]
        service: ServiceName,

        /// Also print events from this far back, e.g. "5m"
        #[arg(long, value_parser = humantime::parse_duration)]
        since: Option<Duration>,

        /// Interval between event polls, e.g. "10s"
        #[arg(long, value_parser = humantime::parse_duration)]
        poll_interval: Option<Duration>,
    },
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }

    /// Overrides shared by every subcommand.
    pub fn global_overrides(&self) -> Overrides {
        Overrides {
            profile: self.profile.clone(),
            region: self.region.clone(),
            ..Overrides::default()
        }
    }
}

/// Boolean flags only override the file when given.
pub fn run_overrides(shell: bool, public_ip: bool) -> RunOverrides {
    RunOverrides {
        shell: shell.then_some(true),
        assign_public_ip: public_ip.then_some(true),
        ..RunOverrides::default()
    }
}
