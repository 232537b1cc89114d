// ABOUTME: Application-wide error types for ecsroll.
// ABOUTME: Uses thiserror for ergonomic error handling and maps errors to exit codes.

use std::path::PathBuf;
use thiserror::Error;

use crate::cluster::ControlPlaneError;
use crate::deploy::{DEPLOY_FAILED_EXIT_CODE, DeployError, USAGE_EXIT_CODE};
use crate::task::RunError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no cluster given (use --cluster, ECS_CLUSTER or `cluster:` in the config file)")]
    MissingCluster,

    #[error("can't deploy anything if no service is set")]
    NoServices,

    #[error("no task definition given (use --task-definition, ECS_TASK_DEFINITION or `run.task_definition:`)")]
    MissingTaskDefinition,

    #[error("no container given (use --container, a first argument or `run.container:`)")]
    MissingContainer,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error("control plane error: {0}")]
    ControlPlane(#[from] ControlPlaneError),
}

impl Error {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Deploy(DeployError::ServicesFailed { .. }) => DEPLOY_FAILED_EXIT_CODE,
            Error::Run(err) => err.code(),
            _ => USAGE_EXIT_CODE,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
