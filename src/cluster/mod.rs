// ABOUTME: Cluster control-plane capabilities and their data shapes.
// ABOUTME: Exposes the capability traits and the `aws` CLI backend.

mod aws_cli;
mod error;
mod traits;
mod types;

pub use aws_cli::{AwsCli, AwsCliError, AwsCliErrorKind};
pub use error::ControlPlaneError;
pub use traits::{ControlPlane, LogOps, ServiceOps, TaskDefinitionOps, TaskOps};
pub use types::{
    AwsVpcConfiguration, ContainerDefinition, DescribeFailure, DescribeServiceOutput,
    LogConfiguration, NetworkConfiguration, RegisterTaskDefinition, RunTask, RunTaskOutput,
    ServiceDescription, ServiceEvent, Task, TaskContainer, TaskDefinition,
};
