// ABOUTME: Data shapes exchanged with the cluster control plane.
// ABOUTME: Field names follow the ECS JSON wire format so backends can pass them through.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{ClusterArn, ServiceArn, TaskArn, TaskDefinitionArn};

/// A live service as reported by the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescription {
    pub service_arn: ServiceArn,
    pub service_name: String,
    pub cluster_arn: ClusterArn,
    /// Revision the service currently points at.
    pub task_definition: TaskDefinitionArn,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub events: Vec<ServiceEvent>,
}

/// A single service lifecycle event ("has reached a steady state", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEvent {
    #[serde(default)]
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub message: String,
}

/// A per-resource failure returned by a describe call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeFailure {
    pub arn: Option<String>,
    pub reason: Option<String>,
    pub detail: Option<String>,
}

impl std::fmt::Display for DescribeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.arn.as_deref().unwrap_or("<unknown>"),
            self.reason.as_deref().unwrap_or("unknown reason")
        )?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

/// Result of describing a single service.
#[derive(Debug, Clone, Default)]
pub struct DescribeServiceOutput {
    pub service: Option<ServiceDescription>,
    pub failures: Vec<DescribeFailure>,
}

/// One container definition. Only the fields this tool rewrites are typed;
/// everything else is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDefinition {
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_configuration: Option<LogConfiguration>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContainerDefinition {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            working_directory: None,
            command: None,
            log_configuration: None,
            extra: Map::new(),
        }
    }
}

/// Where a container's stdout and stderr go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfiguration {
    pub log_driver: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LogConfiguration {
    /// Ship output to CloudWatch `group`, in streams named
    /// `<prefix>/<container>/<task id>`.
    pub fn awslogs(region: &str, group: &str, stream_prefix: &str) -> Self {
        let options = [
            ("awslogs-region", region),
            ("awslogs-group", group),
            ("awslogs-stream-prefix", stream_prefix),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            log_driver: "awslogs".to_string(),
            options,
            extra: Map::new(),
        }
    }
}

/// A registered task definition revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub task_definition_arn: TaskDefinitionArn,
    pub family: String,
    #[serde(default)]
    pub revision: Option<i64>,
    #[serde(default)]
    pub container_definitions: Vec<ContainerDefinition>,
    #[serde(default)]
    pub cpu: Option<String>,
    #[serde(default)]
    pub memory: Option<String>,
    #[serde(default)]
    pub execution_role_arn: Option<String>,
    #[serde(default)]
    pub task_role_arn: Option<String>,
    #[serde(default)]
    pub network_mode: Option<String>,
    #[serde(default)]
    pub placement_constraints: Vec<Value>,
    #[serde(default)]
    pub compatibilities: Vec<String>,
    #[serde(default)]
    pub requires_compatibilities: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<Value>,
}

/// Input for registering a new revision of a task definition family.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTaskDefinition {
    pub family: String,
    pub container_definitions: Vec<ContainerDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub placement_constraints: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub requires_compatibilities: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Value>,
}

impl RegisterTaskDefinition {
    /// Copy the family, resources, roles and networking of `template`,
    /// replacing its container definitions.
    pub fn from_template(
        template: &TaskDefinition,
        container_definitions: Vec<ContainerDefinition>,
    ) -> Self {
        let requires_compatibilities = if template.requires_compatibilities.is_empty() {
            template.compatibilities.clone()
        } else {
            template.requires_compatibilities.clone()
        };

        Self {
            family: template.family.clone(),
            container_definitions,
            cpu: template.cpu.clone(),
            memory: template.memory.clone(),
            execution_role_arn: template.execution_role_arn.clone(),
            task_role_arn: template.task_role_arn.clone(),
            network_mode: template.network_mode.clone(),
            placement_constraints: template.placement_constraints.clone(),
            requires_compatibilities,
            volumes: template.volumes.clone(),
        }
    }
}

/// Input for starting a one-off task.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTask {
    pub cluster: String,
    pub task_definition: TaskDefinitionArn,
    pub count: u32,
    pub started_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_configuration: Option<NetworkConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfiguration {
    pub awsvpc_configuration: AwsVpcConfiguration,
}

/// Placement of an `awsvpc` task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsVpcConfiguration {
    pub subnets: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<String>,
    /// `ENABLED` or `DISABLED`.
    pub assign_public_ip: String,
}

/// A task as reported by run and describe calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_arn: TaskArn,
    #[serde(default)]
    pub last_status: String,
    #[serde(default)]
    pub stopped_reason: Option<String>,
    #[serde(default)]
    pub containers: Vec<TaskContainer>,
}

/// One container of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskContainer {
    pub name: String,
    #[serde(default)]
    pub exit_code: Option<i32>,
    /// Set when the container stopped for a reason other than exiting.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Result of starting a task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunTaskOutput {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub failures: Vec<DescribeFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> TaskDefinition {
        serde_json::from_value(serde_json::json!({
            "taskDefinitionArn": "arn:aws:ecs:eu-west-1:123456789012:task-definition/web:7",
            "family": "web",
            "revision": 7,
            "containerDefinitions": [
                {"name": "app", "image": "repo/app:v1", "essential": true, "portMappings": [{"containerPort": 80}]}
            ],
            "cpu": "256",
            "memory": "512",
            "networkMode": "awsvpc",
            "compatibilities": ["EC2", "FARGATE"],
            "requiresCompatibilities": ["FARGATE"],
            "status": "ACTIVE"
        }))
        .unwrap()
    }

    #[test]
    fn container_definition_keeps_unknown_fields() {
        let task = template();
        let container = &task.container_definitions[0];
        assert_eq!(container.extra.get("essential"), Some(&Value::Bool(true)));

        let json = serde_json::to_value(container).unwrap();
        assert_eq!(json["portMappings"][0]["containerPort"], 80);
    }

    #[test]
    fn register_input_copies_template_metadata() {
        let task = template();
        let input = RegisterTaskDefinition::from_template(&task, task.container_definitions.clone());

        assert_eq!(input.family, "web");
        assert_eq!(input.cpu.as_deref(), Some("256"));
        assert_eq!(input.network_mode.as_deref(), Some("awsvpc"));
        assert_eq!(input.requires_compatibilities, vec!["FARGATE".to_string()]);
    }

    #[test]
    fn register_input_falls_back_to_compatibilities() {
        let mut task = template();
        task.requires_compatibilities.clear();
        let input = RegisterTaskDefinition::from_template(&task, vec![]);
        assert_eq!(input.requires_compatibilities, vec!["EC2", "FARGATE"]);
    }

    #[test]
    fn register_input_omits_empty_fields() {
        let mut task = template();
        task.execution_role_arn = None;
        task.volumes.clear();
        let json = serde_json::to_value(RegisterTaskDefinition::from_template(&task, vec![])).unwrap();
        assert!(json.get("executionRoleArn").is_none());
        assert!(json.get("volumes").is_none());
    }

    #[test]
    fn describe_failure_display() {
        let failure = DescribeFailure {
            arn: Some("arn:aws:ecs:eu-west-1:123456789012:service/prod/web".to_string()),
            reason: Some("MISSING".to_string()),
            detail: None,
        };
        assert_eq!(
            failure.to_string(),
            "arn:aws:ecs:eu-west-1:123456789012:service/prod/web: MISSING"
        );
    }

    #[test]
    fn container_command_and_logs_are_typed() {
        let container: ContainerDefinition = serde_json::from_value(serde_json::json!({
            "name": "app",
            "image": "repo/app:v1",
            "command": ["rake", "db:migrate"],
            "logConfiguration": {
                "logDriver": "awslogs",
                "options": {"awslogs-group": "/ecs/app"},
                "secretOptions": []
            }
        }))
        .unwrap();

        assert_eq!(
            container.command,
            Some(vec!["rake".to_string(), "db:migrate".to_string()])
        );
        let logs = container.log_configuration.unwrap();
        assert_eq!(logs.options["awslogs-group"], "/ecs/app");
        assert!(logs.extra.contains_key("secretOptions"));
        assert!(container.extra.is_empty());
    }

    #[test]
    fn run_task_input_uses_wire_names() {
        let input = RunTask {
            cluster: "prod".to_string(),
            task_definition: TaskDefinitionArn::new("web:8"),
            count: 1,
            started_by: "ecsroll".to_string(),
            launch_type: Some("FARGATE".to_string()),
            network_configuration: Some(NetworkConfiguration {
                awsvpc_configuration: AwsVpcConfiguration {
                    subnets: vec!["subnet-1".to_string()],
                    security_groups: Vec::new(),
                    assign_public_ip: "DISABLED".to_string(),
                },
            }),
        };

        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["taskDefinition"], "web:8");
        assert_eq!(json["startedBy"], "ecsroll");
        let vpc = &json["networkConfiguration"]["awsvpcConfiguration"];
        assert_eq!(vpc["subnets"][0], "subnet-1");
        assert_eq!(vpc["assignPublicIp"], "DISABLED");
        assert!(vpc.get("securityGroups").is_none());
    }

    #[test]
    fn stopped_task_parses_container_exits() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "taskArn": "arn:aws:ecs:eu-west-1:123456789012:task/prod/abc123",
            "lastStatus": "STOPPED",
            "stoppedReason": "Essential container in task exited",
            "containers": [
                {"name": "app", "exitCode": 3},
                {"name": "proxy", "reason": "OutOfMemoryError: Container killed due to memory usage"}
            ]
        }))
        .unwrap();

        assert_eq!(task.task_arn.short_name(), "abc123");
        assert_eq!(task.containers[0].exit_code, Some(3));
        assert!(task.containers[1].exit_code.is_none());
        assert!(task.containers[1].reason.is_some());
    }
}
