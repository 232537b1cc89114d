// ABOUTME: Test support utilities.
// ABOUTME: Provides an in-memory control plane with scripted failures and a call log.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ecsroll::cluster::{
    ContainerDefinition, ControlPlaneError, DescribeFailure, DescribeServiceOutput, LogOps,
    RegisterTaskDefinition, RunTask, RunTaskOutput, ServiceDescription, ServiceEvent, ServiceOps,
    Task, TaskContainer, TaskDefinition, TaskDefinitionOps, TaskOps,
};
use ecsroll::types::{ClusterArn, ServiceArn, ServiceName, TaskArn, TaskDefinitionArn};
use parking_lot::Mutex;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("ecsroll=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

const ACCOUNT: &str = "arn:aws:ecs:eu-west-1:123456789012";

#[allow(dead_code)]
pub fn name(value: &str) -> ServiceName {
    ServiceName::new(value).unwrap()
}

/// A fixed instant plus `secs` seconds.
#[allow(dead_code)]
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

#[allow(dead_code)]
pub fn event(secs: i64, message: &str) -> ServiceEvent {
    ServiceEvent {
        id: format!("evt-{secs}"),
        created_at: at(secs),
        message: message.to_string(),
    }
}

/// Everything the fake was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Call {
    DescribeService(String),
    DescribeTaskDefinition(String),
    Register(String),
    Update { service: String, task_definition: String },
    Wait(String),
    Deregister(String),
    ListEvents(String),
    RunTask(String),
    WaitStopped(String),
    DescribeTasks(String),
    FetchLogs { group: String, stream: String },
    DeleteLogStream { group: String, stream: String },
}

#[derive(Debug, Clone)]
struct FakeService {
    original: String,
    current: String,
}

#[derive(Debug, Default)]
struct FakeState {
    services: HashMap<String, FakeService>,
    task_definitions: HashMap<String, TaskDefinition>,
    revisions: HashMap<String, i64>,
    unstable: HashSet<String>,
    hanging: HashSet<String>,
    panicking: HashSet<String>,
    describe_failures: HashSet<String>,
    failing_register: HashSet<String>,
    failing_rollback: HashSet<String>,
    failing_deregister: bool,
    failing_events: bool,
    events: HashMap<String, VecDeque<Vec<ServiceEvent>>>,
    registered: Vec<RegisterTaskDefinition>,
    runs: Vec<RunTask>,
    task_exits: Option<Vec<TaskContainer>>,
    task_logs: Vec<String>,
    failing_run: bool,
    no_capacity: bool,
    tasks_never_stop: bool,
    failing_logs: bool,
    failing_log_delete: bool,
    calls: Vec<Call>,
}

/// In-memory cluster with one task definition family per service.
#[derive(Debug)]
pub struct FakeControlPlane {
    cluster: String,
    state: Mutex<FakeState>,
}

#[allow(dead_code)]
impl FakeControlPlane {
    pub fn new(cluster: &str) -> Self {
        Self {
            cluster: cluster.to_string(),
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Add a service running revision 1 of its own family.
    pub fn with_service(self, service: &str, containers: &[(&str, &str)]) -> Self {
        let arn = self.define(service, containers);
        self.state.lock().services.insert(
            service.to_string(),
            FakeService {
                original: arn.clone(),
                current: arn,
            },
        );
        self
    }

    /// Add revision 1 of a task definition family that no service uses.
    pub fn with_task_definition(self, family: &str, containers: &[(&str, &str)]) -> Self {
        self.define(family, containers);
        self
    }

    fn define(&self, family: &str, containers: &[(&str, &str)]) -> String {
        let mut state = self.state.lock();
        let arn = format!("{ACCOUNT}:task-definition/{family}:1");
        let definition = TaskDefinition {
            task_definition_arn: TaskDefinitionArn::new(&arn),
            family: family.to_string(),
            revision: Some(1),
            container_definitions: containers
                .iter()
                .map(|(name, image)| ContainerDefinition::new(*name, *image))
                .collect(),
            cpu: Some("256".to_string()),
            memory: Some("512".to_string()),
            execution_role_arn: None,
            task_role_arn: None,
            network_mode: Some("awsvpc".to_string()),
            placement_constraints: Vec::new(),
            compatibilities: vec!["EC2".to_string(), "FARGATE".to_string()],
            requires_compatibilities: vec!["FARGATE".to_string()],
            volumes: Vec::new(),
        };
        state.task_definitions.insert(arn.clone(), definition);
        state.revisions.insert(family.to_string(), 1);
        arn
    }

    /// Waits fail while the service points at anything but its original revision.
    pub fn unstable(self, service: &str) -> Self {
        self.state.lock().unstable.insert(service.to_string());
        self
    }

    /// Waits never return while the service points at a new revision.
    pub fn hanging(self, service: &str) -> Self {
        self.state.lock().hanging.insert(service.to_string());
        self
    }

    /// Waits panic while the service points at a new revision.
    pub fn panicking(self, service: &str) -> Self {
        self.state.lock().panicking.insert(service.to_string());
        self
    }

    /// Describe returns a failure list for this service.
    pub fn describe_failure(self, service: &str) -> Self {
        self.state.lock().describe_failures.insert(service.to_string());
        self
    }

    pub fn failing_register(self, family: &str) -> Self {
        self.state.lock().failing_register.insert(family.to_string());
        self
    }

    /// Updates back to the original revision fail.
    pub fn failing_rollback(self, service: &str) -> Self {
        self.state.lock().failing_rollback.insert(service.to_string());
        self
    }

    pub fn failing_deregister(self) -> Self {
        self.state.lock().failing_deregister = true;
        self
    }

    pub fn failing_events(self) -> Self {
        self.state.lock().failing_events = true;
        self
    }

    /// Successive event polls return these batches; the last one repeats.
    pub fn with_event_batches(self, service: &str, batches: Vec<Vec<ServiceEvent>>) -> Self {
        self.state
            .lock()
            .events
            .insert(service.to_string(), batches.into());
        self
    }

    /// Containers the stopped task reports. Defaults to every container exiting 0.
    pub fn task_exits(self, containers: Vec<TaskContainer>) -> Self {
        self.state.lock().task_exits = Some(containers);
        self
    }

    /// Lines in the task's log stream.
    pub fn task_logs(self, lines: &[&str]) -> Self {
        self.state.lock().task_logs = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn failing_run(self) -> Self {
        self.state.lock().failing_run = true;
        self
    }

    /// Run-task accepts the call but places no task.
    pub fn no_capacity(self) -> Self {
        self.state.lock().no_capacity = true;
        self
    }

    pub fn tasks_never_stop(self) -> Self {
        self.state.lock().tasks_never_stop = true;
        self
    }

    pub fn failing_logs(self) -> Self {
        self.state.lock().failing_logs = true;
        self
    }

    pub fn failing_log_delete(self) -> Self {
        self.state.lock().failing_log_delete = true;
        self
    }

    pub fn runs(&self) -> Vec<RunTask> {
        self.state.lock().runs.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn deregistered(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Deregister(arn) => Some(arn),
                _ => None,
            })
            .collect()
    }

    pub fn registered(&self) -> Vec<RegisterTaskDefinition> {
        self.state.lock().registered.clone()
    }

    pub fn original_of(&self, service: &str) -> String {
        self.state.lock().services[service].original.clone()
    }

    pub fn current_of(&self, service: &str) -> String {
        self.state.lock().services[service].current.clone()
    }

    fn service_arn(&self, service: &str) -> ServiceArn {
        ServiceArn::new(format!("{ACCOUNT}:service/{}/{service}", self.cluster))
    }

    fn cluster_arn(&self) -> ClusterArn {
        ClusterArn::new(format!("{ACCOUNT}:cluster/{}", self.cluster))
    }
}

#[async_trait]
impl ServiceOps for FakeControlPlane {
    async fn describe_service(
        &self,
        cluster: &str,
        service: &ServiceName,
    ) -> Result<DescribeServiceOutput, ControlPlaneError> {
        let mut state = self.state.lock();
        let service = service.name();
        state.calls.push(Call::DescribeService(service.to_string()));

        if cluster != self.cluster {
            return Err(ControlPlaneError::NotFound(format!("cluster {cluster}")));
        }

        if state.describe_failures.contains(service) {
            return Ok(DescribeServiceOutput {
                service: None,
                failures: vec![DescribeFailure {
                    arn: Some(self.service_arn(service).into_inner()),
                    reason: Some("MISSING".to_string()),
                    detail: None,
                }],
            });
        }

        let Some(fake) = state.services.get(service) else {
            return Err(ControlPlaneError::NotFound(format!("service {service}")));
        };

        Ok(DescribeServiceOutput {
            service: Some(ServiceDescription {
                service_arn: self.service_arn(service),
                service_name: service.to_string(),
                cluster_arn: self.cluster_arn(),
                task_definition: TaskDefinitionArn::new(&fake.current),
                status: "ACTIVE".to_string(),
                events: Vec::new(),
            }),
            failures: Vec::new(),
        })
    }

    async fn update_service(
        &self,
        _cluster: &ClusterArn,
        service: &ServiceArn,
        task_definition: &TaskDefinitionArn,
    ) -> Result<(), ControlPlaneError> {
        let mut state = self.state.lock();
        let name = service.short_name().to_string();
        state.calls.push(Call::Update {
            service: name.clone(),
            task_definition: task_definition.as_str().to_string(),
        });

        if !state.task_definitions.contains_key(task_definition.as_str()) {
            return Err(ControlPlaneError::Api(format!(
                "unknown task definition {task_definition}"
            )));
        }

        let rolling_back = state.failing_rollback.contains(&name);
        let fake = state
            .services
            .get_mut(&name)
            .ok_or_else(|| ControlPlaneError::NotFound(format!("service {name}")))?;

        if rolling_back && fake.original == task_definition.as_str() {
            return Err(ControlPlaneError::Api("AccessDeniedException".to_string()));
        }

        fake.current = task_definition.as_str().to_string();
        Ok(())
    }

    async fn wait_until_stable(
        &self,
        _cluster: &ClusterArn,
        service: &ServiceArn,
    ) -> Result<(), ControlPlaneError> {
        let name = service.short_name().to_string();
        let (unstable, hanging, panicking) = {
            let mut state = self.state.lock();
            state.calls.push(Call::Wait(name.clone()));
            let on_candidate = state
                .services
                .get(&name)
                .is_some_and(|fake| fake.current != fake.original);
            (
                on_candidate && state.unstable.contains(&name),
                on_candidate && state.hanging.contains(&name),
                on_candidate && state.panicking.contains(&name),
            )
        };

        if panicking {
            panic!("waiter for {name} blew up");
        }
        if hanging {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if unstable {
            return Err(ControlPlaneError::Waiter(
                "Waiter ServicesStable failed: Max attempts exceeded".to_string(),
            ));
        }
        Ok(())
    }

    async fn list_service_events(
        &self,
        _cluster: &str,
        service: &ServiceName,
    ) -> Result<Vec<ServiceEvent>, ControlPlaneError> {
        let mut state = self.state.lock();
        state.calls.push(Call::ListEvents(service.name().to_string()));

        if state.failing_events {
            return Err(ControlPlaneError::Transport("connection reset".to_string()));
        }

        let Some(batches) = state.events.get_mut(service.name()) else {
            return Ok(Vec::new());
        };
        let batch = if batches.len() > 1 {
            batches.pop_front().unwrap_or_default()
        } else {
            batches.front().cloned().unwrap_or_default()
        };
        Ok(batch)
    }
}

#[async_trait]
impl TaskDefinitionOps for FakeControlPlane {
    async fn describe_task_definition(
        &self,
        task_definition: &TaskDefinitionArn,
    ) -> Result<TaskDefinition, ControlPlaneError> {
        let mut state = self.state.lock();
        state
            .calls
            .push(Call::DescribeTaskDefinition(task_definition.as_str().to_string()));
        let wanted = task_definition.as_str();
        state
            .task_definitions
            .get(wanted)
            .or_else(|| {
                // A bare family resolves to its latest revision.
                state
                    .task_definitions
                    .values()
                    .filter(|d| d.family == wanted)
                    .max_by_key(|d| d.revision)
            })
            .cloned()
            .ok_or_else(|| ControlPlaneError::NotFound(wanted.to_string()))
    }

    async fn register_task_definition(
        &self,
        input: &RegisterTaskDefinition,
    ) -> Result<TaskDefinition, ControlPlaneError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Register(input.family.clone()));

        if state.failing_register.contains(&input.family) {
            return Err(ControlPlaneError::Api(
                "ClientException: Too many concurrent attempts".to_string(),
            ));
        }

        let revision = {
            let next = state.revisions.entry(input.family.clone()).or_insert(0);
            *next += 1;
            *next
        };
        let arn = format!("{ACCOUNT}:task-definition/{}:{revision}", input.family);
        let definition = TaskDefinition {
            task_definition_arn: TaskDefinitionArn::new(&arn),
            family: input.family.clone(),
            revision: Some(revision),
            container_definitions: input.container_definitions.clone(),
            cpu: input.cpu.clone(),
            memory: input.memory.clone(),
            execution_role_arn: input.execution_role_arn.clone(),
            task_role_arn: input.task_role_arn.clone(),
            network_mode: input.network_mode.clone(),
            placement_constraints: input.placement_constraints.clone(),
            compatibilities: input.requires_compatibilities.clone(),
            requires_compatibilities: input.requires_compatibilities.clone(),
            volumes: input.volumes.clone(),
        };

        state.task_definitions.insert(arn, definition.clone());
        state.registered.push(input.clone());
        Ok(definition)
    }

    async fn deregister_task_definition(
        &self,
        task_definition: &TaskDefinitionArn,
    ) -> Result<(), ControlPlaneError> {
        let mut state = self.state.lock();
        state
            .calls
            .push(Call::Deregister(task_definition.as_str().to_string()));

        if state.failing_deregister {
            return Err(ControlPlaneError::Api("AccessDeniedException".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskOps for FakeControlPlane {
    async fn run_task(&self, input: &RunTask) -> Result<RunTaskOutput, ControlPlaneError> {
        let mut state = self.state.lock();
        state
            .calls
            .push(Call::RunTask(input.task_definition.as_str().to_string()));
        state.runs.push(input.clone());

        if state.failing_run {
            return Err(ControlPlaneError::Api(
                "InvalidParameterException: No Container Instances were found".to_string(),
            ));
        }
        if state.no_capacity {
            return Ok(RunTaskOutput {
                tasks: Vec::new(),
                failures: vec![DescribeFailure {
                    arn: Some(format!("{ACCOUNT}:container-instance/abc")),
                    reason: Some("RESOURCE:MEMORY".to_string()),
                    detail: None,
                }],
            });
        }

        let task_arn = format!(
            "{ACCOUNT}:task/{}/0f1e2d3c{}",
            self.cluster,
            state.runs.len()
        );
        Ok(RunTaskOutput {
            tasks: vec![Task {
                task_arn: TaskArn::new(task_arn),
                last_status: "PROVISIONING".to_string(),
                stopped_reason: None,
                containers: Vec::new(),
            }],
            failures: Vec::new(),
        })
    }

    async fn wait_until_stopped(
        &self,
        _cluster: &str,
        tasks: &[TaskArn],
    ) -> Result<(), ControlPlaneError> {
        let never = {
            let mut state = self.state.lock();
            for task in tasks {
                state.calls.push(Call::WaitStopped(task.as_str().to_string()));
            }
            state.tasks_never_stop
        };
        if never {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(())
    }

    async fn describe_tasks(
        &self,
        _cluster: &str,
        tasks: &[TaskArn],
    ) -> Result<Vec<Task>, ControlPlaneError> {
        let mut state = self.state.lock();
        for task in tasks {
            state.calls.push(Call::DescribeTasks(task.as_str().to_string()));
        }

        let containers = match &state.task_exits {
            Some(containers) => containers.clone(),
            None => state
                .registered
                .last()
                .map(|input| {
                    input
                        .container_definitions
                        .iter()
                        .map(|c| TaskContainer {
                            name: c.name.clone(),
                            exit_code: Some(0),
                            reason: None,
                        })
                        .collect()
                })
                .unwrap_or_default(),
        };

        Ok(tasks
            .iter()
            .map(|task_arn| Task {
                task_arn: task_arn.clone(),
                last_status: "STOPPED".to_string(),
                stopped_reason: Some("Essential container in task exited".to_string()),
                containers: containers.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl LogOps for FakeControlPlane {
    async fn fetch_log_messages(
        &self,
        group: &str,
        stream: &str,
    ) -> Result<Vec<String>, ControlPlaneError> {
        let mut state = self.state.lock();
        state.calls.push(Call::FetchLogs {
            group: group.to_string(),
            stream: stream.to_string(),
        });

        if state.failing_logs {
            return Err(ControlPlaneError::NotFound(
                "ResourceNotFoundException: The specified log stream does not exist.".to_string(),
            ));
        }
        Ok(state.task_logs.clone())
    }

    async fn delete_log_stream(&self, group: &str, stream: &str) -> Result<(), ControlPlaneError> {
        let mut state = self.state.lock();
        state.calls.push(Call::DeleteLogStream {
            group: group.to_string(),
            stream: stream.to_string(),
        });

        if state.failing_log_delete {
            return Err(ControlPlaneError::Api("AccessDeniedException".to_string()));
        }
        Ok(())
    }
}
