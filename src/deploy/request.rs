// ABOUTME: Immutable description of one deployment run.
// ABOUTME: Built once from CLI/config input and shared read-only by every worker.

use std::time::Duration;

use nonempty::NonEmpty;

use super::error::DeployError;
use super::mutator::TagOverrides;
use crate::types::ServiceName;

/// Default interval between status tailer polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default bound on a single stabilization wait.
pub const DEFAULT_STABILIZE_TIMEOUT: Duration = Duration::from_secs(600);

/// What to deploy, where, and with which tags.
#[derive(Debug, Clone)]
pub struct DeploymentRequest {
    cluster: String,
    services: NonEmpty<ServiceName>,
    overrides: TagOverrides,
    poll_interval: Duration,
    stabilize_timeout: Duration,
}

impl DeploymentRequest {
    /// Create a request for `services` in `cluster`.
    ///
    /// Duplicate service names are dropped, keeping the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::NoServices` if `services` is empty, and
    /// `DeployError::InvalidRequest` if `cluster` is blank.
    pub fn new(
        cluster: impl Into<String>,
        services: impl IntoIterator<Item = ServiceName>,
    ) -> Result<Self, DeployError> {
        let cluster = cluster.into();
        if cluster.trim().is_empty() {
            return Err(DeployError::InvalidRequest(
                "cluster name cannot be empty".to_string(),
            ));
        }

        let mut unique: Vec<ServiceName> = Vec::new();
        for service in services {
            if !unique.contains(&service) {
                unique.push(service);
            }
        }
        let services = NonEmpty::from_vec(unique).ok_or(DeployError::NoServices)?;

        Ok(Self {
            cluster,
            services,
            overrides: TagOverrides::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            stabilize_timeout: DEFAULT_STABILIZE_TIMEOUT,
        })
    }

    pub fn with_image_tag(mut self, tag: impl Into<String>) -> Self {
        self.overrides.image_tag = Some(tag.into());
        self
    }

    pub fn with_image_tags(mut self, tags: Vec<String>) -> Self {
        self.overrides.image_tags = tags;
        self
    }

    /// Only touch containers with these names.
    pub fn with_containers(mut self, names: Vec<String>) -> Self {
        self.overrides.containers = Some(names);
        self
    }

    pub fn with_workdir(mut self, workdir: impl Into<String>) -> Self {
        self.overrides.workdir = Some(workdir.into());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_stabilize_timeout(mut self, timeout: Duration) -> Self {
        self.stabilize_timeout = timeout;
        self
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn services(&self) -> &NonEmpty<ServiceName> {
        &self.services
    }

    pub fn overrides(&self) -> &TagOverrides {
        &self.overrides
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn stabilize_timeout(&self) -> Duration {
        self.stabilize_timeout
    }
}
