// ABOUTME: ECS-compatible service reference validation.
// ABOUTME: Accepts a bare name (letters, digits, hyphens, underscores) or a full service ARN.

use std::fmt;
use thiserror::Error;

const MAX_LEN: usize = 255;

#[derive(Debug, Error)]
pub enum ServiceNameError {
    #[error("service name cannot be empty")]
    Empty,

    #[error("service name exceeds maximum length of 255 characters")]
    TooLong,

    #[error("service name must start with a letter or digit")]
    InvalidStart,

    #[error("invalid character in service name: '{0}'")]
    InvalidChar(char),

    #[error("not an ECS service ARN: {0}")]
    InvalidArn(String),
}

/// A service as the control plane accepts it: its name, or its full ARN
/// (`arn:aws:ecs:region:account:service/cluster/name`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(value: &str) -> Result<Self, ServiceNameError> {
        if value.starts_with("arn:") {
            validate_arn(value)?;
        } else {
            validate_name(value)?;
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bare service name, without any ARN prefix.
    pub fn name(&self) -> &str {
        if self.is_arn() {
            self.0.rsplit('/').next().unwrap_or(&self.0)
        } else {
            &self.0
        }
    }

    pub fn is_arn(&self) -> bool {
        self.0.starts_with("arn:")
    }
}

fn validate_arn(value: &str) -> Result<(), ServiceNameError> {
    let invalid = || ServiceNameError::InvalidArn(value.to_string());

    // arn:partition:ecs:region:account:service/[cluster/]name
    let parts: Vec<&str> = value.splitn(6, ':').collect();
    let [_, partition, "ecs", region, account, resource] = parts.as_slice() else {
        return Err(invalid());
    };
    if partition.is_empty() || region.is_empty() || account.is_empty() {
        return Err(invalid());
    }

    let Some(path) = resource.strip_prefix("service/") else {
        return Err(invalid());
    };
    let name = path.rsplit('/').next().unwrap_or(path);
    validate_name(name).map_err(|_| invalid())
}

fn validate_name(value: &str) -> Result<(), ServiceNameError> {
    let Some(first) = value.chars().next() else {
        return Err(ServiceNameError::Empty);
    };

    if value.len() > MAX_LEN {
        return Err(ServiceNameError::TooLong);
    }

    if !first.is_ascii_alphanumeric() {
        return Err(ServiceNameError::InvalidStart);
    }

    for c in value.chars() {
        if !c.is_ascii_alphanumeric() && c != '-' && c != '_' {
            return Err(ServiceNameError::InvalidChar(c));
        }
    }

    Ok(())
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ServiceName {
    type Err = ServiceNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
