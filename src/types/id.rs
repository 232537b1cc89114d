// ABOUTME: Phantom-typed ARNs for compile-time type safety.
// ABOUTME: Prevents accidental swapping of cluster, service, task definition and task references.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker types for phantom type parameters.
/// Using empty enums prevents instantiation and requires no trait bounds.
pub enum ClusterMarker {}
pub enum ServiceMarker {}
pub enum TaskDefinitionMarker {}
pub enum TaskMarker {}

/// A type-safe resource reference that prevents accidental mixing of ARN kinds.
///
/// Deregistering a service ARN as if it were a task definition would be a
/// costly mistake, so the kind is carried in the type.
#[must_use = "ARNs reference cluster resources and should not be ignored"]
pub struct Arn<T> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T> Arn<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_inner(self) -> String {
        self.value
    }

    /// The last path segment of the resource part, e.g. `web:42` for a
    /// task definition or `web` for a service.
    pub fn short_name(&self) -> &str {
        self.value.rsplit('/').next().unwrap_or(&self.value)
    }

    /// The region segment of a full ARN.
    pub fn region(&self) -> Option<&str> {
        let mut parts = self.value.splitn(6, ':');
        match (parts.next(), parts.nth(2)) {
            (Some("arn"), Some(region)) if !region.is_empty() => Some(region),
            _ => None,
        }
    }
}

// Manual trait implementations that don't require T to implement the trait.
// This is necessary because T is only used as a phantom type marker.

impl<T> std::fmt::Debug for Arn<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arn").field("value", &self.value).finish()
    }
}

impl<T> Clone for Arn<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Arn<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Arn<T> {}

impl<T> Hash for Arn<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for Arn<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Arn<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Arn<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}

pub type ClusterArn = Arn<ClusterMarker>;
pub type ServiceArn = Arn<ServiceMarker>;
pub type TaskDefinitionArn = Arn<TaskDefinitionMarker>;
pub type TaskArn = Arn<TaskMarker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_of_task_definition() {
        let arn = TaskDefinitionArn::new("arn:aws:ecs:eu-west-1:123456789012:task-definition/web:42");
        assert_eq!(arn.short_name(), "web:42");
    }

    #[test]
    fn short_name_without_slash_is_whole_value() {
        let arn = ServiceArn::new("web");
        assert_eq!(arn.short_name(), "web");
    }

    #[test]
    fn serializes_as_plain_string() {
        let arn = ClusterArn::new("arn:aws:ecs:eu-west-1:123456789012:cluster/prod");
        let json = serde_json::to_string(&arn).unwrap();
        assert_eq!(json, "\"arn:aws:ecs:eu-west-1:123456789012:cluster/prod\"");
        let back: ClusterArn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, arn);
    }

    #[test]
    fn region_of_full_arn() {
        let arn = TaskDefinitionArn::new("arn:aws:ecs:eu-west-1:123456789012:task-definition/web:42");
        assert_eq!(arn.region(), Some("eu-west-1"));
    }

    #[test]
    fn bare_family_has_no_region() {
        assert_eq!(TaskDefinitionArn::new("web:42").region(), None);
    }

    #[test]
    fn task_id_is_short_name() {
        let arn = TaskArn::new("arn:aws:ecs:eu-west-1:123456789012:task/prod/0f9a6c3e1b2d4e5f");
        assert_eq!(arn.short_name(), "0f9a6c3e1b2d4e5f");
    }
}
