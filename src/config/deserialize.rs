// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Validates service names and tag lists while the YAML is parsed.

use serde::Deserialize;

use crate::types::ServiceName;

pub fn deserialize_service_names<'de, D>(deserializer: D) -> Result<Vec<ServiceName>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<String> = Vec::deserialize(deserializer)?;
    values
        .iter()
        .map(|s| ServiceName::new(s).map_err(serde::de::Error::custom))
        .collect()
}

/// Accepts either a YAML list or a comma-separated string (`"a,,c"`).
pub fn deserialize_tag_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TagList {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match TagList::deserialize(deserializer)? {
        TagList::List(tags) => tags,
        TagList::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    })
}
