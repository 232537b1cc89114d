// ABOUTME: Image tag rewriting for task definition container lists.
// ABOUTME: Pure function: same template and overrides always yield the same containers.

use crate::cluster::ContainerDefinition;
use crate::types::TaggedImage;

/// Placeholder replaced with the container's own name inside a tag.
pub const CONTAINER_NAME_PLACEHOLDER: &str = "{container_name}";

/// How to rewrite the containers of a task definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagOverrides {
    /// Tag applied to every container. Wins over `image_tags`.
    pub image_tag: Option<String>,
    /// Tags by container position; empty entries leave that container alone.
    pub image_tags: Vec<String>,
    /// When set, only containers with these names are touched.
    pub containers: Option<Vec<String>>,
    /// Working directory set on every touched container.
    pub workdir: Option<String>,
}

impl TagOverrides {
    /// Override every container with `tag`.
    pub fn global(tag: impl Into<String>) -> Self {
        Self {
            image_tag: Some(tag.into()),
            ..Self::default()
        }
    }

    /// The tag to apply to the container at `index`, with placeholders expanded.
    pub fn effective_tag(&self, index: usize, container_name: &str) -> Option<String> {
        let template = self
            .image_tag
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| {
                self.image_tags
                    .get(index)
                    .map(String::as_str)
                    .filter(|t| !t.is_empty())
            })?;

        Some(template.replace(CONTAINER_NAME_PLACEHOLDER, container_name))
    }

    fn selects(&self, container_name: &str) -> bool {
        match &self.containers {
            Some(names) => names.iter().any(|n| n == container_name),
            None => true,
        }
    }

    /// Whether applying these overrides can change anything.
    pub fn is_empty(&self) -> bool {
        self.effective_tag_source_is_empty() && self.workdir.is_none()
    }

    fn effective_tag_source_is_empty(&self) -> bool {
        self.image_tag.as_deref().is_none_or(str::is_empty)
            && self.image_tags.iter().all(String::is_empty)
    }
}

/// Produce a rewritten copy of `template`'s containers.
///
/// A container's image is retagged only when it is an unambiguous
/// `repository:tag` reference; anything else is left as is.
pub fn mutate(template: &[ContainerDefinition], overrides: &TagOverrides) -> Vec<ContainerDefinition> {
    template
        .iter()
        .enumerate()
        .map(|(index, container)| mutate_container(index, container, overrides))
        .collect()
}

fn mutate_container(
    index: usize,
    container: &ContainerDefinition,
    overrides: &TagOverrides,
) -> ContainerDefinition {
    let mut mutated = container.clone();

    if !overrides.selects(&container.name) {
        tracing::debug!(container_name = %container.name, "container not selected, leaving it alone");
        return mutated;
    }

    match TaggedImage::parse(&container.image) {
        Some(image) => {
            if let Some(new_tag) = overrides.effective_tag(index, &container.name) {
                mutated.image = image.with_tag(&new_tag);
                tracing::debug!(
                    container_name = %container.name,
                    image = %mutated.image,
                    new_tag = %new_tag,
                    old_tag = %image.tag(),
                    "image tag changed"
                );
            }
        }
        None => {
            tracing::debug!(
                container_name = %container.name,
                image = %container.image,
                "image has no unambiguous tag, leaving it alone"
            );
        }
    }

    if let Some(workdir) = &overrides.workdir {
        mutated.working_directory = Some(workdir.clone());
        tracing::debug!(container_name = %container.name, workdir = %workdir, "workdir changed");
    }

    mutated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn containers(images: &[(&str, &str)]) -> Vec<ContainerDefinition> {
        images
            .iter()
            .map(|(name, image)| ContainerDefinition::new(*name, *image))
            .collect()
    }

    fn images(defs: &[ContainerDefinition]) -> Vec<&str> {
        defs.iter().map(|c| c.image.as_str()).collect()
    }

    #[test]
    fn global_tag_replaces_every_tag() {
        let template = containers(&[("web", "repo/web:old"), ("sidecar", "repo/proxy:1.0")]);
        let result = mutate(&template, &TagOverrides::global("new"));
        assert_eq!(images(&result), vec!["repo/web:new", "repo/proxy:new"]);
    }

    #[test]
    fn ecr_repository_is_preserved() {
        let template = containers(&[("app", "acct.dkr.ecr.region.amazonaws.com/app:old")]);
        let result = mutate(&template, &TagOverrides::global("new"));
        assert_eq!(images(&result), vec!["acct.dkr.ecr.region.amazonaws.com/app:new"]);
    }

    #[test]
    fn global_tag_wins_over_positional_tags() {
        let template = containers(&[("web", "repo/web:old")]);
        let overrides = TagOverrides {
            image_tag: Some("global".to_string()),
            image_tags: vec!["positional".to_string()],
            ..TagOverrides::default()
        };
        assert_eq!(images(&mutate(&template, &overrides)), vec!["repo/web:global"]);
    }

    #[test]
    fn empty_global_tag_falls_back_to_positional() {
        let template = containers(&[("web", "repo/web:old")]);
        let overrides = TagOverrides {
            image_tag: Some(String::new()),
            image_tags: vec!["positional".to_string()],
            ..TagOverrides::default()
        };
        assert_eq!(images(&mutate(&template, &overrides)), vec!["repo/web:positional"]);
    }

    #[test]
    fn positional_tags_skip_empty_entries() {
        let template = containers(&[
            ("a", "repo/a:1"),
            ("b", "repo/b:1"),
            ("c", "repo/c:1"),
            ("d", "repo/d:1"),
        ]);
        let overrides = TagOverrides {
            image_tags: vec!["first".to_string(), String::new(), "last".to_string()],
            ..TagOverrides::default()
        };
        assert_eq!(
            images(&mutate(&template, &overrides)),
            vec!["repo/a:first", "repo/b:1", "repo/c:last", "repo/d:1"]
        );
    }

    #[test]
    fn container_name_placeholder_is_expanded() {
        let template = containers(&[("web", "repo/app:old"), ("worker", "repo/app:old")]);
        let result = mutate(&template, &TagOverrides::global("build-{container_name}"));
        assert_eq!(images(&result), vec!["repo/app:build-web", "repo/app:build-worker"]);
    }

    #[test]
    fn untagged_and_ambiguous_images_are_untouched() {
        let template = containers(&[
            ("plain", "nginx"),
            ("port", "registry:5000/app:v1"),
            ("digest", "app@sha256:abc"),
        ]);
        let result = mutate(&template, &TagOverrides::global("new"));
        assert_eq!(result, template);
    }

    #[test]
    fn container_filter_limits_changes() {
        let template = containers(&[("web", "repo/web:old"), ("sidecar", "repo/proxy:1.0")]);
        let overrides = TagOverrides {
            image_tag: Some("new".to_string()),
            containers: Some(vec!["web".to_string()]),
            ..TagOverrides::default()
        };
        assert_eq!(
            images(&mutate(&template, &overrides)),
            vec!["repo/web:new", "repo/proxy:1.0"]
        );
    }

    #[test]
    fn workdir_is_set_on_selected_containers() {
        let template = containers(&[("web", "nginx")]);
        let overrides = TagOverrides {
            workdir: Some("/srv/app".to_string()),
            ..TagOverrides::default()
        };
        let result = mutate(&template, &overrides);
        assert_eq!(result[0].working_directory.as_deref(), Some("/srv/app"));
        assert_eq!(result[0].image, "nginx");
    }

    #[test]
    fn template_is_not_modified() {
        let template = containers(&[("web", "repo/web:old")]);
        let _ = mutate(&template, &TagOverrides::global("new"));
        assert_eq!(template[0].image, "repo/web:old");
    }

    #[test]
    fn empty_overrides() {
        assert!(TagOverrides::default().is_empty());
        assert!(!TagOverrides::global("v1").is_empty());
        let blanks = TagOverrides {
            image_tags: vec![String::new()],
            ..TagOverrides::default()
        };
        assert!(blanks.is_empty());
    }
}
