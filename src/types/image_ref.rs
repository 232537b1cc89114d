// ABOUTME: Splits container image references into repository and tag.
// ABOUTME: Only unambiguous `repository:tag` references are considered taggable.

use std::fmt;

/// An image reference of the exact form `repository:tag`.
///
/// References with a registry port (`host:5000/app:tag`), a digest
/// (`app@sha256:...`) or no tag at all do not parse. Retagging those would
/// mean guessing which colon separates the tag, so callers leave them alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedImage<'a> {
    repository: &'a str,
    tag: &'a str,
}

impl<'a> TaggedImage<'a> {
    pub fn parse(image: &'a str) -> Option<Self> {
        if image.contains('@') {
            return None;
        }

        let (repository, tag) = image.rsplit_once(':')?;
        if repository.contains(':') {
            return None;
        }

        Some(Self { repository, tag })
    }

    pub fn repository(&self) -> &'a str {
        self.repository
    }

    pub fn tag(&self) -> &'a str {
        self.tag
    }

    /// Build the reference with the tag replaced.
    pub fn with_tag(&self, tag: &str) -> String {
        format!("{}:{}", self.repository, tag)
    }
}

impl fmt::Display for TaggedImage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}
