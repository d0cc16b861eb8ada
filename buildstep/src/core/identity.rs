//! Build identity derived from the ref comparison and the pipeline counter.

use std::fmt;

/// Distinguishes main-line builds from everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPrefix {
    Master,
    Pr,
}

impl BuildPrefix {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Pr => "pr",
        }
    }
}

impl fmt::Display for BuildPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagging decision for one build.
///
/// Recomputed by every step that needs it; never persisted except through the
/// build-id artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildIdentity {
    pub prefix: BuildPrefix,
    pub counter: String,
    /// Also tag (and push) `{image}:latest`.
    pub add_latest_tag: bool,
}

impl BuildIdentity {
    /// A build at the reference tip is a `master` build and also gets `latest`.
    pub fn new(is_reference_tip: bool, counter: impl Into<String>) -> Self {
        let prefix = if is_reference_tip {
            BuildPrefix::Master
        } else {
            BuildPrefix::Pr
        };
        Self {
            prefix,
            counter: counter.into(),
            add_latest_tag: is_reference_tip,
        }
    }

    /// `{prefix}-{counter}`, e.g. `master-42`.
    pub fn build_id(&self) -> String {
        format!("{}-{}", self.prefix, self.counter)
    }

    pub fn primary_tag(&self, image: &str) -> String {
        format!("{image}:{}", self.build_id())
    }

    pub fn latest_tag(&self, image: &str) -> Option<String> {
        self.add_latest_tag.then(|| format!("{image}:latest"))
    }

    /// Primary tag first, then `latest` when applicable.
    pub fn tags(&self, image: &str) -> Vec<String> {
        let mut tags = vec![self.primary_tag(image)];
        tags.extend(self.latest_tag(image));
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tip_build_is_master_with_latest() {
        let identity = BuildIdentity::new(true, "42");
        assert_eq!(identity.prefix, BuildPrefix::Master);
        assert!(identity.add_latest_tag);
        assert_eq!(identity.build_id(), "master-42");
        assert_eq!(
            identity.tags("registry/app"),
            vec!["registry/app:master-42", "registry/app:latest"]
        );
    }

    #[test]
    fn other_build_is_pr_without_latest() {
        let identity = BuildIdentity::new(false, "42");
        assert_eq!(identity.prefix, BuildPrefix::Pr);
        assert_eq!(identity.build_id(), "pr-42");
        assert_eq!(identity.latest_tag("registry/app"), None);
        assert_eq!(identity.tags("registry/app"), vec!["registry/app:pr-42"]);
    }

    #[test]
    fn counter_is_used_verbatim() {
        let identity = BuildIdentity::new(false, "42.1-rc");
        assert_eq!(identity.primary_tag("app"), "app:pr-42.1-rc");
    }
}
