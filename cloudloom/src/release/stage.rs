//! Pipeline stage model.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The source revision handle available before any stage runs.
pub const REVISION: &str = "revision";
/// The checked-out source artifact produced by the Source stage.
pub const SOURCE_ARTIFACT: &str = "source_artifact";
/// The machine-readable image reference produced by the Build stage.
pub const IMAGE_REF: &str = "image_ref";
/// The running service reference the Deploy stage updates.
pub const SERVICE_REF: &str = "service_ref";

/// The fixed stage positions of the release pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StageKind {
    /// Checks out the source revision.
    Source,
    /// Builds and pushes the container image.
    Build,
    /// Runs database migrations against the provisioned database.
    Migrate,
    /// Rolls the new image out to the compute service.
    Deploy,
}

impl StageKind {
    /// Returns the fixed position of this kind in the pipeline.
    #[must_use]
    pub fn position(self) -> usize {
        match self {
            Self::Source => 0,
            Self::Build => 1,
            Self::Migrate => 2,
            Self::Deploy => 3,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Source => "Source",
            Self::Build => "Build",
            Self::Migrate => "Migrate",
            Self::Deploy => "Deploy",
        };
        write!(f, "{s}")
    }
}

/// One stage of the release pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStage {
    /// The stage name.
    pub name: String,
    /// The stage's fixed kind/position.
    pub kind: StageKind,
    /// Inputs the stage requires: artifacts of earlier stages or published
    /// config namespaces.
    pub requires: BTreeSet<String>,
    /// Artifacts the stage hands to later stages.
    pub produces: BTreeSet<String>,
    /// Environment values passed to the stage's external collaborator.
    pub env: BTreeMap<String, String>,
}

impl PipelineStage {
    /// Creates a stage with no requirements or products.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: StageKind) -> Self {
        Self {
            name: name.into(),
            kind,
            requires: BTreeSet::new(),
            produces: BTreeSet::new(),
            env: BTreeMap::new(),
        }
    }

    /// Adds a required input.
    #[must_use]
    pub fn with_requirement(mut self, input: impl Into<String>) -> Self {
        self.requires.insert(input.into());
        self
    }

    /// Adds a produced artifact.
    #[must_use]
    pub fn with_product(mut self, artifact: impl Into<String>) -> Self {
        self.produces.insert(artifact.into());
        self
    }

    /// Adds an environment value.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_positions_are_fixed() {
        assert!(StageKind::Source.position() < StageKind::Build.position());
        assert!(StageKind::Build.position() < StageKind::Migrate.position());
        assert!(StageKind::Migrate.position() < StageKind::Deploy.position());
    }

    #[test]
    fn test_stage_builder() {
        let stage = PipelineStage::new("build", StageKind::Build)
            .with_requirement(SOURCE_ARTIFACT)
            .with_product(IMAGE_REF)
            .with_env("DOCKER_BUILDKIT", "1");

        assert!(stage.requires.contains(SOURCE_ARTIFACT));
        assert!(stage.produces.contains(IMAGE_REF));
        assert_eq!(stage.env["DOCKER_BUILDKIT"], "1");
    }
}
