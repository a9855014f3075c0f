//! Pipeline wiring validation.

use crate::errors::{CloudloomError, GraphValidationError, MissingStageInputError};
use crate::release::{PipelineStage, StageKind, IMAGE_REF};
use std::collections::BTreeSet;
use tracing::debug;

/// A validated, fully parameterized pipeline ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WiredPipeline {
    stages: Vec<PipelineStage>,
}

impl WiredPipeline {
    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    /// Returns the stage of a given kind, if present.
    #[must_use]
    pub fn stage(&self, kind: StageKind) -> Option<&PipelineStage> {
        self.stages.iter().find(|s| s.kind == kind)
    }
}

/// Validates a stage sequence against the availability rule: stage `n`'s
/// required inputs must be a subset of the initial inputs plus everything
/// stages before `n` produce.
#[derive(Debug, Clone, Default)]
pub struct PipelineWiring {
    initial_inputs: BTreeSet<String>,
    database_namespace: Option<String>,
}

impl PipelineWiring {
    /// Creates a wiring with no initial inputs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an input available before any stage runs: the source revision,
    /// a published config namespace, a service reference from the graph.
    #[must_use]
    pub fn with_initial_input(mut self, input: impl Into<String>) -> Self {
        self.initial_inputs.insert(input.into());
        self
    }

    /// Requires the Migrate stage to consume this published namespace and
    /// makes the namespace available as an initial input.
    #[must_use]
    pub fn with_database_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.initial_inputs.insert(namespace.clone());
        self.database_namespace = Some(namespace);
        self
    }

    /// Validates the stage sequence and returns the wired pipeline.
    ///
    /// Fails before any stage executes.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty or out-of-order sequence, a
    /// [`MissingStageInputError`] when a requirement is unsatisfied, and
    /// validation errors when the Migrate stage does not consume the
    /// database namespace or the Deploy stage does not consume the image
    /// reference.
    pub fn wire(&self, stages: Vec<PipelineStage>) -> Result<WiredPipeline, CloudloomError> {
        if stages.is_empty() {
            return Err(GraphValidationError::new("pipeline has no stages").into());
        }
        let mut last_position = None;
        for stage in &stages {
            let position = stage.kind.position();
            if last_position.is_some_and(|p| position <= p) {
                return Err(GraphValidationError::new(format!(
                    "stage '{}' is out of order; expected Source -> Build -> Migrate -> Deploy",
                    stage.name
                ))
                .with_nodes(vec![stage.name.clone()])
                .into());
            }
            last_position = Some(position);
        }

        let mut available = self.initial_inputs.clone();
        for stage in &stages {
            if let Some(missing) = stage.requires.difference(&available).next() {
                return Err(MissingStageInputError::new(&stage.name, missing).into());
            }
            match stage.kind {
                StageKind::Migrate => {
                    if let Some(namespace) = &self.database_namespace {
                        if !stage.requires.contains(namespace) {
                            return Err(GraphValidationError::new(format!(
                                "migrate stage '{}' must consume the '{namespace}' namespace",
                                stage.name
                            ))
                            .with_nodes(vec![stage.name.clone()])
                            .into());
                        }
                    }
                }
                StageKind::Deploy => {
                    if !stage.requires.contains(IMAGE_REF) {
                        return Err(GraphValidationError::new(format!(
                            "deploy stage '{}' must consume the '{IMAGE_REF}' artifact",
                            stage.name
                        ))
                        .with_nodes(vec![stage.name.clone()])
                        .into());
                    }
                }
                StageKind::Source | StageKind::Build => {}
            }
            available.extend(stage.produces.iter().cloned());
            debug!(stage = %stage.name, "stage wired");
        }

        Ok(WiredPipeline { stages })
    }
}
