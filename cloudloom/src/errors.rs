//! Error types for the cloudloom orchestration engine.
//!
//! Declaration-time errors (validation, cycles) are raised before any
//! provisioning side effect occurs. Construction-time errors abort only the
//! affected subtree of the graph.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for cloudloom operations.
#[derive(Debug, Error)]
pub enum CloudloomError {
    /// A graph declaration failed validation.
    #[error("{0}")]
    Validation(#[from] GraphValidationError),

    /// An input reference never resolved.
    #[error("{0}")]
    UnresolvedDependency(#[from] UnresolvedDependencyError),

    /// A non-deferred cycle was declared.
    #[error("{0}")]
    Cycle(#[from] CycleError),

    /// The provisioning collaborator failed during construction.
    #[error("{0}")]
    Provisioning(#[from] ProvisioningError),

    /// A node's output was read before the node reached Ready.
    #[error("{0}")]
    PrematureOutputAccess(#[from] PrematureOutputAccessError),

    /// A pipeline stage declared an input no earlier stage produces.
    #[error("{0}")]
    MissingStageInput(#[from] MissingStageInputError),

    /// A Ready node was asked to construct again.
    #[error("node '{node}' already constructed")]
    AlreadyConstructed {
        /// The node id.
        node: String,
    },

    /// The config store collaborator failed.
    #[error("config store error: {0}")]
    ConfigStore(String),

    /// The orchestration run was aborted.
    #[error("orchestration aborted: {0}")]
    Aborted(String),

    /// A generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error raised when a graph declaration is invalid.
///
/// Covers duplicate node ids, references to unknown nodes, and references
/// to output keys a producer never declared.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GraphValidationError {
    /// The error message.
    pub message: String,
    /// The node ids involved in the error.
    pub nodes: Vec<String>,
}

impl GraphValidationError {
    /// Creates a new graph validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            nodes: Vec::new(),
        }
    }

    /// Sets the nodes involved.
    #[must_use]
    pub fn with_nodes(mut self, nodes: Vec<String>) -> Self {
        self.nodes = nodes;
        self
    }
}

/// Error raised when a node's input reference never resolves.
///
/// Fatal to the node and its transitive dependents; reported, not retried.
#[derive(Debug, Clone, Error)]
#[error(
    "unresolved dependency: node '{node}' input '{input}' references '{producer}.{output}' which is not available"
)]
pub struct UnresolvedDependencyError {
    /// The consumer node.
    pub node: String,
    /// The consumer input name.
    pub input: String,
    /// The producer node the input references.
    pub producer: String,
    /// The producer output key the input references.
    pub output: String,
}

impl UnresolvedDependencyError {
    /// Creates a new unresolved dependency error.
    #[must_use]
    pub fn new(
        node: impl Into<String>,
        input: impl Into<String>,
        producer: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            node: node.into(),
            input: input.into(),
            producer: producer.into(),
            output: output.into(),
        }
    }
}

/// Error raised when the non-deferred edge set contains a cycle.
///
/// Raised at declaration time, before any construction begins. Deferred
/// edges are excluded from the acyclicity check.
#[derive(Debug, Clone, Error)]
#[error("cycle detected: {}", cycle_path.join(" -> "))]
pub struct CycleError {
    /// The node ids forming the cycle, first repeated at the end.
    pub cycle_path: Vec<String>,
}

impl CycleError {
    /// Creates a new cycle error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        Self { cycle_path }
    }
}

/// Error raised when the provisioning collaborator fails to create a resource.
///
/// The node becomes Failed and every transitive consumer becomes Blocked.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("provisioning failed for node '{node}': {cause}")]
pub struct ProvisioningError {
    /// The failing node id.
    pub node: String,
    /// The provider-reported cause.
    pub cause: String,
}

impl ProvisioningError {
    /// Creates a new provisioning error.
    #[must_use]
    pub fn new(node: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            cause: cause.into(),
        }
    }
}

/// Error raised when a consumer reads a node's output before Ready.
///
/// This is a programming-level invariant violation, never silently
/// defaulted.
#[derive(Debug, Clone, Error)]
#[error("premature output access: '{node}.{output}' read while node is {status}")]
pub struct PrematureOutputAccessError {
    /// The producer node id.
    pub node: String,
    /// The output key that was read.
    pub output: String,
    /// The node's status at the time of the read.
    pub status: String,
}

impl PrematureOutputAccessError {
    /// Creates a new premature output access error.
    #[must_use]
    pub fn new(
        node: impl Into<String>,
        output: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            node: node.into(),
            output: output.into(),
            status: status.into(),
        }
    }
}

/// Error raised when pipeline wiring validation fails.
///
/// Raised before any stage executes.
#[derive(Debug, Clone, Error)]
#[error("missing stage input: stage '{stage}' requires '{input}' which no earlier stage produces")]
pub struct MissingStageInputError {
    /// The stage whose requirement is unsatisfied.
    pub stage: String,
    /// The missing input name.
    pub input: String,
}

impl MissingStageInputError {
    /// Creates a new missing stage input error.
    #[must_use]
    pub fn new(stage: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            input: input.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_formats_path() {
        let err = CycleError::new(vec![
            "database".to_string(),
            "compute".to_string(),
            "database".to_string(),
        ]);
        assert!(err.to_string().contains("database -> compute -> database"));
    }

    #[test]
    fn test_validation_error_with_nodes() {
        let err = GraphValidationError::new("duplicate node id")
            .with_nodes(vec!["network".to_string()]);
        assert_eq!(err.nodes, vec!["network".to_string()]);
    }

    #[test]
    fn test_premature_output_access_message() {
        let err = PrematureOutputAccessError::new("database", "hostname", "Constructing");
        assert!(err.to_string().contains("database.hostname"));
        assert!(err.to_string().contains("Constructing"));
    }

    #[test]
    fn test_error_conversion_into_top_level() {
        let err: CloudloomError = ProvisioningError::new("database", "quota exceeded").into();
        assert!(matches!(err, CloudloomError::Provisioning(_)));
    }
}
