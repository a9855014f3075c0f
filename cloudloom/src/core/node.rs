//! The resource node and its construction lifecycle.

use crate::core::{InputValue, NodeStatus, OutputValue, ResourceKind};
use crate::errors::{CloudloomError, PrematureOutputAccessError, UnresolvedDependencyError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A named, typed cloud resource with declared inputs and produced outputs.
///
/// Nodes are created during the declaration phase in `Pending` state. Once
/// every input reference resolves the node may begin construction; on
/// success it reaches `Ready` with a write-once output map. A created
/// resource's identity never changes, so reconstruction of a Ready node is
/// rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNode {
    id: String,
    kind: ResourceKind,
    inputs: BTreeMap<String, InputValue>,
    declared_outputs: BTreeSet<String>,
    outputs: BTreeMap<String, OutputValue>,
    status: NodeStatus,
    error: Option<String>,
    tags: BTreeMap<String, String>,
}

impl ResourceNode {
    /// Declares a new node in `Pending` state.
    #[must_use]
    pub fn declare(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            inputs: BTreeMap::new(),
            declared_outputs: BTreeSet::new(),
            outputs: BTreeMap::new(),
            status: NodeStatus::Pending,
            error: None,
            tags: BTreeMap::new(),
        }
    }

    /// Adds an input parameter.
    #[must_use]
    pub fn with_input(mut self, name: impl Into<String>, value: InputValue) -> Self {
        self.inputs.insert(name.into(), value);
        self
    }

    /// Declares an output key this node will produce once Ready.
    #[must_use]
    pub fn with_output_key(mut self, name: impl Into<String>) -> Self {
        self.declared_outputs.insert(name.into());
        self
    }

    /// Adds a resource tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Returns the node id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the resource kind.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Returns the current lifecycle status.
    #[must_use]
    pub fn status(&self) -> NodeStatus {
        self.status
    }

    /// Returns the input map.
    #[must_use]
    pub fn inputs(&self) -> &BTreeMap<String, InputValue> {
        &self.inputs
    }

    /// Returns the declared output keys.
    #[must_use]
    pub fn declared_outputs(&self) -> &BTreeSet<String> {
        &self.declared_outputs
    }

    /// Returns the resource tags.
    #[must_use]
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Returns the captured construction error, if the node Failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns true if every input holds a concrete value.
    #[must_use]
    pub fn inputs_resolved(&self) -> bool {
        self.inputs.values().all(InputValue::is_resolved)
    }

    /// Returns the `(input, producer, output)` triples still unresolved.
    #[must_use]
    pub fn unresolved_references(&self) -> Vec<(&str, &str, &str)> {
        self.inputs
            .iter()
            .filter_map(|(name, value)| {
                value
                    .as_reference()
                    .map(|(node, output)| (name.as_str(), node, output))
            })
            .collect()
    }

    /// Sets or replaces an input parameter after declaration.
    pub fn set_input(&mut self, name: impl Into<String>, value: InputValue) {
        self.inputs.insert(name.into(), value);
    }

    /// Writes a concrete value into an input, resolving a reference.
    ///
    /// Called by the propagator once the referenced producer is Ready. Also
    /// used for the post-hoc mutation that applies a deferred edge.
    pub fn resolve_input(&mut self, name: impl Into<String>, value: OutputValue) {
        self.inputs.insert(name.into(), InputValue::Literal(value));
    }

    /// Snapshots the fully resolved input map.
    ///
    /// # Errors
    ///
    /// Returns [`UnresolvedDependencyError`] for the first input still
    /// holding an unresolved reference.
    pub fn resolved_inputs(
        &self,
    ) -> Result<BTreeMap<String, OutputValue>, UnresolvedDependencyError> {
        let mut resolved = BTreeMap::new();
        for (name, value) in &self.inputs {
            match value {
                InputValue::Literal(v) => {
                    resolved.insert(name.clone(), v.clone());
                }
                InputValue::Reference { node, output } => {
                    return Err(UnresolvedDependencyError::new(
                        &self.id, name, node, output,
                    ));
                }
            }
        }
        Ok(resolved)
    }

    /// Transitions `Pending` -> `Constructing`.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyConstructed` for a Ready node, an unresolved
    /// dependency error if any input reference is still open, and an
    /// internal error for Failed or Blocked nodes.
    pub fn begin_construction(&mut self) -> Result<(), CloudloomError> {
        match self.status {
            NodeStatus::Pending => {}
            NodeStatus::Ready => {
                return Err(CloudloomError::AlreadyConstructed {
                    node: self.id.clone(),
                });
            }
            other => {
                return Err(CloudloomError::Internal(format!(
                    "node '{}' cannot begin construction while {other}",
                    self.id
                )));
            }
        }
        if let Some((input, producer, output)) = self.unresolved_references().first() {
            return Err(UnresolvedDependencyError::new(&self.id, *input, *producer, *output).into());
        }
        self.status = NodeStatus::Constructing;
        Ok(())
    }

    /// Transitions `Constructing` -> `Ready`, populating outputs write-once.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyConstructed` if the node is already Ready, an
    /// internal error for any other out-of-order transition, and a
    /// provisioning error if the collaborator omitted a declared output key.
    pub fn complete(
        &mut self,
        outputs: BTreeMap<String, OutputValue>,
    ) -> Result<(), CloudloomError> {
        match self.status {
            NodeStatus::Constructing => {}
            NodeStatus::Ready => {
                return Err(CloudloomError::AlreadyConstructed {
                    node: self.id.clone(),
                });
            }
            other => {
                return Err(CloudloomError::Internal(format!(
                    "node '{}' cannot complete while {other}",
                    self.id
                )));
            }
        }
        for key in &self.declared_outputs {
            if !outputs.contains_key(key) {
                let err = crate::errors::ProvisioningError::new(
                    &self.id,
                    format!("provider response missing declared output '{key}'"),
                );
                self.status = NodeStatus::Failed;
                self.error = Some(err.to_string());
                return Err(err.into());
            }
        }
        self.outputs = outputs;
        self.status = NodeStatus::Ready;
        Ok(())
    }

    /// Transitions to `Failed`, capturing the provider-reported cause.
    pub fn fail(&mut self, cause: impl Into<String>) {
        if !self.status.is_terminal() {
            self.status = NodeStatus::Failed;
            self.error = Some(cause.into());
        }
    }

    /// Transitions to `Blocked` because a transitive producer failed.
    ///
    /// Blocked nodes never reach Constructing.
    pub fn block(&mut self) {
        if !self.status.is_terminal() {
            self.status = NodeStatus::Blocked;
        }
    }

    /// Reads a produced output.
    ///
    /// # Errors
    ///
    /// Returns [`PrematureOutputAccessError`] while the node is not Ready,
    /// and an internal error if the key was never produced.
    pub fn output(&self, key: &str) -> Result<&OutputValue, CloudloomError> {
        if self.status != NodeStatus::Ready {
            return Err(PrematureOutputAccessError::new(
                &self.id,
                key,
                self.status.to_string(),
            )
            .into());
        }
        self.outputs.get(key).ok_or_else(|| {
            CloudloomError::Internal(format!(
                "node '{}' has no output '{key}'",
                self.id
            ))
        })
    }

    /// Returns the full output map of a Ready node.
    ///
    /// # Errors
    ///
    /// Returns [`PrematureOutputAccessError`] while the node is not Ready.
    pub fn outputs(&self) -> Result<&BTreeMap<String, OutputValue>, PrematureOutputAccessError> {
        if self.status != NodeStatus::Ready {
            return Err(PrematureOutputAccessError::new(
                &self.id,
                "*",
                self.status.to_string(),
            ));
        }
        Ok(&self.outputs)
    }
}
