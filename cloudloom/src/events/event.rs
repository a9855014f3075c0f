//! Orchestration event model.

use serde::{Deserialize, Serialize};

/// A structured event emitted during an orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrchestrationEvent {
    /// A node's inputs resolved and construction was issued.
    NodeConstructing {
        /// The node id.
        node: String,
    },
    /// A node reached Ready.
    NodeReady {
        /// The node id.
        node: String,
        /// Construction duration in milliseconds.
        duration_ms: f64,
    },
    /// The provisioning collaborator failed a node.
    NodeFailed {
        /// The node id.
        node: String,
        /// The provider-reported cause.
        cause: String,
    },
    /// A node was blocked by a transitive producer failure.
    NodeBlocked {
        /// The blocked node id.
        node: String,
        /// The failed producer at the root of the blockage.
        failed_producer: String,
    },
    /// A deferred edge's value was applied post-hoc.
    DeferredApplied {
        /// The producer node id.
        producer: String,
        /// The consumer node id.
        consumer: String,
    },
    /// An ingress rule was authorized.
    BindingApplied {
        /// The security group granted access.
        access_group: String,
        /// The security group receiving the ingress rule.
        target_group: String,
        /// The authorized port.
        port: u16,
    },
    /// A config namespace was published.
    ConfigPublished {
        /// The namespace prefix.
        namespace: String,
        /// The number of entries written.
        entries: usize,
    },
    /// A pipeline stage was validated and parameterized.
    StageWired {
        /// The stage name.
        stage: String,
    },
    /// The run was aborted.
    RunAborted {
        /// The abort reason.
        reason: String,
    },
}

impl OrchestrationEvent {
    /// Returns the dotted event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NodeConstructing { .. } => "node.constructing",
            Self::NodeReady { .. } => "node.ready",
            Self::NodeFailed { .. } => "node.failed",
            Self::NodeBlocked { .. } => "node.blocked",
            Self::DeferredApplied { .. } => "edge.deferred_applied",
            Self::BindingApplied { .. } => "binding.applied",
            Self::ConfigPublished { .. } => "config.published",
            Self::StageWired { .. } => "stage.wired",
            Self::RunAborted { .. } => "run.aborted",
        }
    }

    /// Returns the event payload as JSON.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
