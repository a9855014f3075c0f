//! The outcome of an orchestration execution pass.

use crate::core::NodeStatus;
use crate::errors::ProvisioningError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A deferred edge applied after both endpoints reached Ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredApplication {
    /// The producer node id.
    pub producer: String,
    /// The consumer node id.
    pub consumer: String,
    /// The consumer input the value landed in.
    pub input_key: String,
}

/// The report of one execution pass over a declared graph.
///
/// The report carries the full blocked subtree, not just the first failure,
/// so an operator can see downstream impact in one pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// When execution started.
    pub started_at: DateTime<Utc>,
    /// When execution finished.
    pub finished_at: DateTime<Utc>,
    /// Node ids in the order they reached Ready.
    pub construction_order: Vec<String>,
    /// Terminal status per node.
    pub statuses: BTreeMap<String, NodeStatus>,
    /// Provider failures, with node id and cause.
    pub failures: Vec<ProvisioningError>,
    /// Nodes blocked by a transitive producer failure.
    pub blocked: Vec<String>,
    /// Deferred edges applied in the second pass.
    pub deferred_applied: Vec<DeferredApplication>,
    /// Whether the run was aborted before completing.
    pub aborted: bool,
    /// The abort reason, if aborted.
    pub abort_reason: Option<String>,
}

impl ExecutionReport {
    /// Returns true if every node reached Ready and the run was not aborted.
    #[must_use]
    pub fn success(&self) -> bool {
        !self.aborted
            && self
                .statuses
                .values()
                .all(|status| *status == NodeStatus::Ready)
    }

    /// Returns the ids of nodes with the given status.
    #[must_use]
    pub fn nodes_with_status(&self, status: NodeStatus) -> Vec<&str> {
        self.statuses
            .iter()
            .filter(|(_, s)| **s == status)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}
