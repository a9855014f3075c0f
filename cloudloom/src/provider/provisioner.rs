//! Provisioner trait and request/authorization types.

use crate::core::{OutputValue, ResourceKind};
use crate::errors::ProvisioningError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A resource-creation request handed to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    /// The node id, used as the resource name.
    pub id: String,
    /// The resource kind.
    pub kind: ResourceKind,
    /// Fully resolved input parameters.
    pub inputs: BTreeMap<String, OutputValue>,
    /// Output keys the engine expects back.
    pub declared_outputs: BTreeSet<String>,
    /// Resource tags.
    pub tags: BTreeMap<String, String>,
}

/// A concrete ingress authorization, issued post-hoc for deferred bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressAuthorization {
    /// The security group granted access.
    pub source_group_id: String,
    /// The security group receiving the rule.
    pub target_group_id: String,
    /// The authorized port.
    pub port: u16,
}

/// The cloud resource API, treated as an opaque async collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Creates a resource and returns its outputs.
    ///
    /// # Errors
    ///
    /// Returns a [`ProvisioningError`] on any provider failure; the engine
    /// marks the node Failed and blocks its transitive consumers.
    async fn create(
        &self,
        request: &ResourceRequest,
    ) -> Result<BTreeMap<String, OutputValue>, ProvisioningError>;

    /// Authorizes an ingress rule on an already-created security group.
    ///
    /// This is the mutation call backing deferred security bindings.
    ///
    /// # Errors
    ///
    /// Returns a [`ProvisioningError`] if the provider rejects the rule.
    async fn authorize_ingress(
        &self,
        authorization: &IngressAuthorization,
    ) -> Result<(), ProvisioningError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{NodeStatus, ResourceNode};
    use crate::executor::OutputPropagator;
    use crate::graph::DependencyGraph;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_mocked_provider_receives_resolved_inputs() {
        let mut graph = DependencyGraph::new();
        graph
            .add_node(
                ResourceNode::declare("network", ResourceKind::Network).with_output_key("vpc_id"),
            )
            .unwrap();
        graph
            .add_node(ResourceNode::declare("database", ResourceKind::Database))
            .unwrap();
        graph.add_edge("network", "database", "vpc_id", "vpc_id").unwrap();

        let mut mock = MockProvisioner::new();
        mock.expect_create()
            .withf(|r: &ResourceRequest| r.id == "network")
            .return_once(|_| {
                Ok(BTreeMap::from([(
                    "vpc_id".to_string(),
                    serde_json::json!("vpc-123"),
                )]))
            });
        mock.expect_create()
            .withf(|r: &ResourceRequest| {
                r.id == "database" && r.inputs["vpc_id"] == serde_json::json!("vpc-123")
            })
            .return_once(|_| Ok(BTreeMap::new()));

        let report = OutputPropagator::new(Arc::new(mock))
            .execute(&mut graph)
            .await
            .unwrap();
        assert_eq!(report.statuses["database"], NodeStatus::Ready);
    }
}
