//! The security binding resolver.

use crate::errors::CloudloomError;
use crate::events::{EventSink, OrchestrationEvent};
use crate::graph::DependencyGraph;
use crate::provider::{IngressAuthorization, Provisioner};
use serde::{Deserialize, Serialize};

/// The output key security-group-bearing nodes expose their identity under.
pub const GROUP_ID_OUTPUT: &str = "group_id";

/// A declared ingress relationship between two nodes' security groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityBinding {
    /// The node whose group needs access.
    pub access_node: String,
    /// The output key carrying the access node's group identity.
    pub access_output: String,
    /// The node whose group provides access.
    pub target_node: String,
    /// The authorized port.
    pub port: u16,
    /// Whether the binding was routed through a deferred edge.
    pub deferred: bool,
}

impl SecurityBinding {
    /// The consumer input the access group's identity lands in.
    #[must_use]
    pub fn input_key(&self) -> String {
        format!("ingress_{}", self.access_node)
    }
}

/// Resolves security bindings into graph edges.
///
/// A binding is normally a plain edge: the target group's node consumes the
/// access group's identity and the rule is declared at creation time. When
/// the access node itself transitively depends on the target (the
/// compute-service-to-database class), pre-declaring the edge would close a
/// cycle through the service's own construction; the binding is instead
/// routed through a deferred edge and authorized post-hoc with the
/// service's now-known security identity.
#[derive(Debug, Default)]
pub struct SecurityBindingResolver {
    bindings: Vec<SecurityBinding>,
}

impl SecurityBindingResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an ingress binding from `access_node` to `target_node` on
    /// `port`, routing through a deferred edge when a pre-declared edge
    /// would close a cycle.
    ///
    /// Returns true if the binding was deferred.
    ///
    /// # Errors
    ///
    /// Returns a validation error if either node is unknown or the access
    /// node never declares `access_output`.
    pub fn bind(
        &mut self,
        graph: &mut DependencyGraph,
        access_node: &str,
        access_output: &str,
        target_node: &str,
        port: u16,
    ) -> Result<bool, CloudloomError> {
        let binding = SecurityBinding {
            access_node: access_node.to_string(),
            access_output: access_output.to_string(),
            target_node: target_node.to_string(),
            port,
            deferred: graph.would_cycle(access_node, target_node),
        };
        let input_key = binding.input_key();
        if binding.deferred {
            graph.add_deferred_edge(access_node, target_node, access_output, &input_key)?;
        } else {
            graph.add_edge(access_node, target_node, access_output, &input_key)?;
        }
        let deferred = binding.deferred;
        self.bindings.push(binding);
        Ok(deferred)
    }

    /// Returns every declared binding.
    #[must_use]
    pub fn bindings(&self) -> &[SecurityBinding] {
        &self.bindings
    }

    /// Returns the bindings routed through deferred edges.
    #[must_use]
    pub fn deferred_bindings(&self) -> Vec<&SecurityBinding> {
        self.bindings.iter().filter(|b| b.deferred).collect()
    }

    /// Authorizes every deferred binding whose endpoints are Ready, using
    /// the access node's now-known security identity.
    ///
    /// # Errors
    ///
    /// Returns premature-access errors if an endpoint is read before Ready
    /// and provisioning errors if the provider rejects a rule.
    pub async fn apply_deferred(
        &self,
        graph: &DependencyGraph,
        provisioner: &dyn Provisioner,
        sink: &dyn EventSink,
    ) -> Result<Vec<IngressAuthorization>, CloudloomError> {
        let mut applied = Vec::new();
        for binding in self.deferred_bindings() {
            let ready = |id: &str| {
                graph
                    .node(id)
                    .is_some_and(|n| n.status() == crate::core::NodeStatus::Ready)
            };
            if !(ready(&binding.access_node) && ready(&binding.target_node)) {
                continue;
            }
            let source_group_id = Self::group_id(graph, &binding.access_node, &binding.access_output)?;
            let target_group_id = Self::group_id(graph, &binding.target_node, GROUP_ID_OUTPUT)?;
            let authorization = IngressAuthorization {
                source_group_id,
                target_group_id,
                port: binding.port,
            };
            provisioner.authorize_ingress(&authorization).await?;
            sink.try_emit(&OrchestrationEvent::BindingApplied {
                access_group: authorization.source_group_id.clone(),
                target_group: authorization.target_group_id.clone(),
                port: authorization.port,
            });
            applied.push(authorization);
        }
        Ok(applied)
    }

    fn group_id(
        graph: &DependencyGraph,
        node: &str,
        output: &str,
    ) -> Result<String, CloudloomError> {
        let value = graph
            .node(node)
            .ok_or_else(|| CloudloomError::Internal(format!("unknown node '{node}'")))?
            .output(output)?;
        value.as_str().map(String::from).ok_or_else(|| {
            CloudloomError::Internal(format!("output '{node}.{output}' is not a string"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ResourceKind, ResourceNode};
    use crate::events::NoOpEventSink;
    use crate::executor::OutputPropagator;
    use crate::provider::ScriptedProvisioner;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn graph() -> DependencyGraph {
        let mut g = DependencyGraph::new();
        g.add_node(
            ResourceNode::declare("database-sg", ResourceKind::SecurityBinding)
                .with_output_key(GROUP_ID_OUTPUT),
        )
        .unwrap();
        g.add_node(
            ResourceNode::declare("database-access-sg", ResourceKind::SecurityBinding)
                .with_output_key(GROUP_ID_OUTPUT),
        )
        .unwrap();
        g.add_node(
            ResourceNode::declare("database", ResourceKind::Database)
                .with_output_key("hostname"),
        )
        .unwrap();
        g.add_node(
            ResourceNode::declare("compute", ResourceKind::ComputeCluster)
                .with_output_key("security_group_id"),
        )
        .unwrap();
        g.add_edge("database-sg", "database", GROUP_ID_OUTPUT, "security_group").unwrap();
        g.add_edge("database", "compute", "hostname", "db_host").unwrap();
        g
    }

    #[test]
    fn test_plain_binding_adds_ordering_edge() {
        let mut g = graph();
        let mut resolver = SecurityBindingResolver::new();
        let deferred = resolver
            .bind(&mut g, "database-access-sg", GROUP_ID_OUTPUT, "database-sg", 5432)
            .unwrap();

        assert!(!deferred);
        assert_eq!(g.deferred_edges().count(), 0);
        // The target now depends on the access group.
        assert!(g.depends_on("database-sg", "database-access-sg"));
    }

    #[test]
    fn test_cycle_class_routed_through_deferred_edge() {
        let mut g = graph();
        let mut resolver = SecurityBindingResolver::new();
        // compute depends on database depends on database-sg: pre-declaring
        // compute -> database-sg would close a cycle.
        let deferred = resolver
            .bind(&mut g, "compute", "security_group_id", "database-sg", 5432)
            .unwrap();

        assert!(deferred);
        assert_eq!(g.deferred_edges().count(), 1);
        assert_eq!(resolver.deferred_bindings().len(), 1);
        // Ordering still succeeds.
        g.topological_order().unwrap();
    }

    #[tokio::test]
    async fn test_apply_deferred_authorizes_with_known_identity() {
        let mut g = graph();
        let mut resolver = SecurityBindingResolver::new();
        resolver
            .bind(&mut g, "compute", "security_group_id", "database-sg", 5432)
            .unwrap();

        let provisioner = Arc::new(ScriptedProvisioner::new());
        OutputPropagator::new(provisioner.clone())
            .execute(&mut g)
            .await
            .unwrap();

        let applied = resolver
            .apply_deferred(&g, provisioner.as_ref(), &NoOpEventSink)
            .await
            .unwrap();

        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].source_group_id, "compute-security_group_id");
        assert_eq!(applied[0].target_group_id, "database-sg-group_id");
        assert_eq!(applied[0].port, 5432);
        assert_eq!(provisioner.authorizations(), applied);
    }

    #[tokio::test]
    async fn test_apply_deferred_skips_unready_endpoints() {
        let mut g = graph();
        let mut resolver = SecurityBindingResolver::new();
        resolver
            .bind(&mut g, "compute", "security_group_id", "database-sg", 5432)
            .unwrap();

        let provisioner = Arc::new(ScriptedProvisioner::new().fail_on("database", "quota"));
        OutputPropagator::new(provisioner.clone())
            .execute(&mut g)
            .await
            .unwrap();

        let applied = resolver
            .apply_deferred(&g, provisioner.as_ref(), &NoOpEventSink)
            .await
            .unwrap();
        assert!(applied.is_empty());
        assert!(provisioner.authorizations().is_empty());
    }
}
