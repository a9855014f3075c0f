//! Tests for graph declaration and ordering.

use crate::core::{ResourceKind, ResourceNode};
use crate::graph::DependencyGraph;
use pretty_assertions::assert_eq;

fn node(id: &str, kind: ResourceKind, outputs: &[&str]) -> ResourceNode {
    let mut n = ResourceNode::declare(id, kind);
    for o in outputs {
        n = n.with_output_key(*o);
    }
    n
}

fn production_shape() -> DependencyGraph {
    let mut g = DependencyGraph::new();
    g.add_node(node("network", ResourceKind::Network, &["vpc_id"])).unwrap();
    g.add_node(node("database-sg", ResourceKind::SecurityBinding, &["group_id"])).unwrap();
    g.add_node(node("database", ResourceKind::Database, &["hostname", "port"])).unwrap();
    g.add_node(node("compute", ResourceKind::ComputeCluster, &["service_arn", "security_group_id"])).unwrap();
    g.add_edge("network", "database-sg", "vpc_id", "vpc_id").unwrap();
    g.add_edge("network", "database", "vpc_id", "vpc_id").unwrap();
    g.add_edge("database-sg", "database", "group_id", "security_group").unwrap();
    g.add_edge("network", "compute", "vpc_id", "vpc_id").unwrap();
    g.add_edge("database", "compute", "hostname", "db_host").unwrap();
    g
}

#[test]
fn test_duplicate_node_rejected() {
    let mut g = DependencyGraph::new();
    g.add_node(node("network", ResourceKind::Network, &[])).unwrap();
    let err = g.add_node(node("network", ResourceKind::Network, &[])).unwrap_err();
    assert!(err.to_string().contains("duplicate"));
}

#[test]
fn test_edge_validation() {
    let mut g = DependencyGraph::new();
    g.add_node(node("network", ResourceKind::Network, &["vpc_id"])).unwrap();
    g.add_node(node("database", ResourceKind::Database, &[])).unwrap();

    assert!(g.add_edge("missing", "database", "vpc_id", "vpc_id").is_err());
    assert!(g.add_edge("network", "missing", "vpc_id", "vpc_id").is_err());
    assert!(g.add_edge("network", "network", "vpc_id", "vpc_id").is_err());
    // Undeclared output key.
    assert!(g.add_edge("network", "database", "subnet_ids", "subnets").is_err());
    assert!(g.add_edge("network", "database", "vpc_id", "vpc_id").is_ok());
}

#[test]
fn test_topological_order_honors_edges() {
    let g = production_shape();
    let order = g.topological_order().unwrap();
    assert_eq!(order, vec!["network", "database-sg", "database", "compute"]);
}

#[test]
fn test_topological_order_is_deterministic() {
    let g = production_shape();
    let first = g.topological_order().unwrap();
    for _ in 0..10 {
        assert_eq!(g.topological_order().unwrap(), first);
    }
}

#[test]
fn test_declaration_order_breaks_ties() {
    // Two independent roots: declaration order decides.
    let mut g = DependencyGraph::new();
    g.add_node(node("zeta", ResourceKind::Network, &["vpc_id"])).unwrap();
    g.add_node(node("alpha", ResourceKind::Network, &["vpc_id"])).unwrap();
    let order = g.topological_order().unwrap();
    assert_eq!(order, vec!["zeta", "alpha"]);
}

#[test]
fn test_cycle_detected() {
    let mut g = DependencyGraph::new();
    g.add_node(node("compute", ResourceKind::ComputeCluster, &["security_group_id"])).unwrap();
    g.add_node(node("database-sg", ResourceKind::SecurityBinding, &["group_id"])).unwrap();
    g.add_edge("compute", "database-sg", "security_group_id", "ingress").unwrap();
    g.add_edge("database-sg", "compute", "group_id", "security_group").unwrap();

    let err = g.topological_order().unwrap_err();
    assert_eq!(err.cycle_path.first(), err.cycle_path.last());
    assert!(err.cycle_path.len() >= 3);
}

#[test]
fn test_deferred_edge_excluded_from_acyclicity() {
    let mut g = DependencyGraph::new();
    g.add_node(node("compute", ResourceKind::ComputeCluster, &["security_group_id"])).unwrap();
    g.add_node(node("database-sg", ResourceKind::SecurityBinding, &["group_id"])).unwrap();
    g.add_edge("database-sg", "compute", "group_id", "security_group").unwrap();
    // The back-edge is deferred, so ordering still succeeds.
    g.add_deferred_edge("compute", "database-sg", "security_group_id", "ingress_compute").unwrap();

    let order = g.topological_order().unwrap();
    assert_eq!(order, vec!["database-sg", "compute"]);
    assert_eq!(g.deferred_edges().count(), 1);
}

#[test]
fn test_deferred_edge_leaves_consumer_constructible() {
    let mut g = DependencyGraph::new();
    g.add_node(node("compute", ResourceKind::ComputeCluster, &["security_group_id"])).unwrap();
    g.add_node(node("database-sg", ResourceKind::SecurityBinding, &["group_id"])).unwrap();
    g.add_deferred_edge("compute", "database-sg", "security_group_id", "ingress_compute").unwrap();

    // No unresolved reference lands on the consumer.
    assert!(g.node("database-sg").unwrap().inputs_resolved());
}

#[test]
fn test_validate_rejects_unknown_reference() {
    let mut g = DependencyGraph::new();
    let dangling = node("database", ResourceKind::Database, &[]).with_input(
        "vpc_id",
        crate::core::InputValue::reference("network", "vpc_id"),
    );
    g.add_node(dangling).unwrap();
    let err = g.validate().unwrap_err();
    assert!(err.to_string().contains("unknown node 'network'"));
}

#[test]
fn test_validate_rejects_unfed_reference() {
    let mut g = DependencyGraph::new();
    g.add_node(node("network", ResourceKind::Network, &["vpc_id"])).unwrap();
    let dangling = node("database", ResourceKind::Database, &[]).with_input(
        "vpc_id",
        crate::core::InputValue::reference("network", "vpc_id"),
    );
    g.add_node(dangling).unwrap();
    let err = g.validate().unwrap_err();
    assert!(err.to_string().contains("no edge feeds it"));
}

#[test]
fn test_depends_on_and_would_cycle() {
    let g = production_shape();
    assert!(g.depends_on("compute", "network"));
    assert!(g.depends_on("compute", "database-sg"));
    assert!(!g.depends_on("network", "compute"));
    // compute -> database-sg would close a cycle through database.
    assert!(g.would_cycle("compute", "database-sg"));
    // The reverse of an existing edge also cycles: database-sg already
    // depends on network.
    assert!(g.would_cycle("database-sg", "network"));
    // network feeds database-sg, not the other way around.
    assert!(!g.would_cycle("network", "database-sg"));
}

#[test]
fn test_transitive_consumers() {
    let g = production_shape();
    assert_eq!(
        g.transitive_consumers("database-sg"),
        vec!["database", "compute"]
    );
    assert_eq!(
        g.transitive_consumers("network"),
        vec!["database-sg", "database", "compute"]
    );
    assert!(g.transitive_consumers("compute").is_empty());
}
