//! The production deployment declaration.
//!
//! Declares the standard graph: a network, the database security groups,
//! the managed database, the compute service, a load balancer and the
//! public DNS record, plus the four-stage release pipeline over it.

use crate::config::{DeploymentConfig, DEFAULT_DATABASE_PORT};
use crate::core::{InputValue, ResourceKind, ResourceNode};
use crate::errors::CloudloomError;
use crate::graph::DependencyGraph;
use crate::release::{
    PipelineStage, StageKind, IMAGE_REF, REVISION, SERVICE_REF, SOURCE_ARTIFACT,
};
use crate::security::{SecurityBindingResolver, GROUP_ID_OUTPUT};

/// The network node id.
pub const NETWORK: &str = "network";
/// The database security group node id.
pub const DATABASE_SG: &str = "database-sg";
/// The database access security group node id.
pub const DATABASE_ACCESS_SG: &str = "database-access-sg";
/// The managed database node id.
pub const DATABASE: &str = "database";
/// The compute service node id.
pub const COMPUTE: &str = "compute";
/// The load balancer node id.
pub const LOAD_BALANCER: &str = "load-balancer";
/// The public DNS record node id.
pub const DNS: &str = "dns";

/// The network's identifier output.
pub const OUT_VPC_ID: &str = "vpc_id";
/// The database hostname output.
pub const OUT_HOSTNAME: &str = "hostname";
/// The database socket address output.
pub const OUT_SOCKET_ADDRESS: &str = "socket_address";
/// The compute service reference output.
pub const OUT_SERVICE_ARN: &str = "service_arn";
/// The compute service's own security group output.
pub const OUT_SECURITY_GROUP_ID: &str = "security_group_id";
/// The load balancer's DNS name output.
pub const OUT_DNS_NAME: &str = "dns_name";
/// The group identity output of security group nodes.
pub const OUT_GROUP_ID: &str = GROUP_ID_OUTPUT;

fn tagged(node: ResourceNode, config: &DeploymentConfig) -> ResourceNode {
    node.with_tag("owner", &config.owner)
        .with_tag("environment", &config.environment)
}

/// Declares the production graph and its security bindings.
///
/// The access-group-to-database binding is a plain edge. The
/// compute-to-database binding closes a cycle through the service's own
/// construction and is routed through a deferred edge, authorized after the
/// service is Ready.
///
/// # Errors
///
/// Returns a validation error only on an inconsistent declaration, which
/// the fixed layout here does not produce.
pub fn production_graph(
    config: &DeploymentConfig,
) -> Result<(DependencyGraph, SecurityBindingResolver), CloudloomError> {
    let mut graph = DependencyGraph::new();

    graph.add_node(tagged(
        ResourceNode::declare(NETWORK, ResourceKind::Network)
            .with_input("region", InputValue::literal(&config.region))
            .with_output_key(OUT_VPC_ID),
        config,
    ))?;
    graph.add_node(tagged(
        ResourceNode::declare(DATABASE_SG, ResourceKind::SecurityBinding)
            .with_output_key(OUT_GROUP_ID),
        config,
    ))?;
    graph.add_node(tagged(
        ResourceNode::declare(DATABASE_ACCESS_SG, ResourceKind::SecurityBinding)
            .with_output_key(OUT_GROUP_ID),
        config,
    ))?;
    graph.add_node(tagged(
        ResourceNode::declare(DATABASE, ResourceKind::Database)
            .with_input("engine", InputValue::literal("postgres"))
            .with_input("database", InputValue::literal(&config.database_name))
            .with_input("username", InputValue::literal(&config.database_user))
            .with_input("password", InputValue::literal(&config.database_password))
            .with_output_key(OUT_HOSTNAME)
            .with_output_key(OUT_SOCKET_ADDRESS),
        config,
    ))?;
    graph.add_node(tagged(
        ResourceNode::declare(COMPUTE, ResourceKind::ComputeCluster)
            .with_input("image", InputValue::literal(&config.image_repository))
            .with_output_key(OUT_SERVICE_ARN)
            .with_output_key(OUT_SECURITY_GROUP_ID),
        config,
    ))?;
    graph.add_node(tagged(
        ResourceNode::declare(LOAD_BALANCER, ResourceKind::LoadBalancer)
            .with_output_key(OUT_DNS_NAME),
        config,
    ))?;
    graph.add_node(tagged(
        ResourceNode::declare(DNS, ResourceKind::DnsRecord)
            .with_input("domain", InputValue::literal(&config.domain_name))
            .with_output_key("fqdn"),
        config,
    ))?;

    graph.add_edge(NETWORK, DATABASE_SG, OUT_VPC_ID, "vpc_id")?;
    graph.add_edge(NETWORK, DATABASE_ACCESS_SG, OUT_VPC_ID, "vpc_id")?;
    graph.add_edge(NETWORK, DATABASE, OUT_VPC_ID, "vpc_id")?;
    graph.add_edge(DATABASE_SG, DATABASE, OUT_GROUP_ID, "security_group")?;
    graph.add_edge(NETWORK, COMPUTE, OUT_VPC_ID, "vpc_id")?;
    graph.add_edge(DATABASE_ACCESS_SG, COMPUTE, OUT_GROUP_ID, "access_group")?;
    graph.add_edge(DATABASE, COMPUTE, OUT_HOSTNAME, "db_host")?;
    graph.add_edge(NETWORK, LOAD_BALANCER, OUT_VPC_ID, "vpc_id")?;
    graph.add_edge(COMPUTE, LOAD_BALANCER, OUT_SERVICE_ARN, "service")?;
    graph.add_edge(LOAD_BALANCER, DNS, OUT_DNS_NAME, "alias_target")?;

    let mut resolver = SecurityBindingResolver::new();
    resolver.bind(
        &mut graph,
        DATABASE_ACCESS_SG,
        GROUP_ID_OUTPUT,
        DATABASE_SG,
        DEFAULT_DATABASE_PORT,
    )?;
    resolver.bind(
        &mut graph,
        COMPUTE,
        OUT_SECURITY_GROUP_ID,
        DATABASE_SG,
        DEFAULT_DATABASE_PORT,
    )?;

    Ok((graph, resolver))
}

/// Returns the standard four-stage release pipeline for a deployment.
///
/// The migrate stage consumes the published database namespace; the deploy
/// stage consumes the built image and the running service reference.
#[must_use]
pub fn release_stages(config: &DeploymentConfig) -> Vec<PipelineStage> {
    let namespace = config.database_namespace();
    vec![
        PipelineStage::new("source", StageKind::Source)
            .with_requirement(REVISION)
            .with_product(SOURCE_ARTIFACT),
        PipelineStage::new("build", StageKind::Build)
            .with_requirement(SOURCE_ARTIFACT)
            .with_product(IMAGE_REF),
        PipelineStage::new("migrate", StageKind::Migrate)
            .with_requirement(&namespace)
            .with_requirement(SOURCE_ARTIFACT)
            .with_product("schema_migrated"),
        PipelineStage::new("deploy", StageKind::Deploy)
            .with_requirement(IMAGE_REF)
            .with_requirement(SERVICE_REF)
            .with_requirement("schema_migrated"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> DeploymentConfig {
        DeploymentConfig {
            environment: "production".to_string(),
            region: "eu-central-1".to_string(),
            account: "123456789012".to_string(),
            owner: "platform-team".to_string(),
            image_repository: "registry.internal/backend".to_string(),
            database_user: "app_database_user".to_string(),
            database_password: "s3cret".to_string(),
            database_name: "app_database".to_string(),
            domain_name: "api.example.com".to_string(),
        }
    }

    #[test]
    fn test_production_graph_orders_deterministically() {
        let (graph, _) = production_graph(&config()).unwrap();
        let order = graph.topological_order().unwrap();
        assert_eq!(
            order,
            // The ingress binding makes the database group wait for the
            // access group's identity.
            vec![
                NETWORK,
                DATABASE_ACCESS_SG,
                DATABASE_SG,
                DATABASE,
                COMPUTE,
                LOAD_BALANCER,
                DNS
            ]
        );
    }

    #[test]
    fn test_compute_binding_is_deferred() {
        let (graph, resolver) = production_graph(&config()).unwrap();
        let deferred = resolver.deferred_bindings();
        assert_eq!(deferred.len(), 1);
        assert_eq!(deferred[0].access_node, COMPUTE);
        assert_eq!(deferred[0].target_node, DATABASE_SG);
        assert_eq!(graph.deferred_edges().count(), 1);
    }

    #[test]
    fn test_every_node_carries_owner_tag() {
        let (graph, _) = production_graph(&config()).unwrap();
        for node in graph.nodes() {
            assert_eq!(node.tags().get("owner").map(String::as_str), Some("platform-team"));
        }
    }

    #[test]
    fn test_release_stages_wire_in_order() {
        let stages = release_stages(&config());
        assert_eq!(stages.len(), 4);
        assert!(stages.windows(2).all(|w| w[0].kind.position() < w[1].kind.position()));
        assert!(stages[2].requires.contains("production/database"));
    }
}
