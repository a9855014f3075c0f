//! Resource kind and node status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of cloud resource a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// A virtual network (VPC-like).
    Network,
    /// A security group pairing access and target sides.
    SecurityBinding,
    /// A managed relational database instance.
    Database,
    /// A container compute cluster running the application service.
    ComputeCluster,
    /// A load balancer fronting the compute service.
    LoadBalancer,
    /// A DNS record aliasing the load balancer.
    DnsRecord,
    /// A published config store entry.
    ConfigEntry,
    /// A release pipeline stage.
    PipelineStage,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Network => "Network",
            Self::SecurityBinding => "SecurityBinding",
            Self::Database => "Database",
            Self::ComputeCluster => "ComputeCluster",
            Self::LoadBalancer => "LoadBalancer",
            Self::DnsRecord => "DnsRecord",
            Self::ConfigEntry => "ConfigEntry",
            Self::PipelineStage => "PipelineStage",
        };
        write!(f, "{s}")
    }
}

/// The lifecycle status of a resource node.
///
/// `Ready` and `Failed` are terminal for the node itself; `Blocked` is the
/// terminal-unreachable state a node enters when a transitive producer
/// failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NodeStatus {
    /// Declared but not yet constructible.
    #[default]
    Pending,
    /// All input references resolved; construction in flight.
    Constructing,
    /// Construction succeeded; outputs populated and immutable.
    Ready,
    /// The provisioning collaborator reported an error.
    Failed,
    /// A transitive producer failed; this node will never construct.
    Blocked,
}

impl NodeStatus {
    /// Returns true if the node can never transition again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed | Self::Blocked)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Constructing => "Constructing",
            Self::Ready => "Ready",
            Self::Failed => "Failed",
            Self::Blocked => "Blocked",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminality() {
        assert!(!NodeStatus::Pending.is_terminal());
        assert!(!NodeStatus::Constructing.is_terminal());
        assert!(NodeStatus::Ready.is_terminal());
        assert!(NodeStatus::Failed.is_terminal());
        assert!(NodeStatus::Blocked.is_terminal());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ResourceKind::ComputeCluster.to_string(), "ComputeCluster");
        assert_eq!(ResourceKind::DnsRecord.to_string(), "DnsRecord");
    }
}
