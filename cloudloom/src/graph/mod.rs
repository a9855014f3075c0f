//! The dependency graph: nodes, directed edges, and construction ordering.

mod edge;
#[allow(clippy::module_inception)]
mod graph;
#[cfg(test)]
mod graph_tests;

pub use edge::Edge;
pub use graph::DependencyGraph;
