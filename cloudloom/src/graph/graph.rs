//! Graph declaration and construction ordering.

use crate::core::{InputValue, ResourceNode};
use crate::errors::{CycleError, GraphValidationError};
use crate::graph::Edge;
use std::collections::{BTreeSet, HashMap, HashSet};

/// The declared set of resource nodes and directed edges between them.
///
/// The graph is mutated only during the declaration phase. After
/// declaration it is read-only except for the status/outputs fields of
/// individual nodes, written exactly once by their own construction.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Nodes in declaration order; the order is the topological tie-break.
    nodes: Vec<ResourceNode>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of declared nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no nodes are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the nodes in declaration order.
    #[must_use]
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    /// Returns all edges, deferred included.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns the non-deferred edges that participate in ordering.
    pub fn ordering_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| !e.deferred)
    }

    /// Returns the deferred edges applied after construction.
    pub fn deferred_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| e.deferred)
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&ResourceNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Looks up a node mutably by id.
    pub fn node_mut(&mut self, id: &str) -> Option<&mut ResourceNode> {
        self.index.get(id).copied().map(move |i| &mut self.nodes[i])
    }

    /// Adds a declared node.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a duplicate node id.
    pub fn add_node(&mut self, node: ResourceNode) -> Result<(), GraphValidationError> {
        if self.index.contains_key(node.id()) {
            return Err(GraphValidationError::new(format!(
                "duplicate node id '{}'",
                node.id()
            ))
            .with_nodes(vec![node.id().to_string()]));
        }
        self.index.insert(node.id().to_string(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Adds an ordering edge and records the matching unresolved reference
    /// on the consumer's input.
    ///
    /// # Errors
    ///
    /// Returns a validation error if either endpoint is unknown, the edge
    /// is a self-loop, or the producer never declared `output_key`.
    pub fn add_edge(
        &mut self,
        producer: &str,
        consumer: &str,
        output_key: &str,
        input_key: &str,
    ) -> Result<(), GraphValidationError> {
        self.check_edge(producer, consumer, output_key)?;
        let edge = Edge::new(producer, consumer, output_key, input_key);
        if let Some(node) = self.node_mut(consumer) {
            node.set_input(input_key, InputValue::reference(producer, output_key));
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Adds a deferred edge, applied post-hoc once both endpoints are Ready.
    ///
    /// Deferred edges do not leave an unresolved reference on the consumer;
    /// the consumer must be constructible without the deferred value.
    ///
    /// # Errors
    ///
    /// Same validation as [`DependencyGraph::add_edge`].
    pub fn add_deferred_edge(
        &mut self,
        producer: &str,
        consumer: &str,
        output_key: &str,
        input_key: &str,
    ) -> Result<(), GraphValidationError> {
        self.check_edge(producer, consumer, output_key)?;
        self.edges
            .push(Edge::new(producer, consumer, output_key, input_key).deferred());
        Ok(())
    }

    fn check_edge(
        &self,
        producer: &str,
        consumer: &str,
        output_key: &str,
    ) -> Result<(), GraphValidationError> {
        if producer == consumer {
            return Err(GraphValidationError::new(format!(
                "node '{producer}' cannot depend on itself"
            ))
            .with_nodes(vec![producer.to_string()]));
        }
        let producer_node = self.node(producer).ok_or_else(|| {
            GraphValidationError::new(format!("edge references unknown producer '{producer}'"))
                .with_nodes(vec![producer.to_string()])
        })?;
        if self.node(consumer).is_none() {
            return Err(GraphValidationError::new(format!(
                "edge references unknown consumer '{consumer}'"
            ))
            .with_nodes(vec![consumer.to_string()]));
        }
        if !producer_node.declared_outputs().contains(output_key) {
            return Err(GraphValidationError::new(format!(
                "node '{producer}' never declares output '{output_key}'"
            ))
            .with_nodes(vec![producer.to_string()]));
        }
        Ok(())
    }

    /// Validates the declared graph before construction begins.
    ///
    /// Every non-literal input must reference an existing node id, one of
    /// that node's declared output keys, and be fed by an ordering edge so
    /// it eventually resolves.
    ///
    /// # Errors
    ///
    /// Returns a validation error describing the first violation.
    pub fn validate(&self) -> Result<(), GraphValidationError> {
        for node in &self.nodes {
            for (input, producer, output) in node.unresolved_references() {
                let producer_node = self.node(producer).ok_or_else(|| {
                    GraphValidationError::new(format!(
                        "node '{}' input '{input}' references unknown node '{producer}'",
                        node.id()
                    ))
                    .with_nodes(vec![node.id().to_string(), producer.to_string()])
                })?;
                if !producer_node.declared_outputs().contains(output) {
                    return Err(GraphValidationError::new(format!(
                        "node '{}' input '{input}' references undeclared output '{producer}.{output}'",
                        node.id()
                    ))
                    .with_nodes(vec![node.id().to_string(), producer.to_string()]));
                }
                let fed = self.ordering_edges().any(|e| {
                    e.consumer == node.id() && e.input_key == input
                });
                if !fed {
                    return Err(GraphValidationError::new(format!(
                        "node '{}' input '{input}' references '{producer}.{output}' but no edge feeds it",
                        node.id()
                    ))
                    .with_nodes(vec![node.id().to_string()]));
                }
            }
        }
        Ok(())
    }

    /// Computes a deterministic construction order over non-deferred edges.
    ///
    /// Kahn's algorithm over in-degree counts, with declaration order as
    /// the stable tie-break so repeated runs over the same declarations
    /// produce the same order.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError`] with the offending path if no valid ordering
    /// exists.
    pub fn topological_order(&self) -> Result<Vec<String>, CycleError> {
        let mut in_degree = vec![0usize; self.nodes.len()];
        for edge in self.ordering_edges() {
            if let Some(&c) = self.index.get(&edge.consumer) {
                in_degree[c] += 1;
            }
        }

        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d == 0)
            .map(|(i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(&next) = ready.iter().next() {
            ready.remove(&next);
            let id = self.nodes[next].id().to_string();
            for edge in self.edges.iter().filter(|e| !e.deferred) {
                if edge.producer == id {
                    if let Some(&c) = self.index.get(&edge.consumer) {
                        in_degree[c] -= 1;
                        if in_degree[c] == 0 {
                            ready.insert(c);
                        }
                    }
                }
            }
            order.push(id);
        }

        if order.len() < self.nodes.len() {
            let remaining: HashSet<usize> = in_degree
                .iter()
                .enumerate()
                .filter(|&(_, &d)| d > 0)
                .map(|(i, _)| i)
                .collect();
            return Err(CycleError::new(self.trace_cycle(&remaining)));
        }
        Ok(order)
    }

    /// Returns true if `node` transitively depends on `target` through
    /// non-deferred edges.
    #[must_use]
    pub fn depends_on(&self, node: &str, target: &str) -> bool {
        let mut stack = vec![node.to_string()];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            for edge in self.ordering_edges() {
                if edge.consumer == current {
                    if edge.producer == target {
                        return true;
                    }
                    if seen.insert(edge.producer.clone()) {
                        stack.push(edge.producer.clone());
                    }
                }
            }
        }
        false
    }

    /// Returns true if adding a non-deferred edge `producer -> consumer`
    /// would close a cycle.
    #[must_use]
    pub fn would_cycle(&self, producer: &str, consumer: &str) -> bool {
        producer == consumer || self.depends_on(producer, consumer)
    }

    /// Returns every node transitively consuming `id`, in declaration order.
    ///
    /// Used to report the full blocked subtree of a failed node.
    #[must_use]
    pub fn transitive_consumers(&self, id: &str) -> Vec<String> {
        let mut affected: HashSet<String> = HashSet::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            for edge in self.ordering_edges() {
                if edge.producer == current && affected.insert(edge.consumer.clone()) {
                    stack.push(edge.consumer.clone());
                }
            }
        }
        self.nodes
            .iter()
            .map(ResourceNode::id)
            .filter(|id| affected.contains(*id))
            .map(String::from)
            .collect()
    }

    /// Walks producer links within the unordered remainder until a node
    /// repeats, yielding the cycle path for the error message.
    fn trace_cycle(&self, remaining: &HashSet<usize>) -> Vec<String> {
        let Some(&start) = remaining.iter().min() else {
            return Vec::new();
        };
        let mut positions: HashMap<usize, usize> = HashMap::new();
        let mut path: Vec<usize> = Vec::new();
        let mut current = start;
        loop {
            if let Some(&pos) = positions.get(&current) {
                let mut cycle: Vec<String> = path[pos..]
                    .iter()
                    .map(|&i| self.nodes[i].id().to_string())
                    .collect();
                cycle.push(self.nodes[current].id().to_string());
                return cycle;
            }
            positions.insert(current, path.len());
            path.push(current);
            let id = self.nodes[current].id();
            let producer = self
                .ordering_edges()
                .find(|e| {
                    e.consumer == id
                        && self
                            .index
                            .get(&e.producer)
                            .is_some_and(|i| remaining.contains(i))
                })
                .map(|e| self.index[&e.producer]);
            match producer {
                Some(next) => current = next,
                // Every leftover node keeps at least one leftover producer,
                // so this only trips on an inconsistent index.
                None => {
                    return path
                        .iter()
                        .map(|&i| self.nodes[i].id().to_string())
                        .collect()
                }
            }
        }
    }
}
