//! The output propagator: event-driven construction scheduling.

use crate::cancellation::AbortToken;
use crate::core::{NodeStatus, OutputValue, ResourceNode};
use crate::errors::{CloudloomError, ProvisioningError};
use crate::events::{EventSink, NoOpEventSink, OrchestrationEvent};
use crate::executor::{DeferredApplication, ExecutionReport};
use crate::graph::{DependencyGraph, Edge};
use crate::provider::{Provisioner, ResourceRequest};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

type ConstructionResult = (
    String,
    Result<BTreeMap<String, OutputValue>, ProvisioningError>,
    f64,
);

/// Drives a declared graph to completion.
///
/// After a node transitions to Ready, its outputs are written into the
/// inputs of dependents not yet constructed; any consumer whose inputs are
/// now fully resolved is constructed in turn. Independent branches run
/// concurrently; the resolved-input check is atomic per node because all
/// graph mutation happens on the scheduling loop.
pub struct OutputPropagator {
    provisioner: Arc<dyn Provisioner>,
    sink: Arc<dyn EventSink>,
    abort: Arc<AbortToken>,
}

impl OutputPropagator {
    /// Creates a propagator with a no-op event sink and a fresh abort token.
    #[must_use]
    pub fn new(provisioner: Arc<dyn Provisioner>) -> Self {
        Self {
            provisioner,
            sink: Arc::new(NoOpEventSink),
            abort: Arc::new(AbortToken::new()),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the abort token.
    #[must_use]
    pub fn with_abort_token(mut self, abort: Arc<AbortToken>) -> Self {
        self.abort = abort;
        self
    }

    /// Executes the graph: validates, schedules construction, propagates
    /// outputs, and applies deferred edges once the main order completes.
    ///
    /// Declaration-time problems (invalid references, non-deferred cycles)
    /// fail before any provisioning side effect. Provider failures do not
    /// fail the call; they are captured in the report together with the
    /// blocked subtree.
    ///
    /// # Errors
    ///
    /// Returns validation or cycle errors at declaration time, and internal
    /// errors for scheduler inconsistencies (task join failures,
    /// out-of-order lifecycle transitions).
    pub async fn execute(
        &self,
        graph: &mut DependencyGraph,
    ) -> Result<ExecutionReport, CloudloomError> {
        graph.validate()?;
        graph.topological_order()?;

        let started_at = Utc::now();
        let start = Instant::now();
        let ordering_edges: Vec<Edge> = graph.ordering_edges().cloned().collect();
        let node_ids: Vec<String> = graph.nodes().iter().map(|n| n.id().to_string()).collect();

        let mut in_degree: HashMap<String, usize> =
            node_ids.iter().map(|id| (id.clone(), 0)).collect();
        for edge in &ordering_edges {
            if let Some(d) = in_degree.get_mut(&edge.consumer) {
                *d += 1;
            }
        }

        let mut construction_order = Vec::new();
        let mut failures: Vec<ProvisioningError> = Vec::new();
        let mut blocked: Vec<String> = Vec::new();
        let mut active: FuturesUnordered<tokio::task::JoinHandle<ConstructionResult>> =
            FuturesUnordered::new();

        // Roots first, in declaration order.
        for id in &node_ids {
            if in_degree[id] == 0 && !self.abort.is_aborted() {
                active.push(self.spawn_construction(graph, id)?);
            }
        }

        while let Some(joined) = active.next().await {
            let (id, result, duration_ms) = joined
                .map_err(|e| CloudloomError::Internal(format!("construction task join error: {e}")))?;

            match result {
                Ok(outputs) => {
                    let node = Self::node_mut(graph, &id)?;
                    if let Err(err) = node.complete(outputs) {
                        // The provider answered but omitted a declared
                        // output; treated as a failure of this node.
                        let CloudloomError::Provisioning(perr) = err else {
                            return Err(err);
                        };
                        self.record_failure(graph, perr, &mut failures, &mut blocked);
                        continue;
                    }
                    debug!(node = %id, duration_ms, "node ready");
                    self.sink.try_emit(&OrchestrationEvent::NodeReady {
                        node: id.clone(),
                        duration_ms,
                    });
                    construction_order.push(id.clone());

                    if self.abort.is_aborted() {
                        continue;
                    }
                    for edge in ordering_edges.iter().filter(|e| e.producer == id) {
                        let value = Self::node_ref(graph, &id)?.output(&edge.output_key)?.clone();
                        let consumer = Self::node_mut(graph, &edge.consumer)?;
                        consumer.resolve_input(&edge.input_key, value);
                        let degree = in_degree.get_mut(&edge.consumer).ok_or_else(|| {
                            CloudloomError::Internal(format!(
                                "no in-degree entry for '{}'",
                                edge.consumer
                            ))
                        })?;
                        *degree -= 1;
                        if *degree == 0 && consumer.status() == NodeStatus::Pending {
                            active.push(self.spawn_construction(graph, &edge.consumer)?);
                        }
                    }
                }
                Err(perr) => {
                    warn!(node = %perr.node, cause = %perr.cause, "node failed");
                    if let Some(node) = graph.node_mut(&perr.node) {
                        node.fail(&perr.cause);
                    }
                    self.record_failure(graph, perr, &mut failures, &mut blocked);
                }
            }
        }

        let aborted = self.abort.is_aborted();
        if aborted {
            let reason = self.abort.reason().unwrap_or_default();
            self.sink
                .try_emit(&OrchestrationEvent::RunAborted { reason });
        }

        let deferred_applied = self.apply_deferred_edges(graph)?;

        debug!(
            total = graph.len(),
            ready = construction_order.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "execution pass finished"
        );

        Ok(ExecutionReport {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            construction_order,
            statuses: graph
                .nodes()
                .iter()
                .map(|n| (n.id().to_string(), n.status()))
                .collect(),
            failures,
            blocked,
            deferred_applied,
            aborted,
            abort_reason: self.abort.reason(),
        })
    }

    /// Marks a node Constructing and spawns its provider call.
    fn spawn_construction(
        &self,
        graph: &mut DependencyGraph,
        id: &str,
    ) -> Result<tokio::task::JoinHandle<ConstructionResult>, CloudloomError> {
        let node = Self::node_mut(graph, id)?;
        node.begin_construction()?;
        let request = ResourceRequest {
            id: node.id().to_string(),
            kind: node.kind(),
            inputs: node.resolved_inputs()?,
            declared_outputs: node.declared_outputs().clone(),
            tags: node.tags().clone(),
        };
        self.sink.try_emit(&OrchestrationEvent::NodeConstructing {
            node: request.id.clone(),
        });
        let provisioner = Arc::clone(&self.provisioner);
        Ok(tokio::spawn(async move {
            let start = Instant::now();
            let result = provisioner.create(&request).await;
            (
                request.id,
                result,
                start.elapsed().as_secs_f64() * 1000.0,
            )
        }))
    }

    /// Records a failure and blocks the full transitive consumer subtree.
    fn record_failure(
        &self,
        graph: &mut DependencyGraph,
        error: ProvisioningError,
        failures: &mut Vec<ProvisioningError>,
        blocked: &mut Vec<String>,
    ) {
        self.sink.try_emit(&OrchestrationEvent::NodeFailed {
            node: error.node.clone(),
            cause: error.cause.clone(),
        });
        for consumer in graph.transitive_consumers(&error.node) {
            let Some(node) = graph.node_mut(&consumer) else {
                continue;
            };
            if node.status().is_terminal() {
                continue;
            }
            node.block();
            self.sink.try_emit(&OrchestrationEvent::NodeBlocked {
                node: consumer.clone(),
                failed_producer: error.node.clone(),
            });
            blocked.push(consumer);
        }
        failures.push(error);
    }

    /// Second pass: applies each deferred edge whose endpoints both reached
    /// Ready, writing the producer's output into the consumer's input map.
    fn apply_deferred_edges(
        &self,
        graph: &mut DependencyGraph,
    ) -> Result<Vec<DeferredApplication>, CloudloomError> {
        let deferred: Vec<Edge> = graph.deferred_edges().cloned().collect();
        let mut applied = Vec::new();
        for edge in deferred {
            let producer_ready = graph
                .node(&edge.producer)
                .is_some_and(|n| n.status() == NodeStatus::Ready);
            let consumer_ready = graph
                .node(&edge.consumer)
                .is_some_and(|n| n.status() == NodeStatus::Ready);
            if !(producer_ready && consumer_ready) {
                debug!(edge = %edge, "deferred edge skipped; endpoints not Ready");
                continue;
            }
            let value = Self::node_ref(graph, &edge.producer)?
                .output(&edge.output_key)?
                .clone();
            Self::node_mut(graph, &edge.consumer)?.resolve_input(&edge.input_key, value);
            self.sink.try_emit(&OrchestrationEvent::DeferredApplied {
                producer: edge.producer.clone(),
                consumer: edge.consumer.clone(),
            });
            applied.push(DeferredApplication {
                producer: edge.producer,
                consumer: edge.consumer,
                input_key: edge.input_key,
            });
        }
        Ok(applied)
    }

    fn node_ref<'g>(
        graph: &'g DependencyGraph,
        id: &str,
    ) -> Result<&'g ResourceNode, CloudloomError> {
        graph
            .node(id)
            .ok_or_else(|| CloudloomError::Internal(format!("unknown node '{id}'")))
    }

    fn node_mut<'g>(
        graph: &'g mut DependencyGraph,
        id: &str,
    ) -> Result<&'g mut ResourceNode, CloudloomError> {
        graph
            .node_mut(id)
            .ok_or_else(|| CloudloomError::Internal(format!("unknown node '{id}'")))
    }
}
