//! Directed edges between producer and consumer nodes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A directed data edge: the consumer's input is fed by the producer's
/// output once the producer reaches Ready.
///
/// Deferred edges are excluded from the acyclicity check and applied as a
/// second pass of mutation calls after the main construction order
/// completes. They exist to break otherwise-unavoidable cycles such as a
/// security binding that needs the identity of a resource it also guards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// The node producing the value.
    pub producer: String,
    /// The node consuming the value.
    pub consumer: String,
    /// The producer output key.
    pub output_key: String,
    /// The consumer input name the value lands in.
    pub input_key: String,
    /// Whether this edge is applied post-hoc, outside the acyclicity check.
    pub deferred: bool,
}

impl Edge {
    /// Creates a normal (ordering) edge.
    #[must_use]
    pub fn new(
        producer: impl Into<String>,
        consumer: impl Into<String>,
        output_key: impl Into<String>,
        input_key: impl Into<String>,
    ) -> Self {
        Self {
            producer: producer.into(),
            consumer: consumer.into(),
            output_key: output_key.into(),
            input_key: input_key.into(),
            deferred: false,
        }
    }

    /// Marks the edge as deferred.
    #[must_use]
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}{}",
            self.producer,
            self.output_key,
            self.consumer,
            self.input_key,
            if self.deferred { " (deferred)" } else { "" }
        )
    }
}
