//! Event-driven graph construction.
//!
//! The propagator turns the static edge list into an executable build
//! sequence: nodes are constructed as soon as their inputs resolve, newly
//! available outputs are fed forward, and a failed node blocks exactly its
//! transitive consumers.

mod propagator;
mod report;

pub use propagator::OutputPropagator;
pub use report::{DeferredApplication, ExecutionReport};
