//! Structured orchestration events and sinks.

mod event;
mod sink;
mod telemetry;

pub use event::OrchestrationEvent;
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
pub use telemetry::init_tracing;
