//! Event sink trait and implementations.

use crate::events::OrchestrationEvent;
use async_trait::async_trait;
use tracing::{debug, info, Level};

/// Trait for sinks receiving orchestration events.
///
/// Sinks are used for observability of a run: state transitions, deferred
/// bindings, config publication.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    async fn emit(&self, event: &OrchestrationEvent);

    /// Emits an event without blocking. Must never fail; errors are
    /// logged and suppressed.
    fn try_emit(&self, event: &OrchestrationEvent);
}

/// A sink that discards all events. The default when none is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: &OrchestrationEvent) {}

    fn try_emit(&self, _event: &OrchestrationEvent) {}
}

/// A sink that logs events through the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink at the given level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log(&self, event: &OrchestrationEvent) {
        match self.level {
            Level::DEBUG => debug!(
                event = %event.name(),
                payload = %event.payload(),
                "orchestration event"
            ),
            _ => info!(
                event = %event.name(),
                payload = %event.payload(),
                "orchestration event"
            ),
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: &OrchestrationEvent) {
        self.log(event);
    }

    fn try_emit(&self, event: &OrchestrationEvent) {
        self.log(event);
    }
}

/// A collecting sink for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<OrchestrationEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<OrchestrationEvent> {
        self.events.read().clone()
    }

    /// Returns the collected events with a given dotted name.
    #[must_use]
    pub fn events_named(&self, name: &str) -> Vec<OrchestrationEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.name() == name)
            .cloned()
            .collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: &OrchestrationEvent) {
        self.events.write().push(event.clone());
    }

    fn try_emit(&self, event: &OrchestrationEvent) {
        self.events.write().push(event.clone());
    }
}
