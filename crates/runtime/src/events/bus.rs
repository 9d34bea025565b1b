//! Topic-based event bus implementation.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::broadcast;

use super::types::{DecisionEvent, ExecutionEvent, SessionEvent};
use crate::trace::TickTrace;

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize)]
pub enum Topic {
    /// One event per tick with the emitted decision
    Decision,
    /// Per-rule traces (when enabled) and rule faults
    Trace,
    /// Commits and commit-time rejections
    Execution,
    /// Activation, reload and combat changes
    Session,
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, Serialize)]
pub enum Event {
    Decision(DecisionEvent),
    Trace(Box<TickTrace>),
    Execution(ExecutionEvent),
    Session(SessionEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Decision(_) => Topic::Decision,
            Event::Trace(_) => Topic::Trace,
            Event::Execution(_) => Topic::Execution,
            Event::Session(_) => Topic::Session,
        }
    }
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about. Cloning shares the underlying channels.
#[derive(Clone)]
pub struct EventBus {
    decision: broadcast::Sender<Event>,
    trace: broadcast::Sender<Event>,
    execution: broadcast::Sender<Event>,
    session: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(rotation_core::BusConfig::DEFAULT_CAPACITY)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            decision: broadcast::channel(capacity).0,
            trace: broadcast::channel(capacity).0,
            execution: broadcast::channel(capacity).0,
            session: broadcast::channel(capacity).0,
        }
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Decision => &self.decision,
            Topic::Trace => &self.trace,
            Topic::Execution => &self.execution,
            Topic::Session => &self.session,
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if self.sender(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    ///
    /// Returns a receiver that will only receive events for that topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.sender(topic).subscribe()
    }

    /// Subscribe to multiple topics
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("decision_subscribers", &self.decision.receiver_count())
            .field("trace_subscribers", &self.trace.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotation_core::DecisionOutput;

    #[tokio::test]
    async fn routes_events_by_topic() {
        let bus = EventBus::with_capacity(4);
        let mut decisions = bus.subscribe(Topic::Decision);
        let mut sessions = bus.subscribe(Topic::Session);

        bus.publish(Event::Session(SessionEvent::CombatStarted));
        bus.publish(Event::Decision(DecisionEvent {
            tick: 1,
            decision: DecisionOutput::default(),
        }));

        match decisions.recv().await.expect("decision event") {
            Event::Decision(event) => assert_eq!(event.tick, 1),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(
            sessions.recv().await.expect("session event"),
            Event::Session(SessionEvent::CombatStarted)
        ));
        assert!(decisions.try_recv().is_err());
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(Event::Session(SessionEvent::CombatEnded));
    }
}
