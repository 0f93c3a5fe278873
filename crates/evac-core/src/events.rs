//! Event bus - synchronous delivery of evacuation events
//!
//! Every published event is handed to each subscriber in registration
//! order and appended to a log that callers drain at their own pace.

use evac_logic::events::EvacEvent;

/// Callback registered with [`EventBus::subscribe`]
pub type Subscriber = Box<dyn FnMut(&EvacEvent)>;

#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    log: Vec<EvacEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Subscriber) {
        self.subscribers.push(subscriber);
    }

    pub fn publish(&mut self, event: EvacEvent) {
        for subscriber in &mut self.subscribers {
            subscriber(&event);
        }
        self.log.push(event);
    }

    /// Events not yet drained
    pub fn pending(&self) -> &[EvacEvent] {
        &self.log
    }

    pub fn drain(&mut self) -> Vec<EvacEvent> {
        std::mem::take(&mut self.log)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("pending", &self.log.len())
            .finish()
    }
}
