//! Event Bus - delivery of validation events to listeners and subscribers
//!
//! Two delivery paths share one `emit`:
//! - synchronous listener callbacks, registered and cleared explicitly
//! - a tokio broadcast channel for async consumers such as the JSONL logger
//!
//! Delivery never fails the caller. A panicking listener is caught and logged.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::types::ValidationEvent;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

type Listener = Arc<dyn Fn(&ValidationEvent) + Send + Sync>;

/// Event bus for validation lifecycle events
pub struct EventBus {
    tx: broadcast::Sender<ValidationEvent>,
    listeners: RwLock<Vec<Listener>>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Deliver an event to every listener and subscriber
    pub fn emit(&self, event: ValidationEvent) {
        debug!(
            event_type = event.event_type(),
            loop_id = event.loop_id(),
            ?event,
            "EventBus::emit"
        );

        // snapshot so listeners may add or clear listeners themselves
        let listeners: Vec<Listener> = match self.listeners.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        for (idx, listener) in listeners.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                warn!(listener = idx, event_type = event.event_type(), "EventBus::emit: listener panicked");
            }
        }

        // no subscribers is fine
        let _ = self.tx.send(event);
    }

    /// Register a callback invoked synchronously for every event
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(&ValidationEvent) + Send + Sync + 'static,
    {
        debug!("EventBus::add_listener: called");
        match self.listeners.write() {
            Ok(mut guard) => guard.push(Arc::new(listener)),
            Err(poisoned) => poisoned.into_inner().push(Arc::new(listener)),
        }
    }

    /// Remove every registered callback
    pub fn clear_listeners(&self) {
        debug!("EventBus::clear_listeners: called");
        match self.listeners.write() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().map(|g| g.len()).unwrap_or(0)
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ValidationEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Get the number of active channel subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
