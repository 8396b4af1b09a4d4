//! Validation lifecycle events
//!
//! The orchestrator emits every lifecycle event on an [`EventBus`] it is
//! handed. Consumers either register a synchronous listener or subscribe to
//! the broadcast channel:
//!
//! ```text
//!   Validator ──emit──▶ EventBus ──▶ listeners (Fn callbacks)
//!                           └──────▶ broadcast subscribers (JSONL logger, watch UI)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let bus = Arc::new(EventBus::with_default_capacity());
//! bus.add_listener(|event| println!("{}", event.event_type()));
//! let logger = spawn_event_logger(bus.clone(), "events.jsonl");
//! ```

mod bus;
mod logger;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus};
pub use logger::{read_event_log, spawn_event_logger};
pub use types::{EventLogEntry, RequirementKind, ValidationEvent};
