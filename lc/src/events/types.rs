//! Validation lifecycle events
//!
//! One loop produces, in order: `LoopValidationStarted`, zero or more
//! `RequirementMet`, `ValidationTime`, and `LoopCompleted` when everything
//! passed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which kind of requirement was met
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementKind {
    File,
    Function,
}

/// Core event enum - the vocabulary of a validation run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ValidationEvent {
    LoopValidationStarted {
        loop_id: String,
        loop_name: String,
    },
    /// A file requirement (`path`) or function requirement (`name`, `file`) passed
    RequirementMet {
        loop_id: String,
        #[serde(rename = "type")]
        kind: RequirementKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file: Option<String>,
    },
    ValidationTime {
        loop_id: String,
        elapsed_ms: f64,
    },
    LoopCompleted {
        loop_id: String,
        loop_name: String,
        total_checks: usize,
    },
}

impl ValidationEvent {
    pub fn file_met(loop_id: &str, path: &str) -> Self {
        ValidationEvent::RequirementMet {
            loop_id: loop_id.to_string(),
            kind: RequirementKind::File,
            path: Some(path.to_string()),
            name: None,
            file: None,
        }
    }

    pub fn function_met(loop_id: &str, name: &str, file: &str) -> Self {
        ValidationEvent::RequirementMet {
            loop_id: loop_id.to_string(),
            kind: RequirementKind::Function,
            path: None,
            name: Some(name.to_string()),
            file: Some(file.to_string()),
        }
    }

    /// Loop this event belongs to
    pub fn loop_id(&self) -> &str {
        match self {
            ValidationEvent::LoopValidationStarted { loop_id, .. }
            | ValidationEvent::RequirementMet { loop_id, .. }
            | ValidationEvent::ValidationTime { loop_id, .. }
            | ValidationEvent::LoopCompleted { loop_id, .. } => loop_id,
        }
    }

    /// Event name as used in the serialized `event` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            ValidationEvent::LoopValidationStarted { .. } => "loop_validation_started",
            ValidationEvent::RequirementMet { .. } => "requirement_met",
            ValidationEvent::ValidationTime { .. } => "validation_time",
            ValidationEvent::LoopCompleted { .. } => "loop_completed",
        }
    }
}

/// A timestamped event as written to a JSONL log
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub event: ValidationEvent,
}

impl EventLogEntry {
    /// Create a new log entry with current timestamp
    pub fn new(event: ValidationEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}
