//! Emitters that decorate records with the visible log fields.

use crate::store::PrefixedStore;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn, Level};

/// Returns the log fields visible in the current context.
#[must_use]
pub fn contextual_fields() -> HashMap<String, Value> {
    PrefixedStore::log().read_all()
}

/// An event together with the log fields captured when it was emitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextualRecord {
    /// The event type (e.g., "node.started").
    pub event_type: String,
    /// Optional event payload.
    pub data: Option<Value>,
    /// Log fields visible at capture time.
    pub fields: HashMap<String, Value>,
}

impl ContextualRecord {
    /// Captures a record with the current log fields.
    #[must_use]
    pub fn capture(event_type: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            fields: contextual_fields(),
        }
    }

    /// Returns the captured fields as a JSON object.
    #[must_use]
    pub fn fields_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// Trait for sinks that emit records decorated with context fields.
pub trait ContextualEmitter: Send + Sync {
    /// Emits an already captured record.
    fn emit_record(&self, record: ContextualRecord);

    /// Captures the current log fields and emits the event.
    fn emit(&self, event_type: &str, data: Option<Value>) {
        self.emit_record(ContextualRecord::capture(event_type, data));
    }
}

/// An emitter that discards all records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpContextualEmitter;

impl ContextualEmitter for NoOpContextualEmitter {
    fn emit_record(&self, _record: ContextualRecord) {}

    fn emit(&self, _event_type: &str, _data: Option<Value>) {}
}

/// An emitter that logs records through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingContextualEmitter {
    level: Level,
}

impl Default for LoggingContextualEmitter {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingContextualEmitter {
    /// Creates a logging emitter with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level emitter.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level emitter.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    /// Returns the configured level.
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }
}

impl ContextualEmitter for LoggingContextualEmitter {
    fn emit_record(&self, record: ContextualRecord) {
        let fields = record.fields_json();
        match self.level {
            Level::DEBUG | Level::TRACE => {
                debug!(
                    event_type = %record.event_type,
                    event_data = ?record.data,
                    context = %fields,
                    "Event: {}", record.event_type
                );
            }
            Level::WARN | Level::ERROR => {
                warn!(
                    event_type = %record.event_type,
                    event_data = ?record.data,
                    context = %fields,
                    "Event: {}", record.event_type
                );
            }
            _ => {
                info!(
                    event_type = %record.event_type,
                    event_data = ?record.data,
                    context = %fields,
                    "Event: {}", record.event_type
                );
            }
        }
    }
}

/// A collecting emitter for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingContextualEmitter {
    records: RwLock<Vec<ContextualRecord>>,
}

impl CollectingContextualEmitter {
    /// Creates a new collecting emitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected records.
    #[must_use]
    pub fn records(&self) -> Vec<ContextualRecord> {
        self.records.read().clone()
    }

    /// Returns the number of collected records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Clears all collected records.
    pub fn clear(&self) {
        self.records.write().clear();
    }
}

impl ContextualEmitter for CollectingContextualEmitter {
    fn emit_record(&self, record: ContextualRecord) {
        self.records.write().push(record);
    }
}
