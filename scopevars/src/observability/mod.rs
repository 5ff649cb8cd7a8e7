//! Observability utilities.

mod emitter;
mod subscriber;

pub use emitter::{
    contextual_fields, CollectingContextualEmitter, ContextualEmitter, ContextualRecord,
    LoggingContextualEmitter, NoOpContextualEmitter,
};
pub use subscriber::{TracingConfig, FILTER_ENV};
