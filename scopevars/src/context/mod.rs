//! Execution-context-local variables.
//!
//! This module provides:
//! - Copy-on-branch execution contexts with a thread-local current context
//! - Context variables with token-based undo
//! - The process-wide variable registry

mod execution;
mod registry;
mod var;

pub(crate) use execution::{with_current, with_current_mut};
pub use execution::{
    copy_context, spawn, spawn_thread, ContextFuture, ContextFutureExt, CurrentUnit,
    ExecutionContext,
};
pub use registry::{variable_registry, VariableRegistry};
pub use var::{ContextVar, Token};
