//! # Scopevars
//!
//! Scoped, prefix-namespaced context variables.
//!
//! Scopevars attaches structured metadata (log fields, task parameters, the
//! unit of work currently executing) to code that does not receive it as
//! arguments:
//!
//! - **Execution contexts**: copy-on-branch, thread-local by default, bindable
//!   to async tasks
//! - **Variable registry**: one variable per `prefix + key`, created on first use
//! - **Prefixed store**: bulk read/set/unset/reset/clear per namespace
//! - **Scopes**: save/restore brackets that never leak or clobber caller values
//! - **Current unit**: a single slot for the record being executed
//!
//! ## Quick Start
//!
//! ```rust
//! use scopevars::prelude::*;
//! use serde_json::json;
//!
//! let _ = set_log_contextvars([("request_id", json!("abc"))]);
//!
//! {
//!     let _scope = log_contextvars([("request_id", json!("xyz")), ("user", json!("bob"))]);
//!     assert_eq!(get_contextvars(LOG_PREFIX).len(), 2);
//! }
//!
//! assert_eq!(
//!     get_contextvars(LOG_PREFIX).get("request_id"),
//!     Some(&json!("abc"))
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod context;
pub mod current_unit;
pub mod errors;
pub mod observability;
pub mod store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::{
        copy_context, spawn, spawn_thread, variable_registry, ContextFutureExt, ContextVar,
        ExecutionContext, Token, VariableRegistry,
    };
    pub use crate::current_unit::{
        clear_current_unit, current_unit_any, get_current_unit, set_current_unit,
    };
    pub use crate::errors::{ScopevarsError, UnknownVariableError};
    pub use crate::observability::{
        contextual_fields, ContextualEmitter, LoggingContextualEmitter, TracingConfig,
    };
    pub use crate::store::{
        clear_contextvars, get_contextvars, get_node_info, get_project_root, log_contextvars,
        reset_contextvars, set_contextvars, set_log_contextvars, set_task_contextvars,
        task_contextvars, unset_contextvars, PrefixedStore, ScopeGuard, LOG_PREFIX, TASK_PREFIX,
    };
}
