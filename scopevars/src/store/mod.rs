//! Prefix-namespaced context variables.
//!
//! This module provides:
//! - [`PrefixedStore`] bulk operations keyed by a namespace prefix
//! - Save/restore scopes via [`ScopeGuard`]
//! - Free functions over the global registry for the log and task namespaces

mod prefixed;
mod scoped;

pub use prefixed::{PrefixedStore, LOG_PREFIX, TASK_PREFIX};
pub use scoped::{log_contextvars, task_contextvars, ScopeGuard};

use crate::context::Token;
use crate::errors::UnknownVariableError;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

/// Returns every value set under `prefix` in the current context.
#[must_use]
pub fn get_contextvars(prefix: &str) -> HashMap<String, Value> {
    PrefixedStore::new(prefix).read_all()
}

/// Sets `entries` under `prefix` and returns a token per key.
pub fn set_contextvars<I, K>(prefix: &str, entries: I) -> HashMap<String, Token>
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    PrefixedStore::new(prefix).set_many(entries)
}

/// Sets `entries` under the log prefix.
pub fn set_log_contextvars<I, K>(entries: I) -> HashMap<String, Token>
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    PrefixedStore::log().set_many(entries)
}

/// Sets `entries` under the task prefix.
pub fn set_task_contextvars<I, K>(entries: I) -> HashMap<String, Token>
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    PrefixedStore::task().set_many(entries)
}

/// Unsets `keys` under `prefix`.
pub fn unset_contextvars<I>(prefix: &str, keys: I)
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    PrefixedStore::new(prefix).unset_many(keys);
}

/// Resets `tokens` under `prefix`.
///
/// # Errors
///
/// Returns `UnknownVariableError` if a key has no registered variable.
pub fn reset_contextvars<I, K>(prefix: &str, tokens: I) -> Result<(), UnknownVariableError>
where
    I: IntoIterator<Item = (K, Token)>,
    K: AsRef<str>,
{
    PrefixedStore::new(prefix).reset_many(tokens)
}

/// Unsets every variable under `prefix`.
pub fn clear_contextvars(prefix: &str) {
    PrefixedStore::new(prefix).clear_all();
}

/// Returns the `node_info` log field, or an empty object when unset.
#[must_use]
pub fn get_node_info() -> Value {
    PrefixedStore::log()
        .get("node_info")
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()))
}

/// Returns the `project_root` task parameter when it is set to a string.
#[must_use]
pub fn get_project_root() -> Option<PathBuf> {
    PrefixedStore::task()
        .get("project_root")?
        .as_str()
        .map(PathBuf::from)
}
