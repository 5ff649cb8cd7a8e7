//! Save/restore scopes over a prefixed store.

use super::PrefixedStore;
use crate::context::copy_context;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use tracing::trace;

/// Guard for a scope entered with [`PrefixedStore::enter_scope`].
///
/// Dropping the guard exits the scope: every key the scope set is unset, then
/// the values those keys held before entry are put back. Keys that were absent
/// before entry end up absent again, whatever the body did to them.
///
/// Nested guards must be dropped in reverse order of creation, which normal
/// lexical scoping already guarantees.
#[must_use = "the scope is exited as soon as the guard is dropped"]
pub struct ScopeGuard {
    store: PrefixedStore,
    keys: Vec<String>,
    saved: HashMap<String, Value>,
}

impl ScopeGuard {
    /// Returns the prefix this scope applies to.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.store.prefix()
    }

    /// Returns the keys this scope set.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Returns the pre-entry values that will be restored on exit.
    #[must_use]
    pub fn saved(&self) -> &HashMap<String, Value> {
        &self.saved
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.store.unset_many(&self.keys);
        let _ = self.store.set_many(std::mem::take(&mut self.saved));
        trace!(prefix = %self.store.prefix(), keys = ?self.keys, "Exited context scope");
    }
}

impl std::fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("prefix", &self.store.prefix())
            .field("keys", &self.keys)
            .field("saved", &self.saved)
            .finish()
    }
}

impl PrefixedStore {
    /// Enters a scope that overrides `entries` until the guard is dropped.
    pub fn enter_scope<I, K>(&self, entries: I) -> ScopeGuard
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let entries: HashMap<String, Value> = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();

        let saved: HashMap<String, Value> = entries
            .keys()
            .filter_map(|key| self.get(key).map(|value| (key.clone(), value)))
            .collect();
        let keys: Vec<String> = entries.keys().cloned().collect();

        let _ = self.set_many(entries);
        trace!(
            prefix = %self.prefix(),
            keys = ?keys,
            restored = saved.len(),
            "Entered context scope"
        );

        ScopeGuard {
            store: self.clone(),
            keys,
            saved,
        }
    }

    /// Runs `body` with `entries` in effect and returns its result unchanged.
    ///
    /// The scope is exited on every path out of `body`, including `Err`
    /// returns and panics.
    pub fn with_scope<I, K, R>(&self, entries: I, body: impl FnOnce() -> R) -> R
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let _guard = self.enter_scope(entries);
        body()
    }

    /// Async form of [`with_scope`](Self::with_scope).
    ///
    /// On first poll the current context is copied and `body` runs inside
    /// that copy with `entries` in effect. The scope is exited when `body`
    /// completes or the returned future is dropped. Polls never write to the
    /// polling thread's own context, so tasks sharing a worker thread cannot
    /// see each other's scoped values, and writes `body` makes are not
    /// visible to the caller afterwards.
    pub fn with_scope_async<I, K, F>(
        &self,
        entries: I,
        body: F,
    ) -> impl Future<Output = F::Output>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
        F: Future,
    {
        let store = self.clone();
        let entries: Vec<(String, Value)> = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();

        async move {
            copy_context()
                .scope(async move {
                    let _guard = store.enter_scope(entries);
                    body.await
                })
                .await
        }
    }
}

/// Enters a scope over the log prefix.
pub fn log_contextvars<I, K>(entries: I) -> ScopeGuard
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    PrefixedStore::log().enter_scope(entries)
}

/// Enters a scope over the task prefix.
pub fn task_contextvars<I, K>(entries: I) -> ScopeGuard
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    PrefixedStore::task().enter_scope(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::VariableRegistry;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn store() -> PrefixedStore {
        PrefixedStore::with_registry("log_", Arc::new(VariableRegistry::new()))
    }

    #[test]
    fn test_guard_saves_only_overlapping_keys() {
        let store = store();
        let _ = store.set_many([("a", json!(1)), ("b", json!(2))]);

        let guard = store.enter_scope([("a", json!(10)), ("c", json!(30))]);

        assert_eq!(guard.saved(), &HashMap::from([("a".to_string(), json!(1))]));
        let mut keys = guard.keys().to_vec();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(guard.prefix(), "log_");
    }

    #[test]
    fn test_guard_restores_on_drop() {
        let store = store();
        let _ = store.set_many([("a", json!(1))]);

        {
            let _guard = store.enter_scope([("a", json!(2)), ("b", json!(3))]);
            assert_eq!(store.get("a"), Some(json!(2)));
            assert_eq!(store.get("b"), Some(json!(3)));
        }

        assert_eq!(
            store.read_all(),
            HashMap::from([("a".to_string(), json!(1))])
        );
    }

    #[test]
    fn test_with_scope_returns_body_value() {
        let store = store();
        let value = store.with_scope([("x", json!("v"))], || store.get("x"));

        assert_eq!(value, Some(json!("v")));
        assert_eq!(store.get("x"), None);
    }

    #[test]
    fn test_with_scope_forwards_errors() {
        let store = store();
        let _ = store.set_many([("x", json!("v0"))]);

        let result: Result<(), String> =
            store.with_scope([("x", json!("v1"))], || Err("body failed".to_string()));

        assert_eq!(result, Err("body failed".to_string()));
        assert_eq!(store.get("x"), Some(json!("v0")));
    }

    #[test]
    fn test_empty_scope_is_noop() {
        let store = store();
        let _ = store.set_many([("x", json!(1))]);

        store.with_scope(Vec::<(String, Value)>::new(), || {});

        assert_eq!(store.get("x"), Some(json!(1)));
    }
}
