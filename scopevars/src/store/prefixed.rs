//! Prefix-namespaced bulk operations over registered context variables.

use crate::context::{variable_registry, with_current, ContextVar, Token, VariableRegistry};
use crate::errors::UnknownVariableError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Prefix for log fields attached to emitted records.
pub const LOG_PREFIX: &str = "log_";

/// Prefix for task-scoped parameters.
pub const TASK_PREFIX: &str = "task_";

/// A view of the registry restricted to one namespace prefix.
///
/// Keys are given and reported without the prefix; variables are registered
/// under `prefix + key`.
#[derive(Clone)]
pub struct PrefixedStore {
    prefix: String,
    registry: Arc<VariableRegistry>,
}

impl PrefixedStore {
    /// Creates a store over the global registry.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_registry(prefix, variable_registry())
    }

    /// Creates a store over an explicit registry.
    #[must_use]
    pub fn with_registry(prefix: impl Into<String>, registry: Arc<VariableRegistry>) -> Self {
        Self {
            prefix: prefix.into(),
            registry,
        }
    }

    /// Creates the store for log fields.
    #[must_use]
    pub fn log() -> Self {
        Self::new(LOG_PREFIX)
    }

    /// Creates the store for task parameters.
    #[must_use]
    pub fn task() -> Self {
        Self::new(TASK_PREFIX)
    }

    /// Returns the namespace prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the backing registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<VariableRegistry> {
        &self.registry
    }

    fn qualify(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    fn visible_vars(&self) -> Vec<ContextVar> {
        with_current(|ctx| {
            ctx.iter()
                .map(|(var, _)| var)
                .filter(|var| var.name().starts_with(self.prefix.as_str()))
                .filter(|var| self.registry.owns(var))
                .cloned()
                .collect()
        })
    }

    /// Returns every value set under this prefix in the current context.
    ///
    /// The result is a snapshot; later writes do not show up in it.
    #[must_use]
    pub fn read_all(&self) -> HashMap<String, Value> {
        with_current(|ctx| {
            ctx.iter()
                .filter_map(|(var, value)| {
                    let key = var.name().strip_prefix(self.prefix.as_str())?;
                    self.registry
                        .owns(var)
                        .then(|| (key.to_string(), value.clone()))
                })
                .collect()
        })
    }

    /// Returns the value of a single key, if set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.registry.get(&self.qualify(key))?.get()
    }

    /// Sets every entry, registering variables as needed.
    ///
    /// Returns one token per key so exactly these writes can be undone with
    /// [`reset_many`](Self::reset_many). When a key repeats, the last value
    /// wins and is written once.
    pub fn set_many<I, K>(&self, entries: I) -> HashMap<String, Token>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let entries: HashMap<String, Value> = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();

        entries
            .into_iter()
            .map(|(key, value)| {
                let token = self.registry.get_or_create(&self.qualify(&key)).set(value);
                (key, token)
            })
            .collect()
    }

    /// Unsets each key whose variable exists.
    ///
    /// Keys that were never registered are skipped, so this never creates a
    /// variable and repeating it changes nothing. Outstanding tokens are not
    /// affected.
    pub fn unset_many<I>(&self, keys: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for key in keys {
            if let Some(var) = self.registry.get(&self.qualify(key.as_ref())) {
                var.unset();
            }
        }
    }

    /// Resets each key's variable with its token.
    ///
    /// # Errors
    ///
    /// Returns `UnknownVariableError` for the first key with no registered
    /// variable. Keys processed before it stay reset.
    pub fn reset_many<I, K>(&self, tokens: I) -> Result<(), UnknownVariableError>
    where
        I: IntoIterator<Item = (K, Token)>,
        K: AsRef<str>,
    {
        for (key, token) in tokens {
            let name = self.qualify(key.as_ref());
            let var = self
                .registry
                .get(&name)
                .ok_or_else(|| UnknownVariableError::new(name))?;
            var.reset(token);
        }
        Ok(())
    }

    /// Unsets every variable visible under this prefix.
    pub fn clear_all(&self) {
        for var in self.visible_vars() {
            var.unset();
        }
    }
}

impl std::fmt::Debug for PrefixedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefixedStore")
            .field("prefix", &self.prefix)
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn store(prefix: &str) -> PrefixedStore {
        PrefixedStore::with_registry(prefix, Arc::new(VariableRegistry::new()))
    }

    #[test]
    fn test_read_all_empty() {
        assert!(store("log_").read_all().is_empty());
    }

    #[test]
    fn test_set_many_then_read_all() {
        let store = store("log_");
        let _ = store.set_many([("request_id", json!("abc")), ("user", json!("bob"))]);

        let expected = HashMap::from([
            ("request_id".to_string(), json!("abc")),
            ("user".to_string(), json!("bob")),
        ]);
        assert_eq!(store.read_all(), expected);
        assert_eq!(store.get("user"), Some(json!("bob")));
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn test_set_many_registers_qualified_names() {
        let store = store("task_");
        let _ = store.set_many([("project_root", json!("/tmp/project"))]);

        assert!(store.registry().contains("task_project_root"));
        assert!(!store.registry().contains("project_root"));
    }

    #[test]
    fn test_prefixes_do_not_collide() {
        let registry = Arc::new(VariableRegistry::new());
        let log = PrefixedStore::with_registry(LOG_PREFIX, registry.clone());
        let task = PrefixedStore::with_registry(TASK_PREFIX, registry);

        let _ = log.set_many([("name", json!("log"))]);
        let _ = task.set_many([("name", json!("task"))]);

        assert_eq!(log.get("name"), Some(json!("log")));
        assert_eq!(task.get("name"), Some(json!("task")));
        assert_eq!(log.read_all().len(), 1);
    }

    #[test]
    fn test_read_all_ignores_unregistered_vars() {
        let store = store("log_");
        let stray = ContextVar::new("log_stray");
        let _ = stray.set(json!(1));

        assert!(store.read_all().is_empty());
    }

    #[test]
    fn test_set_many_repeated_key_last_wins() {
        let store = store("log_");
        let tokens = store.set_many([("a", json!(1)), ("a", json!(2))]);

        assert_eq!(tokens.len(), 1);
        assert_eq!(store.get("a"), Some(json!(2)));

        store.reset_many(tokens).unwrap();
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn test_set_many_repeated_key_restores_prior_value() {
        let store = store("log_");
        let _ = store.set_many([("a", json!("before"))]);

        let tokens = store.set_many([("a", json!(1)), ("a", json!(2))]);
        store.reset_many(tokens).unwrap();

        assert_eq!(store.get("a"), Some(json!("before")));
    }

    #[test]
    fn test_unset_many_skips_unknown_keys() {
        let store = store("log_");
        store.unset_many(["never_set"]);

        assert!(!store.registry().contains("log_never_set"));
    }

    #[test]
    fn test_reset_many_unknown_variable() {
        let registry = Arc::new(VariableRegistry::new());
        let log = PrefixedStore::with_registry("log_", registry.clone());
        let other = PrefixedStore::with_registry("other_", registry);

        let tokens = log.set_many([("a", json!(1))]);
        let err = other.reset_many(tokens).unwrap_err();

        assert_eq!(err, UnknownVariableError::new("other_a"));
    }

    #[test]
    fn test_clear_all_only_touches_prefix() {
        let registry = Arc::new(VariableRegistry::new());
        let log = PrefixedStore::with_registry("log_", registry.clone());
        let task = PrefixedStore::with_registry("task_", registry);

        let _ = log.set_many([("a", json!(1)), ("b", json!(2))]);
        let _ = task.set_many([("c", json!(3))]);
        log.clear_all();

        assert!(log.read_all().is_empty());
        assert_eq!(task.get("c"), Some(json!(3)));
    }
}
