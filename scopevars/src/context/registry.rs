//! Process-wide registry of named context variables.

use super::ContextVar;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Lazily populated table of context variables, one per name.
///
/// Entries are never removed. Only values are cleared, and those live in the
/// execution contexts, not here.
#[derive(Default)]
pub struct VariableRegistry {
    vars: DashMap<String, ContextVar>,
}

impl VariableRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the variable registered under `name`, creating it on first use.
    ///
    /// Racing first uses of the same name all receive the same variable.
    pub fn get_or_create(&self, name: &str) -> ContextVar {
        if let Some(var) = self.vars.get(name) {
            return var.value().clone();
        }

        let mut created = false;
        let var = self
            .vars
            .entry(name.to_string())
            .or_insert_with(|| {
                created = true;
                ContextVar::new(name)
            })
            .value()
            .clone();

        if created {
            debug!(name, id = var.id(), "Registered context variable");
        }
        var
    }

    /// Returns the variable registered under `name` without creating it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ContextVar> {
        self.vars.get(name).map(|var| var.value().clone())
    }

    /// Checks if a variable is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Checks if `var` is the variable this registry holds for its name.
    #[must_use]
    pub fn owns(&self, var: &ContextVar) -> bool {
        self.vars
            .get(var.name())
            .is_some_and(|registered| registered.value() == var)
    }

    /// Returns the number of registered variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns true if nothing has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Returns all registered names.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.vars.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl std::fmt::Debug for VariableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableRegistry")
            .field("var_count", &self.vars.len())
            .finish()
    }
}

static GLOBAL_REGISTRY: OnceLock<Arc<VariableRegistry>> = OnceLock::new();

/// Gets the global variable registry.
pub fn variable_registry() -> Arc<VariableRegistry> {
    GLOBAL_REGISTRY
        .get_or_init(|| Arc::new(VariableRegistry::new()))
        .clone()
}
