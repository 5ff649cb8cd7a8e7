//! Context variables and the tokens that undo their writes.

use super::execution::{with_current, with_current_mut};
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_VAR_ID: AtomicU64 = AtomicU64::new(1);

struct VarInner {
    id: u64,
    name: String,
}

/// A named variable whose value lives in the current [`ExecutionContext`].
///
/// The handle itself is shared process-wide and cheap to clone; only the
/// value differs between contexts. A variable that has never been set in a
/// context, or has been unset there, reads as `None`. `Some(Value::Null)` is
/// a real value.
///
/// [`ExecutionContext`]: super::ExecutionContext
#[derive(Clone)]
pub struct ContextVar {
    inner: Arc<VarInner>,
}

impl ContextVar {
    /// Creates a new variable with a fresh identity.
    ///
    /// Two variables created with the same name are still distinct; use the
    /// [`VariableRegistry`](super::VariableRegistry) to share one per name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(VarInner {
                id: NEXT_VAR_ID.fetch_add(1, Ordering::Relaxed),
                name: name.into(),
            }),
        }
    }

    /// Returns the process-unique id of this variable.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Returns the variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the value in the current context, if set.
    #[must_use]
    pub fn get(&self) -> Option<Value> {
        with_current(|ctx| ctx.get(self))
    }

    /// Returns true if the variable holds a value in the current context.
    #[must_use]
    pub fn is_set(&self) -> bool {
        with_current(|ctx| ctx.contains(self))
    }

    /// Sets the value in the current context.
    ///
    /// The returned token restores whatever the variable held just before
    /// this call.
    pub fn set(&self, value: Value) -> Token {
        let previous = with_current_mut(|ctx| ctx.insert(self.clone(), value));
        Token {
            var: self.clone(),
            previous,
        }
    }

    /// Marks the variable as not set in the current context.
    pub fn unset(&self) {
        with_current_mut(|ctx| {
            ctx.remove(self);
        });
    }

    /// Restores the value captured by `token`.
    ///
    /// Tokens must be reset in reverse order of the sets that produced them.
    /// Resetting a token issued by another variable or in an unrelated
    /// context leaves the variable in an unspecified state; debug builds
    /// panic on a token from another variable.
    pub fn reset(&self, token: Token) {
        debug_assert_eq!(
            &token.var, self,
            "token was issued by a different context variable"
        );
        match token.previous {
            Some(value) => {
                with_current_mut(|ctx| ctx.insert(self.clone(), value));
            }
            None => self.unset(),
        }
    }
}

impl PartialEq for ContextVar {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ContextVar {}

impl Hash for ContextVar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for ContextVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextVar")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

/// Handle for undoing exactly one [`ContextVar::set`].
///
/// Tokens are consumed by [`ContextVar::reset`] and cannot be cloned, so a
/// token can be reset at most once.
#[derive(Debug)]
pub struct Token {
    var: ContextVar,
    previous: Option<Value>,
}

impl Token {
    /// Returns the variable that issued this token.
    #[must_use]
    pub fn var(&self) -> &ContextVar {
        &self.var
    }

    /// Returns the value the variable held before the set, if any.
    #[must_use]
    pub fn previous(&self) -> Option<&Value> {
        self.previous.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unset_by_default() {
        let var = ContextVar::new("log_fresh");
        assert_eq!(var.get(), None);
        assert!(!var.is_set());
    }

    #[test]
    fn test_set_and_get() {
        let var = ContextVar::new("log_a");
        let _ = var.set(json!("value"));

        assert_eq!(var.get(), Some(json!("value")));
        assert!(var.is_set());
    }

    #[test]
    fn test_null_is_a_value() {
        let var = ContextVar::new("log_nullable");
        let _ = var.set(Value::Null);

        assert_eq!(var.get(), Some(Value::Null));
    }

    #[test]
    fn test_reset_is_lifo() {
        let var = ContextVar::new("log_stack");
        let first = var.set(json!(1));
        let second = var.set(json!(2));
        assert_eq!(second.previous(), Some(&json!(1)));

        var.reset(second);
        assert_eq!(var.get(), Some(json!(1)));

        var.reset(first);
        assert_eq!(var.get(), None);
    }

    #[test]
    fn test_unset() {
        let var = ContextVar::new("log_gone");
        let _ = var.set(json!(true));
        var.unset();
        var.unset();

        assert_eq!(var.get(), None);
    }

    #[test]
    fn test_same_name_distinct_identity() {
        let a = ContextVar::new("log_dup");
        let b = ContextVar::new("log_dup");
        assert_ne!(a, b);

        let _ = a.set(json!("a"));
        assert_eq!(b.get(), None);
    }

    #[test]
    fn test_token_var() {
        let var = ContextVar::new("log_tok");
        let token = var.set(json!(0));
        assert_eq!(token.var(), &var);
        assert_eq!(token.previous(), None);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "token was issued by a different context variable")]
    fn test_reset_with_foreign_token_panics() {
        let a = ContextVar::new("log_owner");
        let b = ContextVar::new("log_other");
        let token = a.set(json!(1));
        b.reset(token);
    }
}
