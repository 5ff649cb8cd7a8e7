//! Execution contexts and the thread-local current context.
//!
//! An [`ExecutionContext`] is a copy-on-write map from variable to value plus
//! the current-unit slot. Every OS thread has one current context. Threads and
//! async tasks get their own lineage by branching a copy of their parent's
//! context with [`spawn_thread`], [`spawn`] or [`ContextFutureExt`].

use super::ContextVar;
use serde_json::Value;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Opaque reference held by the current-unit slot.
pub type CurrentUnit = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
struct Entry {
    var: ContextVar,
    value: Value,
}

/// A snapshot of context-local state.
///
/// Cloning is cheap and the clone is fully isolated: the first write on
/// either side copies the underlying map.
#[derive(Clone, Default)]
pub struct ExecutionContext {
    vars: Arc<HashMap<u64, Entry>>,
    current_unit: Option<CurrentUnit>,
}

impl ExecutionContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `var` in this context.
    #[must_use]
    pub fn get(&self, var: &ContextVar) -> Option<Value> {
        self.vars.get(&var.id()).map(|entry| entry.value.clone())
    }

    /// Returns true if `var` holds a value in this context.
    #[must_use]
    pub fn contains(&self, var: &ContextVar) -> bool {
        self.vars.contains_key(&var.id())
    }

    /// Returns the number of variables holding a value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns true if no variable holds a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterates over the variables holding a value, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&ContextVar, &Value)> {
        self.vars.values().map(|entry| (&entry.var, &entry.value))
    }

    /// Returns the current-unit slot.
    #[must_use]
    pub fn current_unit(&self) -> Option<CurrentUnit> {
        self.current_unit.clone()
    }

    pub(crate) fn insert(&mut self, var: ContextVar, value: Value) -> Option<Value> {
        Arc::make_mut(&mut self.vars)
            .insert(var.id(), Entry { var, value })
            .map(|entry| entry.value)
    }

    pub(crate) fn remove(&mut self, var: &ContextVar) -> Option<Value> {
        if !self.contains(var) {
            return None;
        }
        Arc::make_mut(&mut self.vars)
            .remove(&var.id())
            .map(|entry| entry.value)
    }

    pub(crate) fn replace_current_unit(
        &mut self,
        unit: Option<CurrentUnit>,
    ) -> Option<CurrentUnit> {
        std::mem::replace(&mut self.current_unit, unit)
    }

    /// Runs `f` with this context installed as the current one.
    ///
    /// Writes made by `f` land in `self`. The caller's context is reinstated
    /// afterwards, also when `f` panics.
    pub fn run<R>(&mut self, f: impl FnOnce() -> R) -> R {
        let _swap = ContextSwap::enter(self);
        f()
    }

    /// Wraps `future` so that it always runs inside this context.
    pub fn scope<F: Future>(self, future: F) -> ContextFuture<F> {
        ContextFuture {
            inner: Some(Box::pin(future)),
            context: self,
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field(
                "vars",
                &self
                    .vars
                    .values()
                    .map(|entry| (entry.var.name(), &entry.value))
                    .collect::<Vec<_>>(),
            )
            .field("has_current_unit", &self.current_unit.is_some())
            .finish()
    }
}

thread_local! {
    static CURRENT: RefCell<ExecutionContext> = RefCell::new(ExecutionContext::new());
}

// Callers must not re-enter the store from inside `f`.
pub(crate) fn with_current<R>(f: impl FnOnce(&ExecutionContext) -> R) -> R {
    CURRENT.with(|current| f(&current.borrow()))
}

pub(crate) fn with_current_mut<R>(f: impl FnOnce(&mut ExecutionContext) -> R) -> R {
    CURRENT.with(|current| f(&mut current.borrow_mut()))
}

fn replace_current(context: ExecutionContext) -> ExecutionContext {
    CURRENT.with(|current| current.replace(context))
}

/// Returns a copy of the current context.
#[must_use]
pub fn copy_context() -> ExecutionContext {
    with_current(Clone::clone)
}

/// Installs a context for the lifetime of the guard and writes the final
/// state back into the slot it came from.
struct ContextSwap<'a> {
    slot: &'a mut ExecutionContext,
    previous: Option<ExecutionContext>,
}

impl<'a> ContextSwap<'a> {
    fn enter(slot: &'a mut ExecutionContext) -> Self {
        let previous = replace_current(std::mem::take(slot));
        Self {
            slot,
            previous: Some(previous),
        }
    }
}

impl Drop for ContextSwap<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *self.slot = replace_current(previous);
        }
    }
}

/// A future that runs inside its own [`ExecutionContext`].
///
/// The context is installed around every poll and around the drop of the
/// inner future, so scope guards held across an await point restore into
/// the right context even when the future is cancelled.
pub struct ContextFuture<F> {
    inner: Option<Pin<Box<F>>>,
    context: ExecutionContext,
}

impl<F> ContextFuture<F> {
    /// Returns the context this future runs in.
    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }
}

impl<F: Future> Future for ContextFuture<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let Some(inner) = this.inner.as_mut() else {
            unreachable!("inner future is only taken on drop");
        };
        let _swap = ContextSwap::enter(&mut this.context);
        inner.as_mut().poll(cx)
    }
}

impl<F> Drop for ContextFuture<F> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            let _swap = ContextSwap::enter(&mut self.context);
            drop(inner);
        }
    }
}

impl<F> fmt::Debug for ContextFuture<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextFuture")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Extension trait for binding futures to an execution context.
pub trait ContextFutureExt: Future + Sized {
    /// Runs this future inside `context`.
    fn in_context(self, context: ExecutionContext) -> ContextFuture<Self> {
        context.scope(self)
    }

    /// Runs this future inside a copy of the current context.
    fn in_current_context(self) -> ContextFuture<Self> {
        copy_context().scope(self)
    }
}

impl<F: Future> ContextFutureExt for F {}

/// Spawns a tokio task that inherits a copy of the current context.
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(future.in_current_context())
}

/// Spawns an OS thread that inherits a copy of the current context.
pub fn spawn_thread<F, T>(f: F) -> std::thread::JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let mut context = copy_context();
    std::thread::spawn(move || context.run(f))
}
