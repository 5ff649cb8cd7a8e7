//! The current unit of work.
//!
//! A single context-local slot holding whatever record the orchestrator is
//! executing right now (a graph node, a job, a request). Unlike the prefixed
//! store it has no namespacing, no tokens and no history: each set simply
//! overwrites the slot in the current context.

use crate::context::{with_current, with_current_mut, CurrentUnit};
use std::any::Any;
use std::sync::Arc;

/// Sets the current unit, or clears it with `None`.
pub fn set_current_unit<T: Any + Send + Sync>(unit: Option<Arc<T>>) {
    let unit = unit.map(|unit| unit as CurrentUnit);
    replace_current_unit(unit);
}

/// Clears the current unit.
pub fn clear_current_unit() {
    replace_current_unit(None);
}

// The displaced unit is dropped only after the context borrow is released,
// so its `Drop` may read the current context.
fn replace_current_unit(unit: Option<CurrentUnit>) {
    let previous = with_current_mut(|ctx| ctx.replace_current_unit(unit));
    drop(previous);
}

/// Returns the current unit if one is set and it is a `T`.
///
/// The returned `Arc` points at the same allocation that was passed to
/// [`set_current_unit`].
#[must_use]
pub fn get_current_unit<T: Any + Send + Sync>() -> Option<Arc<T>> {
    current_unit_any()?.downcast::<T>().ok()
}

/// Returns the current unit without checking its type.
#[must_use]
pub fn current_unit_any() -> Option<CurrentUnit> {
    with_current(crate::context::ExecutionContext::current_unit)
}
