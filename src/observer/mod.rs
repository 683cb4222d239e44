// ============================================================================
// spark-observe - Observer
// Wraps containers so every field becomes a tracked property
// ============================================================================

use std::cell::Cell;
use std::rc::Rc;

use tracing::trace;

use crate::core::context::with_context;
use crate::core::dep::Dep;
use crate::value::{Arr, Obj, Value};

pub mod mutate;
pub mod reactive;

pub use mutate::{del, set, Key};
pub use reactive::define_reactive;

// =============================================================================
// OBSERVER
// =============================================================================

/// The wrap marker attached to an observed container.
///
/// Carries the container-level dependency, notified on structural changes
/// (key addition/removal, sequence mutation), and the count of component
/// instances using the container as root state. The container's marker slot
/// owns the Observer, so its lifetime equals the wrapped value's.
pub struct Observer {
    /// Structural dependency of the wrapped container
    dep: Rc<Dep>,

    /// Root-state consumers; guarded against `set`/`del`
    root_count: Cell<u32>,
}

impl Observer {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            dep: Dep::new(),
            root_count: Cell::new(0),
        })
    }

    /// Register the active subscriber with the structural dependency.
    pub(crate) fn depend(&self) {
        self.dep.depend();
    }

    /// Notify the structural dependency.
    pub(crate) fn notify(&self) {
        self.dep.notify();
    }

    /// Number of component instances holding this container as root state.
    pub fn root_count(&self) -> u32 {
        self.root_count.get()
    }

    pub(crate) fn add_root(&self) {
        self.root_count.set(self.root_count.get() + 1);
    }

    /// Drop one root-state consumer. Saturates at zero.
    pub fn release_root(&self) {
        self.root_count.set(self.root_count.get().saturating_sub(1));
    }
}

// =============================================================================
// OBSERVE
// =============================================================================

/// Attach (or fetch) the Observer for a container.
///
/// Returns `None` for non-containers. A container that already carries an
/// Observer returns it unchanged, before any gate is consulted. Otherwise a
/// new Observer is installed only when observation is enabled, the process is
/// not server-rendering, the container is extensible, and the map is not a
/// component-instance root.
///
/// With `as_root_data`, the returned Observer's root count is incremented;
/// pair it with [`Observer::release_root`] on teardown.
///
/// # Example
///
/// ```
/// use spark_observe::{obj, observe, without_observing};
///
/// let state = obj! { "ready" => false };
/// let first = observe(&state, false).unwrap();
/// let second = observe(&state, false).unwrap();
/// assert!(std::rc::Rc::ptr_eq(&first, &second));
///
/// let gated = obj! {};
/// assert!(without_observing(|| observe(&gated, false)).is_none());
/// ```
pub fn observe(value: &Value, as_root_data: bool) -> Option<Rc<Observer>> {
    let observer = match value {
        Value::Obj(map) => observe_map(map),
        Value::Arr(seq) => observe_seq(seq),
        _ => None,
    };
    if as_root_data {
        if let Some(observer) = &observer {
            observer.add_root();
        }
    }
    observer
}

fn observe_map(map: &Obj) -> Option<Rc<Observer>> {
    if let Some(existing) = map.observer() {
        return Some(existing);
    }
    if !wrap_permitted() || !map.is_extensible() || map.is_instance_root() {
        return None;
    }
    let observer = Observer::new();
    // Marker goes in before the walk so cyclic graphs memoize on re-entry
    map.set_observer(observer.clone());
    walk(map);
    trace!(target: "spark_observe", keys = map.len(), "wrapped map");
    Some(observer)
}

fn observe_seq(seq: &Arr) -> Option<Rc<Observer>> {
    if let Some(existing) = seq.observer() {
        return Some(existing);
    }
    if !wrap_permitted() || !seq.is_extensible() {
        return None;
    }
    let observer = Observer::new();
    seq.set_observer(observer.clone());
    observe_items(seq);
    trace!(target: "spark_observe", len = seq.len(), "wrapped sequence");
    Some(observer)
}

fn wrap_permitted() -> bool {
    with_context(|ctx| ctx.is_observing() && !ctx.is_server_rendering())
}

/// Install the tracked protocol on every current key.
fn walk(map: &Obj) {
    for key in map.keys() {
        define_reactive(map, &key, None, None, false);
    }
}

/// Observe every current element.
fn observe_items(seq: &Arr) {
    for item in seq.snapshot() {
        observe(&item, false);
    }
}

/// Register the active subscriber with every element Observer, recursing
/// through nested sequences. Element observers cannot be reached through a
/// tracked accessor, so sequence-valued reads collect them explicitly.
pub(crate) fn depend_array(seq: &Arr) {
    for item in seq.snapshot() {
        if let Some(observer) = item.observer() {
            observer.depend();
        }
        if let Value::Arr(nested) = &item {
            depend_array(nested);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
