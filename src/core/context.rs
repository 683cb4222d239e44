// ============================================================================
// spark-observe - Observation Context
// Thread-local state: active-subscriber stack and engine-wide switches
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::types::Subscriber;

// =============================================================================
// OBSERVE CONTEXT
// =============================================================================

/// Thread-local context holding all global state for the engine.
///
/// There is at most one active subscriber per thread at any moment. Activation
/// is an explicit stack so nested computations restore their parent on exit; a
/// stack entry may also be `None`, which suspends collection entirely for the
/// region (used around code that must read without registering anything).
pub struct ObserveContext {
    // =========================================================================
    // SUBSCRIBER TRACKING
    // =========================================================================
    /// Activation stack; the top entry is the currently collecting subscriber
    pub subscriber_stack: RefCell<Vec<Option<Weak<dyn Subscriber>>>>,

    // =========================================================================
    // ENGINE SWITCHES
    // =========================================================================
    /// Whether `observe` may wrap new containers
    pub should_observe: Cell<bool>,

    /// Whether the process runs in non-interactive (server-rendering) mode,
    /// where wrapping is skipped because nothing will ever be notified
    pub server_rendering: Cell<bool>,

    // =========================================================================
    // COUNTERS
    // =========================================================================
    /// Monotonic id source for dependencies
    pub next_dep_id: Cell<u64>,
}

impl ObserveContext {
    /// Create a new context with default values
    pub fn new() -> Self {
        Self {
            subscriber_stack: RefCell::new(Vec::new()),
            should_observe: Cell::new(true),
            server_rendering: Cell::new(false),
            next_dep_id: Cell::new(0),
        }
    }

    // =========================================================================
    // SUBSCRIBER TRACKING
    // =========================================================================

    /// Push a subscriber activation (or `None` to suspend collection)
    pub fn push_subscriber(&self, subscriber: Option<Weak<dyn Subscriber>>) {
        self.subscriber_stack.borrow_mut().push(subscriber);
    }

    /// Pop the top activation, returning it (`None` if the stack was empty)
    pub fn pop_subscriber(&self) -> Option<Option<Weak<dyn Subscriber>>> {
        self.subscriber_stack.borrow_mut().pop()
    }

    /// Get the currently collecting subscriber, if any and still alive
    pub fn active_subscriber(&self) -> Option<Rc<dyn Subscriber>> {
        self.subscriber_stack
            .borrow()
            .last()
            .cloned()
            .flatten()
            .and_then(|weak| weak.upgrade())
    }

    /// Check whether a live subscriber is currently collecting
    pub fn has_active_subscriber(&self) -> bool {
        self.active_subscriber().is_some()
    }

    /// Current activation depth
    pub fn subscriber_depth(&self) -> usize {
        self.subscriber_stack.borrow().len()
    }

    // =========================================================================
    // ENGINE SWITCHES
    // =========================================================================

    /// Set the wrap gate, returning the previous value
    pub fn set_should_observe(&self, value: bool) -> bool {
        self.should_observe.replace(value)
    }

    /// Check whether `observe` may wrap new containers
    pub fn is_observing(&self) -> bool {
        self.should_observe.get()
    }

    /// Set server-rendering mode, returning the previous value
    pub fn set_server_rendering(&self, value: bool) -> bool {
        self.server_rendering.replace(value)
    }

    /// Check whether the process is in server-rendering mode
    pub fn is_server_rendering(&self) -> bool {
        self.server_rendering.get()
    }

    // =========================================================================
    // COUNTERS
    // =========================================================================

    /// Claim the next dependency id
    pub fn next_dep_id(&self) -> u64 {
        let id = self.next_dep_id.get();
        self.next_dep_id.set(id + 1);
        id
    }
}

impl Default for ObserveContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    /// The thread-local observation context
    static CONTEXT: ObserveContext = ObserveContext::new();
}

/// Access the thread-local observation context.
///
/// # Example
///
/// ```ignore
/// with_context(|ctx| {
///     ctx.set_should_observe(false);
/// });
/// ```
pub fn with_context<R>(f: impl FnOnce(&ObserveContext) -> R) -> R {
    CONTEXT.with(f)
}

// =============================================================================
// SUBSCRIBER ACTIVATION
// =============================================================================

/// Push a subscriber activation. `None` suspends collection for the region.
///
/// Prefer the scoped [`with_subscriber`] / [`untracked`] forms, which restore
/// the stack even on unwind; the raw push/pop pair exists for collaborators
/// whose read phase does not fit a closure.
pub fn push_subscriber(subscriber: Option<Rc<dyn Subscriber>>) {
    with_context(|ctx| ctx.push_subscriber(subscriber.map(|s| Rc::downgrade(&s))));
}

/// Pop the most recent subscriber activation.
pub fn pop_subscriber() {
    with_context(|ctx| {
        ctx.pop_subscriber();
    });
}

/// Get the currently collecting subscriber, if any.
pub fn active_subscriber() -> Option<Rc<dyn Subscriber>> {
    with_context(|ctx| ctx.active_subscriber())
}

/// Check whether a live subscriber is currently collecting.
pub fn has_active_subscriber() -> bool {
    with_context(|ctx| ctx.has_active_subscriber())
}

/// Restores the activation stack on drop, including on unwind.
struct ActivationGuard;

impl Drop for ActivationGuard {
    fn drop(&mut self) {
        pop_subscriber();
    }
}

/// Run `f` with `subscriber` as the active subscriber.
///
/// Every tracked property read inside `f` registers `subscriber` with that
/// property's dependency. The previous activation is restored afterwards.
///
/// # Example
///
/// ```
/// use std::any::Any;
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use spark_observe::{obj, observe, with_subscriber, Subscriber, Value};
///
/// struct Watcher {
///     runs: Cell<u32>,
/// }
///
/// impl Subscriber for Watcher {
///     fn update(&self) {
///         self.runs.set(self.runs.get() + 1);
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
///
/// let state = obj! { "count" => 0 };
/// observe(&state, false);
///
/// let watcher = Rc::new(Watcher { runs: Cell::new(0) });
/// let map = state.as_obj().unwrap();
/// with_subscriber(watcher.clone(), || {
///     map.get("count");
/// });
///
/// map.set("count", Value::Int(1));
/// assert_eq!(watcher.runs.get(), 1);
/// ```
pub fn with_subscriber<R>(subscriber: Rc<dyn Subscriber>, f: impl FnOnce() -> R) -> R {
    push_subscriber(Some(subscriber));
    let _guard = ActivationGuard;
    f()
}

/// Run `f` with collection suspended: reads inside register nothing, even when
/// an outer subscriber is active.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    push_subscriber(None);
    let _guard = ActivationGuard;
    f()
}

// =============================================================================
// OBSERVATION TOGGLE
// =============================================================================

/// Globally enable or disable wrapping of new containers by
/// [`observe`](crate::observe). Containers that already carry an observer are
/// unaffected.
pub fn toggle_observing(enabled: bool) {
    with_context(|ctx| {
        ctx.set_should_observe(enabled);
    });
}

/// Check whether wrapping is currently enabled.
pub fn is_observing() -> bool {
    with_context(|ctx| ctx.is_observing())
}

/// Restores the wrap gate on drop, including on unwind.
struct ObservingGuard {
    previous: bool,
}

impl Drop for ObservingGuard {
    fn drop(&mut self) {
        with_context(|ctx| {
            ctx.set_should_observe(self.previous);
        });
    }
}

/// Run `f` with wrapping disabled, restoring the previous state afterwards.
///
/// This is the paired form of [`toggle_observing`]; nested calls compose.
pub fn without_observing<R>(f: impl FnOnce() -> R) -> R {
    let previous = with_context(|ctx| ctx.set_should_observe(false));
    let _guard = ObservingGuard { previous };
    f()
}

// =============================================================================
// SERVER-RENDERING MODE
// =============================================================================

/// Mark the process as running a non-interactive (server-rendering) pass.
/// While set, [`observe`](crate::observe) wraps nothing new.
pub fn set_server_rendering(enabled: bool) {
    with_context(|ctx| {
        ctx.set_server_rendering(enabled);
    });
}

/// Check whether server-rendering mode is set.
pub fn is_server_rendering() -> bool {
    with_context(|ctx| ctx.is_server_rendering())
}

// =============================================================================
// TESTS
// =============================================================================
