// ============================================================================
// spark-observe - Subscriber Contract
// Type-erased interface between dependencies and external computations
// ============================================================================

use std::any::Any;
use std::rc::Rc;

use super::dep::Dep;

// =============================================================================
// SUBSCRIBER TRAIT
// =============================================================================

/// A computation that can be registered with a [`Dep`] and re-run on writes.
///
/// The engine never creates subscribers. Watchers, render computations and
/// schedulers live outside this crate; they implement this trait, activate
/// themselves around their read phase (see
/// [`with_subscriber`](crate::with_subscriber)), and get [`update`]d when a
/// tracked property they read is written.
///
/// Dependencies hold subscribers as `Weak<dyn Subscriber>`, so the embedder
/// keeps ownership. A dropped subscriber is pruned from registries on the
/// next notification.
///
/// [`update`]: Subscriber::update
///
/// # Example
///
/// ```
/// use std::any::Any;
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use spark_observe::{Dep, Subscriber};
///
/// struct Counter {
///     runs: Cell<u32>,
/// }
///
/// impl Subscriber for Counter {
///     fn update(&self) {
///         self.runs.set(self.runs.get() + 1);
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
///
/// let watcher = Rc::new(Counter { runs: Cell::new(0) });
/// let dep = Dep::new();
/// dep.add_sub(Rc::downgrade(&(watcher.clone() as Rc<dyn Subscriber>)));
/// dep.notify();
/// assert_eq!(watcher.runs.get(), 1);
/// ```
pub trait Subscriber: Any {
    /// Re-run this computation. Invoked synchronously by [`Dep::notify`].
    fn update(&self);

    /// Bookkeeping hook invoked the first time this subscriber is registered
    /// with a dependency during [`Dep::depend`]. Watchers use it to remember
    /// which dependencies to detach from on teardown. Default: no-op.
    fn add_dep(&self, _dep: &Rc<Dep>) {}

    /// Downcasting support for embedders.
    fn as_any(&self) -> &dyn Any;
}

// =============================================================================
// TESTS
// =============================================================================
