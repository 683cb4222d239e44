// ============================================================================
// spark-observe - Dependency Registry
// Identity-bearing subscriber sets with snapshot-based notification
// ============================================================================

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::context::{active_subscriber, with_context};
use super::types::Subscriber;

// =============================================================================
// DEP
// =============================================================================

/// A dependency: the registry of subscribers interested in one tracked thing.
///
/// Every tracked property owns one `Dep`; every observed container owns one
/// more for structural changes. Reading the property while a subscriber is
/// active registers that subscriber here ([`depend`]); writing the property
/// re-runs everything registered ([`notify`]).
///
/// The subscriber list is insertion-ordered with duplicate suppression by
/// pointer identity, and holds only weak references: dropping a subscriber
/// unregisters it everywhere at once.
///
/// [`depend`]: Dep::depend
/// [`notify`]: Dep::notify
pub struct Dep {
    /// Monotonic identifier, unique per thread
    id: u64,

    /// Registered subscribers, in registration order (weak refs, embedder owns)
    subs: RefCell<Vec<Weak<dyn Subscriber>>>,

    /// Weak reference to self (set after Rc creation), handed to the
    /// subscriber's `add_dep` bookkeeping hook
    self_weak: RefCell<Weak<Dep>>,
}

impl Dep {
    /// Create a new, empty dependency.
    pub fn new() -> Rc<Dep> {
        let dep = Rc::new(Dep {
            id: with_context(|ctx| ctx.next_dep_id()),
            subs: RefCell::new(Vec::new()),
            self_weak: RefCell::new(Weak::new()),
        });

        // Store weak self-reference
        *dep.self_weak.borrow_mut() = Rc::downgrade(&dep);

        dep
    }

    /// This dependency's identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of live subscribers currently registered.
    pub fn sub_count(&self) -> usize {
        self.subs
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Register `sub` directly, without duplicate suppression.
    ///
    /// External watchers that manage their own registration use this together
    /// with [`remove_sub`](Dep::remove_sub); everything inside the engine goes
    /// through [`depend`](Dep::depend).
    pub fn add_sub(&self, sub: Weak<dyn Subscriber>) {
        self.subs.borrow_mut().push(sub);
    }

    /// Unregister `sub`, comparing by pointer identity. Dead entries are
    /// dropped along the way.
    pub fn remove_sub(&self, sub: &Rc<dyn Subscriber>) {
        let sub_ptr = Rc::as_ptr(sub) as *const ();
        self.subs.borrow_mut().retain(|weak| {
            if let Some(rc) = weak.upgrade() {
                Rc::as_ptr(&rc) as *const () != sub_ptr
            } else {
                false
            }
        });
    }

    /// Register the currently active subscriber with this dependency.
    ///
    /// No-op when no subscriber is active. A subscriber already present in the
    /// set is not added again, so one computation reading one property many
    /// times registers exactly once. On first registration the subscriber's
    /// [`add_dep`](Subscriber::add_dep) hook is informed.
    pub fn depend(&self) {
        let Some(target) = active_subscriber() else {
            return;
        };

        let target_ptr = Rc::as_ptr(&target) as *const ();
        let already_registered = self.subs.borrow().iter().any(|weak| {
            weak.upgrade()
                .is_some_and(|rc| Rc::as_ptr(&rc) as *const () == target_ptr)
        });
        if already_registered {
            return;
        }

        self.subs.borrow_mut().push(Rc::downgrade(&target));

        // Inform the subscriber outside any internal borrow; its hook may
        // re-enter this dep.
        if let Some(this) = self.self_weak.borrow().upgrade() {
            target.add_dep(&this);
        }
    }

    /// Re-run every registered subscriber, in registration order.
    ///
    /// The live list is snapshotted first, so subscribers may register,
    /// unregister or drop other subscribers (or themselves) while running
    /// without affecting this pass. Dead entries are pruned as a side effect.
    pub fn notify(&self) {
        self.subs.borrow_mut().retain(|weak| weak.strong_count() > 0);

        let snapshot: Vec<Rc<dyn Subscriber>> = self
            .subs
            .borrow()
            .iter()
            .filter_map(|weak| weak.upgrade())
            .collect();

        for sub in snapshot {
            sub.update();
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
