// ============================================================================
// spark-observe - Reactive Maps
// An insertion-ordered, string-keyed map with per-property dependencies
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::core::context::{has_active_subscriber, untracked};
use crate::core::dep::Dep;
use crate::observer::{depend_array, observe, Observer};
use crate::value::Value;

/// User-supplied property getter.
pub type PropGetter = Rc<dyn Fn() -> Value>;

/// User-supplied property setter.
pub type PropSetter = Rc<dyn Fn(Value)>;

/// Hook invoked on every accepted reactive write, before the value is stored.
pub type WriteHook = Rc<dyn Fn()>;

/// Error from the property-descriptor operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    #[error("property \"{0}\" is not configurable")]
    NotConfigurable(Rc<str>),
    #[error("cannot define \"{0}\": map is not extensible")]
    NotExtensible(Rc<str>),
}

// =============================================================================
// PROPERTY SLOT
// =============================================================================

/// Backing cell for one property.
///
/// Every read and write of a key goes through its slot. A slot keeps the same
/// `Dep` for its whole life, so re-installing the tracked machinery never
/// loses subscribers.
pub(crate) struct PropSlot {
    /// Raw stored value (backing store behind any accessor pair)
    pub(crate) value: RefCell<Value>,

    /// User-supplied accessor pair, honored by both plain and tracked slots
    pub(crate) getter: RefCell<Option<PropGetter>>,
    pub(crate) setter: RefCell<Option<PropSetter>>,

    /// Per-property dependency, allocated once and never replaced
    pub(crate) dep: Rc<Dep>,

    /// Observer of the current child value, refreshed on accepted writes
    pub(crate) child_ob: RefCell<Option<Rc<Observer>>>,

    /// Write hook, invoked after the short-circuit check
    pub(crate) on_write: RefCell<Option<WriteHook>>,

    /// Skip child observation on this slot
    pub(crate) shallow: Cell<bool>,

    /// Whether the tracked read/write protocol is installed
    pub(crate) reactive: Cell<bool>,

    /// Whether the slot may be redefined or removed
    pub(crate) configurable: Cell<bool>,
}

impl PropSlot {
    pub(crate) fn new_plain(value: Value) -> Rc<Self> {
        Rc::new(Self {
            value: RefCell::new(value),
            getter: RefCell::new(None),
            setter: RefCell::new(None),
            dep: Dep::new(),
            child_ob: RefCell::new(None),
            on_write: RefCell::new(None),
            shallow: Cell::new(false),
            reactive: Cell::new(false),
            configurable: Cell::new(true),
        })
    }

    /// Current value through the accessor pair, without tracking.
    pub(crate) fn raw_value(&self) -> Value {
        let getter = self.getter.borrow().clone();
        match getter {
            Some(getter) => getter(),
            None => self.value.borrow().clone(),
        }
    }

    /// Read the slot. Tracked slots register the active subscriber with the
    /// slot's dependency, the child Observer, and (for sequences) every
    /// element Observer.
    pub(crate) fn read(&self) -> Value {
        let value = self.raw_value();
        if self.reactive.get() && has_active_subscriber() {
            self.dep.depend();
            let child = self.child_ob.borrow().clone();
            if let Some(child) = child {
                child.depend();
                if let Value::Arr(items) = &value {
                    depend_array(items);
                }
            }
        }
        value
    }

    /// Write the slot.
    ///
    /// Tracked slots short-circuit on [`Value::same`], run the write hook,
    /// ignore getter-only writes, refresh the child Observer and notify.
    /// Plain slots store silently, still honoring accessor pairs.
    pub(crate) fn write(&self, new: Value) {
        let getter = self.getter.borrow().clone();
        let setter = self.setter.borrow().clone();

        if !self.reactive.get() {
            if let Some(setter) = setter {
                setter(new);
            } else if getter.is_none() {
                *self.value.borrow_mut() = new;
            }
            return;
        }

        let current = match &getter {
            Some(getter) => getter(),
            None => self.value.borrow().clone(),
        };
        if new.same(&current) {
            return;
        }
        let hook = self.on_write.borrow().clone();
        if let Some(hook) = hook {
            hook();
        }
        if getter.is_some() && setter.is_none() {
            return;
        }
        match setter {
            Some(setter) => setter(new.clone()),
            None => *self.value.borrow_mut() = new.clone(),
        }
        *self.child_ob.borrow_mut() = if self.shallow.get() {
            None
        } else {
            observe(&new, false)
        };
        self.dep.notify();
    }
}

// =============================================================================
// OBJ
// =============================================================================

struct ObjData {
    /// Property slots in insertion order
    entries: RefCell<Vec<(Rc<str>, Rc<PropSlot>)>>,

    /// Observer marker, installed by `observe`
    observer: RefCell<Option<Rc<Observer>>>,

    /// Whether new properties may be defined
    extensible: Cell<bool>,

    /// Component-instance marker; instance roots are never wrapped
    instance_root: Cell<bool>,
}

/// An insertion-ordered, string-keyed map of [`Value`]s.
///
/// `Obj` is a handle over shared storage: clones refer to the same map and the
/// same observer. Reads and writes go through per-key property slots, which is
/// what lets an Observer convert every key into a tracked property.
///
/// # Example
///
/// ```
/// use spark_observe::{obj, Value};
///
/// let state = obj! { "count" => 0, "label" => "ready" };
/// let map = state.as_obj().unwrap();
///
/// assert!(map.get("count").same(&Value::Int(0)));
/// map.set("count", 1);
/// assert!(map.get("count").same(&Value::Int(1)));
/// assert!(map.get("missing").is_null());
/// assert!(map.peek("missing").is_none());
/// ```
#[derive(Clone)]
pub struct Obj {
    data: Rc<ObjData>,
}

impl Obj {
    /// Create a new empty map.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a map with initial slot capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Rc::new(ObjData {
                entries: RefCell::new(Vec::with_capacity(capacity)),
                observer: RefCell::new(None),
                extensible: Cell::new(true),
                instance_root: Cell::new(false),
            }),
        }
    }

    /// Identity comparison (same storage allocation).
    pub fn ptr_eq(&self, other: &Obj) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// Storage address, the identity used for ordering by identity.
    pub(crate) fn storage_addr(&self) -> usize {
        Rc::as_ptr(&self.data) as usize
    }

    /// Number of keys. Untracked.
    pub fn len(&self) -> usize {
        self.data.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.entries.borrow().is_empty()
    }

    /// Whether the key exists. Untracked.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data
            .entries
            .borrow()
            .iter()
            .any(|(k, _)| k.as_ref() == key)
    }

    /// Keys in insertion order. Untracked.
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.data
            .entries
            .borrow()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Read a key through its slot.
    ///
    /// Missing keys yield [`Value::Null`] and register nothing; a dependency
    /// can only exist for a key that has a slot.
    pub fn get(&self, key: &str) -> Value {
        match self.slot(key) {
            Some(slot) => slot.read(),
            None => Value::Null,
        }
    }

    /// Read a key without registering any dependency, honoring accessor
    /// pairs. Returns `None` when the key is absent.
    pub fn peek(&self, key: &str) -> Option<Value> {
        let slot = self.slot(key)?;
        Some(untracked(|| slot.raw_value()))
    }

    /// Write a key through its slot.
    ///
    /// Existing keys go through the slot's write path (tracked slots notify).
    /// A missing key is inserted as a plain slot; it only becomes tracked
    /// through [`observe`](crate::observe) or [`set`](crate::set). Writes of
    /// new keys to a non-extensible map are silently ignored.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        if let Some(slot) = self.slot(key) {
            slot.write(value);
            return;
        }
        if !self.data.extensible.get() {
            return;
        }
        self.insert_plain_slot(key, value);
    }

    /// Raw key/value snapshot in insertion order, honoring accessor pairs,
    /// registering nothing.
    pub fn entries_snapshot(&self) -> Vec<(Rc<str>, Value)> {
        let slots: Vec<(Rc<str>, Rc<PropSlot>)> = self.data.entries.borrow().clone();
        untracked(|| {
            slots
                .into_iter()
                .map(|(key, slot)| (key, slot.raw_value()))
                .collect()
        })
    }

    // =========================================================================
    // DESCRIPTOR SURFACE
    // =========================================================================

    /// Install an accessor pair on a key.
    ///
    /// Replaces the slot's machinery: the slot reverts to plain until the map
    /// is observed again (or the key re-installed through
    /// [`define_reactive`](crate::define_reactive)). The slot's dependency and
    /// its subscribers are retained.
    pub fn define_accessor(
        &self,
        key: &str,
        getter: Option<PropGetter>,
        setter: Option<PropSetter>,
    ) -> Result<(), PropertyError> {
        let slot = self.descriptor_slot(key)?;
        *slot.getter.borrow_mut() = getter;
        *slot.setter.borrow_mut() = setter;
        *slot.on_write.borrow_mut() = None;
        slot.reactive.set(false);
        Ok(())
    }

    /// Define a non-configurable data property. Sealed slots are skipped by
    /// observation and refuse redefinition and removal.
    pub fn define_sealed(&self, key: &str, value: impl Into<Value>) -> Result<(), PropertyError> {
        let slot = self.descriptor_slot(key)?;
        *slot.value.borrow_mut() = value.into();
        *slot.getter.borrow_mut() = None;
        *slot.setter.borrow_mut() = None;
        *slot.on_write.borrow_mut() = None;
        slot.reactive.set(false);
        slot.configurable.set(false);
        Ok(())
    }

    /// Forbid new keys. Existing keys are unaffected; `observe` refuses
    /// non-extensible maps.
    pub fn prevent_extensions(&self) {
        self.data.extensible.set(false);
    }

    /// Forbid new keys and seal every existing slot.
    ///
    /// Freezing is an observation opt-out: the map cannot be wrapped and its
    /// slots cannot be redefined or removed. Raw writes to existing plain
    /// keys still land.
    pub fn freeze(&self) {
        self.prevent_extensions();
        let slots: Vec<Rc<PropSlot>> = self
            .data
            .entries
            .borrow()
            .iter()
            .map(|(_, slot)| slot.clone())
            .collect();
        for slot in slots {
            slot.configurable.set(false);
        }
    }

    pub fn is_extensible(&self) -> bool {
        self.data.extensible.get()
    }

    /// Slot lookup for the descriptor operations, creating a plain slot for a
    /// new key.
    fn descriptor_slot(&self, key: &str) -> Result<Rc<PropSlot>, PropertyError> {
        if let Some(slot) = self.slot(key) {
            if !slot.configurable.get() {
                return Err(PropertyError::NotConfigurable(Rc::from(key)));
            }
            return Ok(slot);
        }
        if !self.data.extensible.get() {
            return Err(PropertyError::NotExtensible(Rc::from(key)));
        }
        Ok(self.insert_plain_slot(key, Value::Null))
    }

    // =========================================================================
    // ENGINE INTERNALS
    // =========================================================================

    pub(crate) fn slot(&self, key: &str) -> Option<Rc<PropSlot>> {
        self.data
            .entries
            .borrow()
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, slot)| slot.clone())
    }

    pub(crate) fn insert_plain_slot(&self, key: &str, value: Value) -> Rc<PropSlot> {
        let slot = PropSlot::new_plain(value);
        self.data
            .entries
            .borrow_mut()
            .push((Rc::from(key), slot.clone()));
        slot
    }

    /// Remove a key and its slot. Returns whether the key existed. The
    /// caller owns any structural notification.
    pub(crate) fn remove_key(&self, key: &str) -> bool {
        let mut entries = self.data.entries.borrow_mut();
        let index = entries.iter().position(|(k, _)| k.as_ref() == key);
        match index {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn observer(&self) -> Option<Rc<Observer>> {
        self.data.observer.borrow().clone()
    }

    pub(crate) fn set_observer(&self, observer: Rc<Observer>) {
        *self.data.observer.borrow_mut() = Some(observer);
    }

    pub(crate) fn is_instance_root(&self) -> bool {
        self.data.instance_root.get()
    }

    pub(crate) fn mark_instance_root(&self) {
        self.data.instance_root.set(true);
    }
}

impl Default for Obj {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Obj").field("len", &self.len()).finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
