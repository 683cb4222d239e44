// ============================================================================
// spark-observe - Structural Mutation
// set/del keep key additions and removals observable
// ============================================================================

use std::rc::Rc;

use crate::diagnostics::dev_warn;
use crate::observer::reactive::define_reactive;
use crate::value::{Obj, Value};

// =============================================================================
// KEY
// =============================================================================

/// A structural-mutation key: a map property or a sequence index.
///
/// String keys that parse as valid indices address sequence positions, so
/// `set(&items, "3", v)` and `set(&items, 3, v)` are equivalent on a
/// sequence.
#[derive(Clone, Debug)]
pub enum Key {
    Index(usize),
    Prop(Rc<str>),
}

impl Key {
    /// Index view of this key, if it has one.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(index) => Some(*index),
            Key::Prop(name) => name.parse().ok(),
        }
    }

    /// Property-name view of this key.
    pub fn as_prop(&self) -> Rc<str> {
        match self {
            Key::Index(index) => Rc::from(index.to_string().as_str()),
            Key::Prop(name) => name.clone(),
        }
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Prop(Rc::from(name))
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Prop(Rc::from(name.as_str()))
    }
}

impl From<Rc<str>> for Key {
    fn from(name: Rc<str>) -> Self {
        Key::Prop(name)
    }
}

// =============================================================================
// SET
// =============================================================================

/// Structurally add or replace a key, keeping the result observable.
///
/// On a sequence with a valid index, grows to the index if needed and splices
/// the value in (one notification). On a map, an existing key is a plain
/// assignment through its slot; a new key on an observed map is installed
/// through [`define_reactive`] and the map's Observer notifies. New keys on
/// unobserved maps stay plain.
///
/// Component roots are guarded: the plain assignment still lands, but no
/// reactive property is installed, nothing notifies, and the diagnostic sink
/// reports the attempt. Targets that cannot hold keys (Null, scalars, nodes)
/// only warn. The value is returned in every case.
///
/// # Example
///
/// ```
/// use spark_observe::{obj, observe, set};
///
/// let state = obj! { "a" => 1 };
/// observe(&state, false);
/// set(&state, "b", 2);
/// assert_eq!(state.as_obj().unwrap().get("b").as_i64(), Some(2));
/// ```
pub fn set(target: &Value, key: impl Into<Key>, value: impl Into<Value>) -> Value {
    let key = key.into();
    let value = value.into();
    match target {
        Value::Arr(seq) => {
            match key.as_index() {
                Some(index) => {
                    seq.grow_raw(index);
                    seq.splice(index, 1, vec![value.clone()]);
                }
                None => dev_warn(&format!(
                    "cannot set key \"{}\" on a sequence: not a valid index",
                    key.as_prop()
                )),
            }
            value
        }
        Value::Obj(map) => set_on_map(map, &key.as_prop(), value),
        other => {
            dev_warn(&format!(
                "cannot set a reactive key on a {} value",
                other.type_name()
            ));
            value
        }
    }
}

fn set_on_map(map: &Obj, key: &str, value: Value) -> Value {
    if map.contains_key(key) {
        map.set(key, value.clone());
        return value;
    }

    let observer = map.observer();
    if map.is_instance_root() || observer.as_ref().is_some_and(|ob| ob.root_count() > 0) {
        dev_warn(&format!(
            "avoid adding reactive key \"{key}\" to a component root; \
             declare it in the initial state instead"
        ));
        map.set(key, value.clone());
        return value;
    }

    let Some(observer) = observer else {
        // Unobserved map: plain, silently non-reactive
        map.set(key, value.clone());
        return value;
    };

    define_reactive(map, key, Some(value.clone()), None, false);
    observer.notify();
    value
}

// =============================================================================
// DEL
// =============================================================================

/// Structurally remove a key, notifying the container's Observer.
///
/// On a sequence with a valid index, splices the element out (a non-index
/// key is a silent no-op). On a map, component roots are guarded (refuse +
/// diagnostic), an absent key is a silent no-op, and removal notifies only
/// when the map is observed. Non-container targets warn.
pub fn del(target: &Value, key: impl Into<Key>) {
    let key = key.into();
    match target {
        Value::Arr(seq) => {
            if let Some(index) = key.as_index() {
                seq.splice(index, 1, Vec::new());
            }
        }
        Value::Obj(map) => {
            let key = key.as_prop();
            let observer = map.observer();
            if map.is_instance_root() || observer.as_ref().is_some_and(|ob| ob.root_count() > 0) {
                dev_warn(&format!(
                    "avoid deleting key \"{key}\" on a component root; \
                     set it to null instead"
                ));
                return;
            }
            if !map.remove_key(&key) {
                return;
            }
            if let Some(observer) = observer {
                observer.notify();
            }
        }
        other => {
            dev_warn(&format!(
                "cannot delete a reactive key on a {} value",
                other.type_name()
            ));
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
