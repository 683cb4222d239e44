// ============================================================================
// spark-observe - define_reactive
// Installs the tracked read/write protocol on one property slot
// ============================================================================

use crate::core::context::untracked;
use crate::observer::observe;
use crate::value::obj::WriteHook;
use crate::value::{Obj, Value};

/// Install (or re-install) the tracked protocol on `key`.
///
/// The slot's reads then register the active subscriber and its writes
/// short-circuit on [`Value::same`], run `on_write`, refresh the child
/// Observer and notify. A pre-existing accessor pair is preserved and
/// delegated through.
///
/// - Non-configurable slots are skipped silently, as is a new key on a
///   non-extensible map.
/// - With `value` omitted, the current value is read raw (untracked); a
///   getter-only slot is not invoked and starts from Null.
/// - Unless `shallow`, the initial value is observed and its Observer
///   retained on the slot.
///
/// Re-installation replaces the machinery in place: the slot's dependency
/// and its subscribers are retained, and no accessor chaining occurs, so one
/// write keeps producing exactly one notification.
pub fn define_reactive(
    target: &Obj,
    key: &str,
    value: Option<Value>,
    on_write: Option<WriteHook>,
    shallow: bool,
) {
    let slot = match target.slot(key) {
        Some(slot) => {
            if !slot.configurable.get() {
                return;
            }
            slot
        }
        None => {
            if !target.is_extensible() {
                return;
            }
            target.insert_plain_slot(key, Value::Null)
        }
    };

    let has_getter = slot.getter.borrow().is_some();
    let has_setter = slot.setter.borrow().is_some();

    let initial = match value {
        Some(value) => {
            *slot.value.borrow_mut() = value.clone();
            value
        }
        None => {
            if has_getter && !has_setter {
                Value::Null
            } else {
                untracked(|| slot.raw_value())
            }
        }
    };

    *slot.on_write.borrow_mut() = on_write;
    slot.shallow.set(shallow);
    *slot.child_ob.borrow_mut() = if shallow {
        None
    } else {
        observe(&initial, false)
    };
    slot.reactive.set(true);
}

// =============================================================================
// TESTS
// =============================================================================
