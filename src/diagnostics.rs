// ============================================================================
// spark-observe - Diagnostics
// One sink for every non-fatal engine warning
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;

/// Receives every engine warning when installed.
pub type WarnHandler = Rc<dyn Fn(&str)>;

thread_local! {
    static WARN_HANDLER: RefCell<Option<WarnHandler>> = RefCell::new(None);
}

/// Install a warning handler, returning the previous one.
///
/// With no handler installed, warnings go to `tracing::warn!` under the
/// `spark_observe` target. Tests install a capturing handler to assert on
/// warnings.
///
/// # Example
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use spark_observe::{del, set_warn_handler, Value};
///
/// let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// let previous = set_warn_handler(Some(Rc::new(move |message: &str| {
///     sink.borrow_mut().push(message.to_string());
/// })));
///
/// del(&Value::Int(3), "k");
/// assert_eq!(seen.borrow().len(), 1);
///
/// set_warn_handler(previous);
/// ```
pub fn set_warn_handler(handler: Option<WarnHandler>) -> Option<WarnHandler> {
    WARN_HANDLER.with(|slot| std::mem::replace(&mut *slot.borrow_mut(), handler))
}

/// Route one warning through the installed handler, or `tracing` by default.
pub(crate) fn dev_warn(message: &str) {
    let handler = WARN_HANDLER.with(|slot| slot.borrow().clone());
    match handler {
        Some(handler) => handler(message),
        None => warn!(target: "spark_observe", "{message}"),
    }
}

// =============================================================================
// TESTS
// =============================================================================
