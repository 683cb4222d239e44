// ============================================================================
// spark-observe - Reactive Sequences
// A Vec of values whose mutators keep an attached Observer informed
// ============================================================================

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::mem;
use std::rc::Rc;

use crate::observer::{observe, Observer};
use crate::value::Value;

// =============================================================================
// ARR
// =============================================================================

/// An observable sequence of [`Value`]s.
///
/// `Arr` is a handle over shared storage: clones refer to the same elements
/// and the same observer. The seven intercepted mutators (`push`, `pop`,
/// `shift`, `unshift`, `splice`, `sort`/`sort_by`, `reverse`) perform the raw
/// edit and then, when the sequence is observed, observe any inserted
/// elements and notify the sequence dependency.
///
/// Indexed reads and `len` are raw. Tracking of sequence contents happens at
/// the property that holds the sequence, so replacing or reordering elements
/// reaches subscribers through the owning slot's dependency.
///
/// # Example
///
/// ```
/// use spark_observe::{arr, Value};
///
/// let items = arr![1, 2, 3];
/// let seq = items.as_arr().unwrap();
///
/// seq.push(4);
/// assert_eq!(seq.len(), 4);
/// assert_eq!(seq.get(3).and_then(|v| v.as_i64()), Some(4));
///
/// let removed = seq.splice(1, 2, vec![Value::Int(9)]);
/// assert_eq!(removed.len(), 2);
/// assert_eq!(seq.len(), 3);
/// ```
#[derive(Clone)]
pub struct Arr {
    data: Rc<ArrData>,
}

struct ArrData {
    /// The underlying elements
    items: RefCell<Vec<Value>>,

    /// Observer marker, installed by `observe`
    observer: RefCell<Option<Rc<Observer>>>,

    /// Whether the sequence may be wrapped
    extensible: Cell<bool>,
}

impl Arr {
    /// Create a new empty sequence.
    pub fn new() -> Self {
        Self::from_values(Vec::new())
    }

    /// Create a sequence with initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_values(Vec::with_capacity(capacity))
    }

    /// Create a sequence from existing values.
    pub fn from_values(items: Vec<Value>) -> Self {
        Self {
            data: Rc::new(ArrData {
                items: RefCell::new(items),
                observer: RefCell::new(None),
                extensible: Cell::new(true),
            }),
        }
    }

    /// Identity comparison (same storage allocation).
    pub fn ptr_eq(&self, other: &Arr) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// Storage address, the identity used for ordering by identity.
    pub(crate) fn storage_addr(&self) -> usize {
        Rc::as_ptr(&self.data) as usize
    }

    /// Element count. Untracked.
    pub fn len(&self) -> usize {
        self.data.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.items.borrow().is_empty()
    }

    /// Read one element. Untracked.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.data.items.borrow().get(index).cloned()
    }

    /// Raw snapshot of the current elements. Untracked.
    pub fn snapshot(&self) -> Vec<Value> {
        self.data.items.borrow().clone()
    }

    /// Forbid wrapping of this sequence by `observe`.
    pub fn prevent_extensions(&self) {
        self.data.extensible.set(false);
    }

    pub fn is_extensible(&self) -> bool {
        self.data.extensible.get()
    }

    // =========================================================================
    // INTERCEPTED MUTATORS
    // =========================================================================

    /// Append an element.
    pub fn push(&self, value: impl Into<Value>) {
        let value = value.into();
        self.data.items.borrow_mut().push(value.clone());
        self.after_mutation(&[value]);
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        let removed = self.data.items.borrow_mut().pop();
        self.after_mutation(&[]);
        removed
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<Value> {
        let removed = {
            let mut items = self.data.items.borrow_mut();
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        };
        self.after_mutation(&[]);
        removed
    }

    /// Prepend an element.
    pub fn unshift(&self, value: impl Into<Value>) {
        let value = value.into();
        self.data.items.borrow_mut().insert(0, value.clone());
        self.after_mutation(&[value]);
    }

    /// Remove `delete_count` elements at `start` and insert `items` in their
    /// place. Out-of-range arguments are clamped. Returns the removed
    /// elements.
    pub fn splice(&self, start: usize, delete_count: usize, items: Vec<Value>) -> Vec<Value> {
        let inserted = items.clone();
        let removed = {
            let mut storage = self.data.items.borrow_mut();
            let start = start.min(storage.len());
            let end = start + delete_count.min(storage.len() - start);
            storage.splice(start..end, items).collect()
        };
        self.after_mutation(&inserted);
        removed
    }

    /// Sort by the default cross-kind order: null, then booleans, numbers,
    /// strings, containers, nodes. Containers and nodes order by identity,
    /// stable within one program run.
    pub fn sort(&self) {
        self.sort_by(default_order);
    }

    /// Sort with a caller-supplied comparator.
    ///
    /// The storage is detached while the comparator runs, so a comparator
    /// reading this sequence sees it empty rather than deadlocking.
    pub fn sort_by(&self, mut compare: impl FnMut(&Value, &Value) -> Ordering) {
        let mut detached = mem::take(&mut *self.data.items.borrow_mut());
        detached.sort_by(&mut compare);
        *self.data.items.borrow_mut() = detached;
        self.after_mutation(&[]);
    }

    /// Reverse the elements in place.
    pub fn reverse(&self) {
        self.data.items.borrow_mut().reverse();
        self.after_mutation(&[]);
    }

    /// Post-mutator protocol: observe inserted elements and notify, only when
    /// this sequence is observed. Runs outside any storage borrow.
    fn after_mutation(&self, inserted: &[Value]) {
        let observer = self.data.observer.borrow().clone();
        if let Some(observer) = observer {
            for value in inserted {
                observe(value, false);
            }
            observer.notify();
        }
    }

    // =========================================================================
    // ENGINE INTERNALS
    // =========================================================================

    /// Grow the raw length to `len` with nulls, without notifying. Used by
    /// index-targeted structural writes before they splice.
    pub(crate) fn grow_raw(&self, len: usize) {
        let mut items = self.data.items.borrow_mut();
        if items.len() < len {
            items.resize(len, Value::Null);
        }
    }

    pub(crate) fn observer(&self) -> Option<Rc<Observer>> {
        self.data.observer.borrow().clone()
    }

    pub(crate) fn set_observer(&self, observer: Rc<Observer>) {
        *self.data.observer.borrow_mut() = Some(observer);
    }
}

impl Default for Arr {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Arr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arr").field("len", &self.len()).finish()
    }
}

/// Total order over value kinds for comparator-less sorts.
fn default_order(a: &Value, b: &Value) -> Ordering {
    fn kind_rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Str(_) => 3,
            Value::Obj(_) => 4,
            Value::Arr(_) => 5,
            Value::Node(_) => 6,
        }
    }

    fn identity(value: &Value) -> usize {
        match value {
            Value::Obj(o) => o.storage_addr(),
            Value::Arr(a) => a.storage_addr(),
            _ => 0,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        _ => {
            let rank = kind_rank(a).cmp(&kind_rank(b));
            if rank != Ordering::Equal {
                return rank;
            }
            match (a.as_f64(), b.as_f64()) {
                // NaN sorts after every number
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or_else(|| {
                    match (x.is_nan(), y.is_nan()) {
                        (true, false) => Ordering::Greater,
                        (false, true) => Ordering::Less,
                        _ => Ordering::Equal,
                    }
                }),
                _ => identity(a).cmp(&identity(b)),
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(seq: &Arr) -> Vec<i64> {
        seq.snapshot().iter().filter_map(|v| v.as_i64()).collect()
    }

    #[test]
    fn push_pop_shift_unshift() {
        let seq = Arr::new();
        seq.push(1);
        seq.push(2);
        seq.unshift(0);
        assert_eq!(ints(&seq), vec![0, 1, 2]);

        assert_eq!(seq.pop().and_then(|v| v.as_i64()), Some(2));
        assert_eq!(seq.shift().and_then(|v| v.as_i64()), Some(0));
        assert_eq!(ints(&seq), vec![1]);

        let empty = Arr::new();
        assert!(empty.pop().is_none());
        assert!(empty.shift().is_none());
    }

    #[test]
    fn splice_replaces_and_reports_removed() {
        let seq = Arr::from_values(vec![
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
            Value::Int(4),
        ]);
        let removed = seq.splice(1, 2, vec![Value::Int(9)]);
        assert_eq!(
            removed.iter().filter_map(|v| v.as_i64()).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert_eq!(ints(&seq), vec![1, 9, 4]);
    }

    #[test]
    fn splice_clamps_out_of_range() {
        let seq = Arr::from_values(vec![Value::Int(1)]);
        let removed = seq.splice(5, 3, vec![Value::Int(2)]);
        assert!(removed.is_empty());
        assert_eq!(ints(&seq), vec![1, 2]);

        let removed = seq.splice(0, 99, vec![]);
        assert_eq!(removed.len(), 2);
        assert!(seq.is_empty());
    }

    #[test]
    fn sort_and_reverse() {
        let seq = Arr::from_values(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        seq.sort();
        assert_eq!(ints(&seq), vec![1, 2, 3]);
        seq.reverse();
        assert_eq!(ints(&seq), vec![3, 2, 1]);

        seq.sort_by(|a, b| default_order(a, b).reverse());
        assert_eq!(ints(&seq), vec![3, 2, 1]);
    }

    #[test]
    fn default_sort_orders_across_kinds() {
        let seq = Arr::from_values(vec![
            Value::from("b"),
            Value::Int(2),
            Value::Null,
            Value::from("a"),
            Value::Bool(true),
            Value::Float(1.5),
        ]);
        seq.sort();
        let kinds: Vec<&str> = seq.snapshot().iter().map(|v| v.type_name()).collect();
        assert_eq!(kinds, vec!["null", "bool", "float", "int", "string", "string"]);
        assert_eq!(seq.get(5).unwrap().as_str(), Some("b"));
    }

    #[test]
    fn comparator_reading_the_sequence_sees_it_detached() {
        let seq = Arr::from_values(vec![Value::Int(2), Value::Int(1)]);
        let alias = seq.clone();
        seq.sort_by(move |a, b| {
            assert_eq!(alias.len(), 0);
            default_order(a, b)
        });
        assert_eq!(ints(&seq), vec![1, 2]);
    }

    #[test]
    fn grow_raw_pads_with_nulls() {
        let seq = Arr::from_values(vec![Value::Int(1)]);
        seq.grow_raw(3);
        assert_eq!(seq.len(), 3);
        assert!(seq.get(2).unwrap().is_null());
        // Never shrinks
        seq.grow_raw(1);
        assert_eq!(seq.len(), 3);
    }

    #[test]
    fn clones_share_storage() {
        let seq = Arr::new();
        let alias = seq.clone();
        seq.push(1);
        assert_eq!(alias.len(), 1);
        assert!(seq.ptr_eq(&alias));
        assert!(!seq.ptr_eq(&Arr::new()));
    }
}
