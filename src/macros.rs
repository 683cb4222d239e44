// ============================================================================
// spark-observe - Construction Macros
// ============================================================================

/// Build a map [`Value`](crate::Value) with literal keys.
///
/// Yields a [`Value`](crate::Value) wrapping an [`Obj`](crate::Obj), so maps
/// nest without conversion ceremony. Values are anything `Into<Value>`.
///
/// # Usage
///
/// ```rust
/// use spark_observe::{arr, obj};
///
/// let state = obj! {
///     "name" => "scope",
///     "zoom" => 1.5,
///     "tags" => arr!["wide", "tele"],
///     "meta" => obj! { "revision" => 3 },
/// };
/// assert_eq!(state.as_obj().unwrap().len(), 4);
/// ```
#[macro_export]
macro_rules! obj {
    // Case 1: empty map
    () => {
        $crate::Value::Obj($crate::Obj::new())
    };
    // Case 2: key => value pairs, trailing comma allowed
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let map = $crate::Obj::new();
        $( map.set($key, $value); )+
        $crate::Value::Obj(map)
    }};
}

/// Build a sequence [`Value`](crate::Value) from elements.
///
/// # Usage
///
/// ```rust
/// use spark_observe::arr;
///
/// let items = arr![1, 2, 3];
/// assert_eq!(items.as_arr().unwrap().len(), 3);
///
/// let empty = arr![];
/// assert!(empty.as_arr().unwrap().is_empty());
/// ```
#[macro_export]
macro_rules! arr {
    // Case 1: empty sequence
    () => {
        $crate::Value::Arr($crate::Arr::new())
    };
    // Case 2: elements, trailing comma allowed
    ($($value:expr),+ $(,)?) => {{
        let items = vec![$( $crate::Value::from($value) ),+];
        $crate::Value::Arr($crate::Arr::from_values(items))
    }};
}
