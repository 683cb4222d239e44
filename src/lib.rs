// ============================================================================
// spark-observe - A Deep-Observation Reactive State Library for Rust
// ============================================================================
//
// Dependency-tracked dynamic value graphs: maps and sequences whose property
// reads register the active subscriber and whose writes notify it.
// ============================================================================

pub mod core;
pub mod diagnostics;
pub mod inject;
mod macros;
pub mod observer;
pub mod value;

// Re-export the engine context at crate root for ergonomic access
pub use crate::core::context::{
    active_subscriber, has_active_subscriber, is_observing, is_server_rendering, pop_subscriber,
    push_subscriber, set_server_rendering, toggle_observing, untracked, with_context,
    with_subscriber, without_observing, ObserveContext,
};
pub use crate::core::dep::Dep;
pub use crate::core::types::Subscriber;

// Re-export the value substrate
pub use value::arr::Arr;
pub use value::obj::{Obj, PropGetter, PropSetter, PropertyError, WriteHook};
pub use value::{RenderNode, Value, ValueTypeError};

// Re-export the observation engine
pub use observer::mutate::{del, set, Key};
pub use observer::reactive::define_reactive;
pub use observer::{observe, Observer};

// Re-export provide/inject
pub use inject::{
    init_injections, init_provide, resolve_inject, ComponentInstance, InjectDefault,
    InjectDescriptor, ProvideSpec,
};

// Re-export diagnostics
pub use diagnostics::{set_warn_handler, WarnHandler};

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    struct Probe {
        runs: Cell<u32>,
    }

    impl Probe {
        fn new() -> Rc<Self> {
            Rc::new(Self { runs: Cell::new(0) })
        }
    }

    impl Subscriber for Probe {
        fn update(&self) {
            self.runs.set(self.runs.get() + 1);
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn capture_warnings() -> Rc<RefCell<Vec<String>>> {
        let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        set_warn_handler(Some(Rc::new(move |message: &str| {
            sink.borrow_mut().push(message.to_string());
        })));
        seen
    }

    // =========================================================================
    // Identity and memoization
    // =========================================================================

    #[test]
    fn observe_returns_one_observer_per_identity() {
        let state = obj! { "a" => 1 };
        let first = observe(&state, false).unwrap();
        let second = observe(&state, false).unwrap();
        assert!(Rc::ptr_eq(&first, &second));

        let refused = without_observing(|| observe(&obj! { "b" => 2 }, false));
        assert!(refused.is_none());
    }

    #[test]
    fn clones_of_a_container_share_the_observer() {
        let state = obj! { "a" => 1 };
        let alias = state.clone();
        let first = observe(&state, false).unwrap();
        let second = observe(&alias, false).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    // =========================================================================
    // Read/notify round trip
    // =========================================================================

    #[test]
    fn tracked_reads_notify_on_writes() {
        let state = obj! { "count" => 0, "label" => "idle" };
        observe(&state, false);
        let map = state.as_obj().unwrap();

        let probe = Probe::new();
        with_subscriber(probe.clone(), || {
            map.get("count");
            map.get("label");
        });

        map.set("count", 1);
        map.set("label", "busy");
        assert_eq!(probe.runs.get(), 2);

        // Same-value writes short-circuit
        map.set("count", 1);
        map.set("label", "busy");
        assert_eq!(probe.runs.get(), 2);
    }

    #[test]
    fn nan_writes_short_circuit() {
        let state = obj! { "ratio" => f64::NAN };
        observe(&state, false);
        let map = state.as_obj().unwrap();

        let probe = Probe::new();
        with_subscriber(probe.clone(), || {
            map.get("ratio");
        });
        map.set("ratio", f64::NAN);
        assert_eq!(probe.runs.get(), 0);
        map.set("ratio", 0.5);
        assert_eq!(probe.runs.get(), 1);
    }

    #[test]
    fn untracked_reads_register_nothing() {
        let state = obj! { "count" => 0 };
        observe(&state, false);
        let map = state.as_obj().unwrap();

        let probe = Probe::new();
        with_subscriber(probe.clone(), || {
            untracked(|| {
                map.get("count");
            });
        });
        map.set("count", 1);
        assert_eq!(probe.runs.get(), 0);
    }

    #[test]
    fn deep_reads_track_nested_properties() {
        let state = obj! { "user" => obj! { "name" => "ada" } };
        observe(&state, false);
        let map = state.as_obj().unwrap();

        let probe = Probe::new();
        with_subscriber(probe.clone(), || {
            map.get("user").as_obj().unwrap().get("name");
        });

        map.peek("user")
            .unwrap()
            .as_obj()
            .unwrap()
            .set("name", "grace");
        assert_eq!(probe.runs.get(), 1);
    }

    // =========================================================================
    // Structural mutation
    // =========================================================================

    #[test]
    fn set_makes_new_keys_live_immediately() {
        let state = obj! { "a" => 1 };
        observe(&state, false);
        let map = state.as_obj().unwrap();

        set(&state, "b", 10);

        let probe = Probe::new();
        with_subscriber(probe.clone(), || {
            map.get("b");
        });
        map.set("b", 11);
        assert_eq!(probe.runs.get(), 1);
    }

    #[test]
    fn set_reaches_subscribers_of_the_owning_slot() {
        let inner = obj! { "x" => 1 };
        let root = obj! { "inner" => inner.clone() };
        observe(&root, false);

        let probe = Probe::new();
        with_subscriber(probe.clone(), || {
            root.as_obj().unwrap().get("inner");
        });

        set(&inner, "y", 2);
        assert_eq!(probe.runs.get(), 1);
        del(&inner, "y");
        assert_eq!(probe.runs.get(), 2);
    }

    #[test]
    fn root_guard_blocks_reactive_installation() {
        let seen = capture_warnings();
        let state = obj! { "a" => 1 };
        observe(&state, true);
        let map = state.as_obj().unwrap();

        set(&state, "b", 2);
        assert_eq!(map.get("b").as_i64(), Some(2));
        assert_eq!(seen.borrow().len(), 1);

        let probe = Probe::new();
        with_subscriber(probe.clone(), || {
            map.get("b");
        });
        map.set("b", 3);
        assert_eq!(probe.runs.get(), 0);
        set_warn_handler(None);
    }

    // =========================================================================
    // Sequence interception
    // =========================================================================

    #[test]
    fn every_mutator_notifies_sequence_subscribers() {
        let state = obj! { "items" => arr![3, 1, 2] };
        observe(&state, false);
        let map = state.as_obj().unwrap();

        let probe = Probe::new();
        with_subscriber(probe.clone(), || {
            map.get("items");
        });

        let items = map.peek("items").unwrap();
        let seq = items.as_arr().unwrap();

        seq.push(4);
        assert_eq!(probe.runs.get(), 1);
        seq.pop();
        assert_eq!(probe.runs.get(), 2);
        seq.unshift(0);
        assert_eq!(probe.runs.get(), 3);
        seq.shift();
        assert_eq!(probe.runs.get(), 4);
        seq.splice(0, 1, vec![Value::Int(9)]);
        assert_eq!(probe.runs.get(), 5);
        seq.sort();
        assert_eq!(probe.runs.get(), 6);
        seq.reverse();
        assert_eq!(probe.runs.get(), 7);
    }

    #[test]
    fn inserted_elements_become_observed() {
        let state = obj! { "items" => arr![] };
        observe(&state, false);
        let map = state.as_obj().unwrap();
        let items = map.peek("items").unwrap();
        let seq = items.as_arr().unwrap();

        let pushed = obj! { "x" => 1 };
        seq.push(pushed.clone());
        assert!(observe(&pushed, false).is_some());

        let spliced = obj! { "y" => 2 };
        seq.splice(0, 0, vec![spliced.clone()]);
        assert!(observe(&spliced, false).is_some());
    }

    #[test]
    fn unobserved_sequences_mutate_silently() {
        let items = arr![1, 2];
        let seq = items.as_arr().unwrap();
        seq.push(3);
        seq.sort();
        assert_eq!(seq.len(), 3);

        let pushed = obj! { "x" => 1 };
        seq.push(pushed.clone());
        // No observer on the sequence, so elements are not wrapped
        assert!(without_observing(|| observe(&pushed, false)).is_none());
    }

    // =========================================================================
    // Injection chains
    // =========================================================================

    #[test]
    fn injection_resolves_across_the_chain() {
        let seen = capture_warnings();

        let app = ComponentInstance::new("App", None);
        app.set_provide(ProvideSpec::Map(
            obj! { "theme" => "dark" }.as_obj().unwrap().clone(),
        ));
        init_provide(&app);

        let layout = ComponentInstance::new("Layout", Some(app));
        let page = ComponentInstance::new("Page", Some(layout));
        page.add_injection(InjectDescriptor::new("theme"));
        page.add_injection(InjectDescriptor::new("zoom").with_default(1.0));
        page.add_injection(InjectDescriptor::new("ghost"));
        init_injections(&page);

        assert_eq!(page.fields().get("theme").as_str(), Some("dark"));
        assert_eq!(page.fields().get("zoom").as_f64(), Some(1.0));
        assert!(!page.fields().contains_key("ghost"));
        assert_eq!(seen.borrow().len(), 1);
        assert!(seen.borrow()[0].contains("Injection \"ghost\" not found"));
        set_warn_handler(None);
    }

    // =========================================================================
    // Idempotent installation
    // =========================================================================

    #[test]
    fn reinstalling_a_key_keeps_its_subscribers() {
        let state = obj! { "n" => 0 };
        observe(&state, false);
        let map = state.as_obj().unwrap();

        let probe = Probe::new();
        with_subscriber(probe.clone(), || {
            map.get("n");
        });

        define_reactive(map, "n", None, None, false);
        define_reactive(map, "n", None, None, false);

        map.set("n", 1);
        assert_eq!(probe.runs.get(), 1);
    }

    // =========================================================================
    // Whole-engine scenario
    // =========================================================================

    #[test]
    fn render_like_computation_over_a_state_tree() {
        let state = obj! {
            "title" => "dashboard",
            "panels" => arr![
                obj! { "kind" => "chart", "visible" => true },
                obj! { "kind" => "table", "visible" => false }
            ]
        };
        observe(&state, true);
        let map = state.as_obj().unwrap();

        // A render pass reads the full visible surface
        let render = |map: &Obj| {
            let mut titles = Vec::new();
            titles.push(map.get("title").as_str().map(str::to_string));
            let panels = map.get("panels");
            let panels = panels.as_arr().unwrap().snapshot();
            for panel in panels {
                let panel = panel.as_obj().unwrap().clone();
                if panel.get("visible").as_bool() == Some(true) {
                    titles.push(panel.get("kind").as_str().map(str::to_string));
                }
            }
            titles
        };

        let probe = Probe::new();
        with_subscriber(probe.clone(), || {
            render(map);
        });
        assert_eq!(probe.runs.get(), 0);

        // Flipping a nested flag reaches the subscriber
        let panel = map
            .peek("panels")
            .unwrap()
            .as_arr()
            .unwrap()
            .get(1)
            .unwrap();
        panel.as_obj().unwrap().set("visible", true);
        assert_eq!(probe.runs.get(), 1);

        // Sequence mutation reaches it too
        map.peek("panels")
            .unwrap()
            .as_arr()
            .unwrap()
            .push(obj! { "kind" => "log", "visible" => true });
        assert_eq!(probe.runs.get(), 2);

        // Unrelated same-value write does not
        map.set("title", "dashboard");
        assert_eq!(probe.runs.get(), 2);
    }
}
