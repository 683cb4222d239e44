// ============================================================================
// spark-observe - Provide / Inject
// Resolves injected values over a component parent chain
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::context::without_observing;
use crate::diagnostics::dev_warn;
use crate::observer::reactive::define_reactive;
use crate::value::obj::WriteHook;
use crate::value::{Obj, Value};

// =============================================================================
// COMPONENT CONTRACT
// =============================================================================

/// What a component provides to its descendants.
#[derive(Clone)]
pub enum ProvideSpec {
    /// A ready map
    Map(Obj),
    /// Evaluated against the instance when provisions install
    Factory(Rc<dyn Fn(&ComponentInstance) -> Obj>),
}

/// Fallback for an injection that resolves nothing.
#[derive(Clone)]
pub enum InjectDefault {
    Value(Value),
    /// Evaluated against the requesting instance
    Factory(Rc<dyn Fn(&ComponentInstance) -> Value>),
}

/// One injection request: install `key` from the nearest provider of `from`.
#[derive(Clone)]
pub struct InjectDescriptor {
    key: Rc<str>,
    from: Rc<str>,
    default: Option<InjectDefault>,
}

impl InjectDescriptor {
    /// Inject `key` from providers of the same name.
    pub fn new(key: &str) -> Self {
        Self {
            key: Rc::from(key),
            from: Rc::from(key),
            default: None,
        }
    }

    /// Look up a different provider key.
    pub fn from(mut self, from: &str) -> Self {
        self.from = Rc::from(from);
        self
    }

    /// Fall back to a value when no provider has the key.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(InjectDefault::Value(value.into()));
        self
    }

    /// Fall back to a factory when no provider has the key.
    pub fn with_default_factory(
        mut self,
        factory: impl Fn(&ComponentInstance) -> Value + 'static,
    ) -> Self {
        self.default = Some(InjectDefault::Factory(Rc::new(factory)));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// The component contract consumed by provide/inject resolution.
///
/// An instance carries a diagnostic name, an optional parent link, a provide
/// specification, its injection requests in declaration order, and a `fields`
/// map where resolved injections are installed. The fields map is a
/// component-instance root: `observe` refuses to wrap it, yet its keys become
/// tracked properties through `define_reactive`.
///
/// # Example
///
/// ```
/// use spark_observe::{
///     init_injections, init_provide, obj, ComponentInstance, InjectDescriptor,
///     ProvideSpec,
/// };
///
/// let app = ComponentInstance::new("App", None);
/// app.set_provide(ProvideSpec::Map(
///     obj! { "theme" => "dark" }.as_obj().unwrap().clone(),
/// ));
/// init_provide(&app);
///
/// let page = ComponentInstance::new("Page", Some(app));
/// page.add_injection(InjectDescriptor::new("theme"));
/// init_injections(&page);
///
/// assert_eq!(page.fields().get("theme").as_str(), Some("dark"));
/// ```
pub struct ComponentInstance {
    name: Rc<str>,
    parent: Option<Rc<ComponentInstance>>,
    provide_spec: RefCell<Option<ProvideSpec>>,
    provided: RefCell<Option<Obj>>,
    inject: RefCell<Vec<InjectDescriptor>>,
    fields: Obj,
}

impl ComponentInstance {
    pub fn new(name: &str, parent: Option<Rc<ComponentInstance>>) -> Rc<Self> {
        let fields = Obj::new();
        fields.mark_instance_root();
        Rc::new(Self {
            name: Rc::from(name),
            parent,
            provide_spec: RefCell::new(None),
            provided: RefCell::new(None),
            inject: RefCell::new(Vec::new()),
            fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<Rc<ComponentInstance>> {
        self.parent.clone()
    }

    /// The instance surface where injections land.
    pub fn fields(&self) -> &Obj {
        &self.fields
    }

    /// Declare what this instance provides. Takes effect on
    /// [`init_provide`].
    pub fn set_provide(&self, spec: ProvideSpec) {
        *self.provide_spec.borrow_mut() = Some(spec);
    }

    /// Append one injection request, keeping declaration order.
    pub fn add_injection(&self, descriptor: InjectDescriptor) {
        self.inject.borrow_mut().push(descriptor);
    }

    /// The installed provide map, if provisions have installed.
    pub fn provided(&self) -> Option<Obj> {
        self.provided.borrow().clone()
    }
}

// =============================================================================
// INITIALIZATION
// =============================================================================

/// Evaluate the provide specification and attach the resulting map.
///
/// Factories receive the instance. Runs after [`init_injections`] in a
/// component lifecycle, which is why an instance normally cannot inject its
/// own provisions.
pub fn init_provide(vm: &ComponentInstance) {
    let spec = vm.provide_spec.borrow().clone();
    if let Some(spec) = spec {
        let provided = match spec {
            ProvideSpec::Map(map) => map,
            ProvideSpec::Factory(factory) => factory(vm),
        };
        *vm.provided.borrow_mut() = Some(provided);
    }
}

/// Resolve every injection request against the parent chain.
///
/// For each descriptor in declaration order, the chain starting at the
/// requesting instance is searched for the first installed provide map
/// containing the `from` key (an untracked read). On a miss the default
/// applies; with no default the key is omitted and the diagnostic sink
/// reports `Injection "<key>" not found`.
pub fn resolve_inject(vm: &ComponentInstance) -> Vec<(Rc<str>, Value)> {
    let descriptors = vm.inject.borrow().clone();
    let mut resolved = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        match lookup_provided(vm, &descriptor.from) {
            Some(value) => resolved.push((descriptor.key.clone(), value)),
            None => match &descriptor.default {
                Some(InjectDefault::Value(value)) => {
                    resolved.push((descriptor.key.clone(), value.clone()));
                }
                Some(InjectDefault::Factory(factory)) => {
                    resolved.push((descriptor.key.clone(), factory(vm)));
                }
                None => dev_warn(&format!(
                    "Injection \"{}\" not found (component \"{}\")",
                    descriptor.key,
                    vm.name()
                )),
            },
        }
    }
    resolved
}

fn lookup_provided(vm: &ComponentInstance, from: &str) -> Option<Value> {
    let own = vm.provided();
    if let Some(map) = own {
        if map.contains_key(from) {
            return map.peek(from);
        }
    }
    let mut current = vm.parent();
    while let Some(instance) = current {
        let provided = instance.provided();
        if let Some(map) = provided {
            if map.contains_key(from) {
                return map.peek(from);
            }
        }
        current = instance.parent();
    }
    None
}

/// Resolve injections and install them on the instance fields.
///
/// Each resolved value is installed through [`define_reactive`] with a write
/// hook warning that injected values should not be mutated. Installation runs
/// under [`without_observing`], so resolved values are not deep-wrapped here;
/// values that already carry an Observer keep it.
pub fn init_injections(vm: &ComponentInstance) {
    let resolved = resolve_inject(vm);
    without_observing(|| {
        for (key, value) in resolved {
            let message = format!(
                "avoid mutating injected key \"{key}\"; \
                 provider re-renders will overwrite it"
            );
            let hook: WriteHook = Rc::new(move || dev_warn(&message));
            define_reactive(vm.fields(), &key, Some(value), Some(hook), false);
        }
    });
}

// =============================================================================
// TESTS
// =============================================================================
