//! Template composition: extension chains, mixins, and init hooks.

use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tessella_util::{merge_into, JsonMap};

use crate::instance::Instance;
use crate::options::{options_from_toml, OptionsError};

/// An instance behavior: a callback invoked with the instance and the
/// caller's arguments. The [`Instance`] handle is cheap to clone, so a
/// behavior can capture it into listeners it registers.
pub type MethodFn = Rc<dyn Fn(&Instance, &[Value]) -> Value>;

/// A mixin: behaviors (and, for [`Template::include`], options) merged into
/// a template without establishing an inheritance relationship.
#[derive(Clone, Default)]
pub struct BehaviorSet {
    pub(crate) methods: HashMap<String, MethodFn>,
    pub(crate) options: JsonMap,
}

impl BehaviorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a behavior to the set.
    pub fn method(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Instance, &[Value]) -> Value + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Rc::new(f));
        self
    }

    /// Adds an options entry, consumed only by [`Template::include`].
    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

/// One initialization hook.
///
/// The `Method` form is resolved against the concrete instance's method
/// chain when the hook runs, so a subclass override wins over the method
/// visible where the hook was registered.
#[derive(Clone)]
pub enum InitHook {
    Callback(Rc<dyn Fn(&Instance)>),
    Method { name: String, args: Vec<Value> },
}

/// Everything a template extension supplies: statics, mixins, behaviors,
/// and default options.
#[derive(Default)]
pub struct TemplateSpec {
    name: String,
    statics: JsonMap,
    includes: Vec<BehaviorSet>,
    methods: HashMap<String, MethodFn>,
    options: JsonMap,
}

impl TemplateSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a static value, attached to the template itself rather than to
    /// instances.
    pub fn static_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.statics.insert(key.into(), value);
        self
    }

    /// Appends a mixin. Later includes override earlier ones on conflict;
    /// the spec's own behaviors override all includes.
    pub fn include(mut self, set: BehaviorSet) -> Self {
        self.includes.push(set);
        self
    }

    /// Adds an instance behavior. The `initialize` behavior, if present, is
    /// called with the constructor arguments when an instance is created.
    pub fn method(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Instance, &[Value]) -> Value + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Rc::new(f));
        self
    }

    /// Adds a default options entry.
    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Merges a whole default options map.
    pub fn options(mut self, options: JsonMap) -> Self {
        merge_into(&mut self.options, &options);
        self
    }
}

struct TemplateInner {
    name: String,
    parent: Option<Template>,
    methods: RefCell<HashMap<String, MethodFn>>,
    statics: JsonMap,
    options: RefCell<JsonMap>,
    init_hooks: RefCell<Vec<InitHook>>,
}

/// A behavioral template ("class"): instance behaviors, statics, merged
/// default options, and this template's own ordered init hooks.
///
/// The handle is a cheap clone sharing one underlying definition. Templates
/// are built once at definition time and are effectively immutable
/// afterwards, except for [`include`](Self::include),
/// [`merge_options`](Self::merge_options), and
/// [`add_init_hook`](Self::add_init_hook), which mutate in place and affect
/// instances created afterwards (and, through option fall-through and chain
/// method lookup, unset keys of existing instances as well).
#[derive(Clone)]
pub struct Template {
    inner: Rc<TemplateInner>,
}

impl Template {
    /// Defines a root template with no parent.
    pub fn define(spec: TemplateSpec) -> Template {
        Self::compose(None, spec)
    }

    /// Extends this template, producing a child.
    ///
    /// The child's default options are this template's defaults cloned and
    /// then overridden by the spec's options, so mutating the child's
    /// defaults never reaches the parent. The child starts with an empty
    /// init-hook list of its own; hook *execution* still walks the whole
    /// chain at construction time.
    pub fn extend(&self, spec: TemplateSpec) -> Template {
        Self::compose(Some(self.clone()), spec)
    }

    fn compose(parent: Option<Template>, spec: TemplateSpec) -> Template {
        // Flatten mixins first so the spec's own behaviors win on conflict.
        let mut methods = HashMap::new();
        for set in &spec.includes {
            for (name, f) in &set.methods {
                methods.insert(name.clone(), f.clone());
            }
        }
        for (name, f) in spec.methods {
            methods.insert(name, f);
        }

        // Copy-then-override options policy. Options carried by extend-time
        // includes do not participate; only include() merges those.
        let mut options = parent
            .as_ref()
            .map(|p| p.inner.options.borrow().clone())
            .unwrap_or_default();
        merge_into(&mut options, &spec.options);

        Template {
            inner: Rc::new(TemplateInner {
                name: spec.name,
                parent,
                methods: RefCell::new(methods),
                statics: spec.statics,
                options: RefCell::new(options),
                init_hooks: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn parent(&self) -> Option<&Template> {
        self.inner.parent.as_ref()
    }

    /// Mutates this template in place: behaviors are merged in, and any
    /// options the set carries are merged *additively* into the existing
    /// defaults.
    ///
    /// This is deliberately a different merge policy from
    /// [`extend`](Self::extend)'s copy-then-override: consumers depend on
    /// both behaviors, so the asymmetry is part of the contract.
    pub fn include(&self, behaviors: BehaviorSet) {
        {
            let mut methods = self.inner.methods.borrow_mut();
            for (name, f) in behaviors.methods {
                methods.insert(name, f);
            }
        }
        if !behaviors.options.is_empty() {
            merge_into(&mut self.inner.options.borrow_mut(), &behaviors.options);
        }
    }

    /// Shallow-merges `options` into this template's defaults in place.
    pub fn merge_options(&self, options: &JsonMap) {
        merge_into(&mut self.inner.options.borrow_mut(), options);
    }

    /// Parses TOML text and merges the result into this template's
    /// defaults.
    pub fn merge_options_from_toml(&self, text: &str) -> Result<(), OptionsError> {
        let parsed = options_from_toml(text)?;
        merge_into(&mut self.inner.options.borrow_mut(), &parsed);
        Ok(())
    }

    /// Appends a hook to this template's own hook list.
    pub fn add_init_hook(&self, hook: InitHook) {
        self.inner.init_hooks.borrow_mut().push(hook);
    }

    /// Hook form invoked directly with the instance.
    pub fn add_init_hook_fn(&self, f: impl Fn(&Instance) + 'static) {
        self.add_init_hook(InitHook::Callback(Rc::new(f)));
    }

    /// Hook form that invokes the named behavior on the instance, resolved
    /// polymorphically when the hook runs.
    pub fn add_init_hook_method(&self, name: impl Into<String>, args: Vec<Value>) {
        self.add_init_hook(InitHook::Method {
            name: name.into(),
            args,
        });
    }

    /// Looks up a behavior, child first, walking the parent chain.
    pub fn method(&self, name: &str) -> Option<MethodFn> {
        if let Some(f) = self.inner.methods.borrow().get(name) {
            return Some(f.clone());
        }
        self.parent().and_then(|p| p.method(name))
    }

    /// Looks up a static value, child first, walking the parent chain.
    pub fn static_value(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.inner.statics.get(name) {
            return Some(v.clone());
        }
        self.parent().and_then(|p| p.static_value(name))
    }

    /// Reads one default option.
    pub fn option(&self, key: &str) -> Option<Value> {
        self.inner.options.borrow().get(key).cloned()
    }

    /// The template's merged default options.
    pub fn options_snapshot(&self) -> JsonMap {
        self.inner.options.borrow().clone()
    }

    pub(crate) fn init_hooks_snapshot(&self) -> Vec<InitHook> {
        self.inner.init_hooks.borrow().clone()
    }

    /// Creates an instance: empty options overlay, `initialize` behavior
    /// (if any in the chain) called with `args`, then every init hook in
    /// the chain, root ancestor first.
    pub fn instantiate(&self, args: &[Value]) -> Instance {
        self.instantiate_with_options(JsonMap::new(), args)
    }

    /// Like [`instantiate`](Self::instantiate), but seeds the per-instance
    /// options overlay before `initialize` runs.
    pub fn instantiate_with_options(&self, options: JsonMap, args: &[Value]) -> Instance {
        let instance = Instance::from_template(self.clone(), options);
        if let Some(init) = self.method("initialize") {
            init(&instance, args);
        }
        instance.run_init_hooks();
        instance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf_template() -> Template {
        Template::define(TemplateSpec::new("Leaf"))
    }

    #[test]
    fn options_inherit_and_override_down_the_chain() {
        let base = Template::define(TemplateSpec::new("Base").option("a", json!(1)));
        let child = base.extend(TemplateSpec::new("Child").option("b", json!(2)));
        let grandchild = child.extend(TemplateSpec::new("Grandchild").option("a", json!(9)));

        let instance = grandchild.instantiate(&[]);
        assert_eq!(instance.option("a"), Some(json!(9)));
        assert_eq!(instance.option("b"), Some(json!(2)));

        // overriding in the grandchild never mutated the ancestors
        assert_eq!(base.option("a"), Some(json!(1)));
        assert_eq!(child.option("a"), Some(json!(1)));
    }

    #[test]
    fn extend_copies_parent_options() {
        let base = Template::define(TemplateSpec::new("Base").option("a", json!(1)));
        let child = base.extend(TemplateSpec::new("Child"));
        child.merge_options(&[("a".to_string(), json!(5))].into_iter().collect());

        assert_eq!(child.option("a"), Some(json!(5)));
        assert_eq!(base.option("a"), Some(json!(1)));
    }

    #[test]
    fn include_merges_options_additively() {
        let base = Template::define(TemplateSpec::new("Base").option("a", json!(1)));
        base.include(
            BehaviorSet::new()
                .option("b", json!(2))
                .method("noop", |_, _| Value::Null),
        );

        // additive: existing defaults survive, new keys land beside them
        assert_eq!(base.option("a"), Some(json!(1)));
        assert_eq!(base.option("b"), Some(json!(2)));
    }

    #[test]
    fn extend_time_include_options_do_not_participate() {
        let base = Template::define(TemplateSpec::new("Base"));
        let child = base.extend(
            TemplateSpec::new("Child").include(BehaviorSet::new().option("ghost", json!(true))),
        );
        assert_eq!(child.option("ghost"), None);
    }

    #[test]
    fn later_includes_and_own_methods_win() {
        let first = BehaviorSet::new().method("who", |_, _| json!("first"));
        let second = BehaviorSet::new().method("who", |_, _| json!("second"));

        let by_include = Template::define(
            TemplateSpec::new("ByInclude")
                .include(first.clone())
                .include(second.clone()),
        );
        let instance = by_include.instantiate(&[]);
        assert_eq!(instance.call("who", &[]).unwrap(), json!("second"));

        let by_own = Template::define(
            TemplateSpec::new("ByOwn")
                .include(first)
                .include(second)
                .method("who", |_, _| json!("own")),
        );
        let instance = by_own.instantiate(&[]);
        assert_eq!(instance.call("who", &[]).unwrap(), json!("own"));
    }

    #[test]
    fn method_lookup_walks_the_chain() {
        let base =
            Template::define(TemplateSpec::new("Base").method("greet", |_, _| json!("base")));
        let child = base.extend(TemplateSpec::new("Child"));
        let overriding =
            child.extend(TemplateSpec::new("Override").method("greet", |_, _| json!("override")));

        assert_eq!(
            child.instantiate(&[]).call("greet", &[]).unwrap(),
            json!("base")
        );
        assert_eq!(
            overriding.instantiate(&[]).call("greet", &[]).unwrap(),
            json!("override")
        );
    }

    #[test]
    fn post_hoc_include_reaches_existing_subclasses() {
        let base = Template::define(TemplateSpec::new("Base"));
        let child = base.extend(TemplateSpec::new("Child"));
        let instance = child.instantiate(&[]);
        assert!(instance.call("late", &[]).is_err());

        base.include(BehaviorSet::new().method("late", |_, _| json!("here")));
        assert_eq!(instance.call("late", &[]).unwrap(), json!("here"));
    }

    #[test]
    fn statics_inherit_through_the_chain() {
        let base =
            Template::define(TemplateSpec::new("Base").static_value("kind", json!("overlay")));
        let child = base.extend(TemplateSpec::new("Child"));
        let shadowing =
            base.extend(TemplateSpec::new("Shadow").static_value("kind", json!("marker")));

        assert_eq!(child.static_value("kind"), Some(json!("overlay")));
        assert_eq!(shadowing.static_value("kind"), Some(json!("marker")));
        assert_eq!(child.static_value("absent"), None);
    }

    #[test]
    fn merge_options_shows_through_to_existing_instances() {
        let template = leaf_template();
        let instance = template.instantiate(&[]);
        assert_eq!(instance.option("tint"), None);

        template.merge_options(&[("tint".to_string(), json!("red"))].into_iter().collect());
        // unset keys fall through to the template's defaults without copying
        assert_eq!(instance.option("tint"), Some(json!("red")));

        instance.set_option("tint", json!("blue"));
        template.merge_options(&[("tint".to_string(), json!("green"))].into_iter().collect());
        // overridden keys no longer fall through
        assert_eq!(instance.option("tint"), Some(json!("blue")));
    }

    #[test]
    fn toml_options_merge_like_any_other_payload() {
        let template = leaf_template();
        template
            .merge_options_from_toml("opacity = 0.5\nlabel = \"pier\"")
            .unwrap();
        assert_eq!(template.option("opacity"), Some(json!(0.5)));
        assert_eq!(template.option("label"), Some(json!("pier")));

        assert!(template.merge_options_from_toml("not valid toml =").is_err());
    }
}
