//! Instances: objects produced from templates.

use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use thiserror::Error;

use tessella_events::{Evented, WithEvents};
use tessella_util::{merge_into, merged, JsonMap};

use crate::template::{InitHook, Template};

/// Errors from instance behavior invocation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassError {
    /// No behavior of that name anywhere in the template chain.
    #[error("template `{template}` has no method `{method}`")]
    MissingMethod { template: String, method: String },
}

struct InstanceInner {
    template: Template,
    /// Per-instance overrides only; unset keys resolve from the template.
    options: RefCell<JsonMap>,
    /// Free-form instance data for behaviors to keep between calls.
    state: RefCell<JsonMap>,
    init_hooks_called: Cell<bool>,
    events: Rc<Evented>,
}

/// A concrete object created from a [`Template`].
///
/// The handle is a cheap clone sharing one underlying object, so behaviors
/// and event listeners can capture the instance they run on. Holds a
/// per-instance options overlay (reads fall through to the template's
/// defaults), a free-form state map, the once-only init-hook flag, and the
/// evented state.
#[derive(Clone)]
pub struct Instance {
    inner: Rc<InstanceInner>,
}

impl Instance {
    pub(crate) fn from_template(template: Template, options: JsonMap) -> Self {
        Self {
            inner: Rc::new(InstanceInner {
                template,
                options: RefCell::new(options),
                state: RefCell::new(JsonMap::new()),
                init_hooks_called: Cell::new(false),
                events: Rc::new(Evented::new()),
            }),
        }
    }

    /// The template this instance was created from.
    pub fn template(&self) -> &Template {
        &self.inner.template
    }

    /// Invokes the named behavior, resolved child-first through the
    /// template chain.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, ClassError> {
        let Some(method) = self.inner.template.method(name) else {
            return Err(ClassError::MissingMethod {
                template: self.inner.template.name().to_string(),
                method: name.to_string(),
            });
        };
        Ok(method(self, args))
    }

    /// True if the named behavior exists anywhere in the chain.
    pub fn has_method(&self, name: &str) -> bool {
        self.inner.template.method(name).is_some()
    }

    /// Runs every init hook in the template chain, root ancestor first,
    /// most-derived last, exactly once per instance.
    ///
    /// The guard flag is set on entry, so reentrant construction logic
    /// cannot double-run hooks. A `Method` hook whose name resolves to
    /// nothing is warned about and skipped; construction never fails.
    pub fn run_init_hooks(&self) {
        if self.inner.init_hooks_called.get() {
            return;
        }
        self.inner.init_hooks_called.set(true);

        let mut chain = Vec::new();
        let mut current = Some(&self.inner.template);
        while let Some(template) = current {
            chain.push(template.clone());
            current = template.parent();
        }

        for template in chain.iter().rev() {
            for hook in template.init_hooks_snapshot() {
                match hook {
                    InitHook::Callback(f) => f(self),
                    InitHook::Method { name, args } => {
                        if let Err(err) = self.call(&name, &args) {
                            tracing::warn!("skipping init hook: {err}");
                        }
                    }
                }
            }
        }
    }

    /// Reads one option: the per-instance overlay first, then the
    /// template's defaults.
    pub fn option(&self, key: &str) -> Option<Value> {
        if let Some(v) = self.inner.options.borrow().get(key) {
            return Some(v.clone());
        }
        self.inner.template.option(key)
    }

    /// Overrides one option for this instance only.
    pub fn set_option(&self, key: impl Into<String>, value: Value) {
        self.inner.options.borrow_mut().insert(key.into(), value);
    }

    /// Merges a map of per-instance overrides.
    pub fn set_options(&self, options: &JsonMap) {
        merge_into(&mut self.inner.options.borrow_mut(), options);
    }

    /// The fully resolved options record: template defaults overlaid with
    /// this instance's overrides.
    pub fn options_snapshot(&self) -> JsonMap {
        let defaults = self.inner.template.options_snapshot();
        let own = self.inner.options.borrow();
        merged(&[&defaults, &*own])
    }

    /// Reads one free-form state entry.
    pub fn state(&self, key: &str) -> Option<Value> {
        self.inner.state.borrow().get(key).cloned()
    }

    /// Writes one free-form state entry.
    pub fn set_state(&self, key: impl Into<String>, value: Value) {
        self.inner.state.borrow_mut().insert(key.into(), value);
    }
}

impl WithEvents for Instance {
    fn events(&self) -> &Rc<Evented> {
        &self.inner.events
    }
}
