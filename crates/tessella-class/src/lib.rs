//! Behavioral templates for the tessella object model.
//!
//! A [`Template`] is a named set of instance behaviors, static values,
//! merged default options, and ordered initialization hooks. Templates form
//! single-inheritance chains built once at definition time; mixins
//! ([`BehaviorSet`]) are flattened in at extension time and keep no identity
//! of their own afterwards.
//!
//! An [`Instance`] created from a template resolves options through a
//! copy-on-write overlay over the template's defaults, runs the `initialize`
//! behavior and then every init hook in the chain (root ancestor first), and
//! composes [`tessella_events::Evented`] so it can fire and listen for
//! events.

pub mod instance;
pub mod options;
pub mod template;

pub use instance::{ClassError, Instance};
pub use options::{options_from_toml, OptionsError};
pub use template::{BehaviorSet, InitHook, MethodFn, Template, TemplateSpec};

// Re-export the pieces consumers need to work with evented instances.
pub use tessella_events::{Event, Evented, Listener, ListenerHandle, WithEvents};
pub use tessella_util::{JsonMap, Stamp};
