//! Listener callbacks, identity tokens, and registry entries.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tessella_util::Stamp;

use crate::event::Event;

/// A registered event callback.
///
/// Cloning is cheap and preserves identity: two clones of the same
/// `Listener` compare equal under [`Listener::ptr_eq`], so the same value
/// can be kept for a later `off_listener` call.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&Event)>);

impl Listener {
    /// Wraps a callback.
    pub fn new(f: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Identity comparison: true if both values wrap the same allocation.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub(crate) fn call(&self, event: &Event) {
        (self.0)(event)
    }

    /// The tombstone installed in place of a listener removed while a
    /// dispatch over it is in flight.
    pub(crate) fn noop() -> Self {
        Self::new(|_| {})
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Listener(..)")
    }
}

/// Token identifying one registry entry within one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// The entries one `on`/`once`/`on_many` call created, one per event type.
///
/// Returned so callers can remove exactly what they registered without
/// holding on to the callback value.
#[derive(Debug, Clone, Default)]
pub struct ListenerHandle {
    pub(crate) entries: Vec<(String, ListenerId)>,
}

impl ListenerHandle {
    /// True if the registration call added (or matched) no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `(event type, id)` pairs this handle covers.
    pub fn entries(&self) -> &[(String, ListenerId)] {
        &self.entries
    }
}

/// One row of the per-type listener list.
pub(crate) struct ListenerEntry {
    pub(crate) id: ListenerId,
    /// Rewritten to [`Listener::noop`] when the entry is removed while a
    /// dispatch over the containing list is in flight.
    pub(crate) callback: RefCell<Listener>,
    /// Normalized: a context equal to the owning object's own stamp is
    /// stored as `None`.
    pub(crate) context: Option<Stamp>,
    pub(crate) once: bool,
}

impl ListenerEntry {
    pub(crate) fn matches(&self, listener: &Listener, context: Option<Stamp>) -> bool {
        Listener::ptr_eq(&self.callback.borrow(), listener) && self.context == context
    }
}
