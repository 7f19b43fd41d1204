//! Event dispatch, registry mutation, and propagation to event parents.

use std::cell::{Cell, OnceCell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use tessella_util::{next_stamp, split_words, JsonMap, Stamp};

use crate::event::Event;
use crate::listener::{Listener, ListenerEntry, ListenerHandle, ListenerId};

/// Per-object event state: listener registry, firing counter, and event
/// parent edges.
///
/// All state is behind interior mutability and every method takes `&self`,
/// so a listener running inside `fire` can freely call back into the same
/// object. `Evented` is meant to live behind an `Rc`; event-parent edges
/// hold `Weak` back-references and never keep a parent alive.
#[derive(Default)]
pub struct Evented {
    stamp: OnceCell<Stamp>,
    next_listener_id: Cell<u64>,
    /// The per-type `Rc<Vec<..>>` is the copy-on-write unit: `fire` iterates
    /// a cheap clone of it, and any removal while that pass is in flight
    /// replaces the vec in the map instead of mutating the one being walked.
    listeners: RefCell<HashMap<String, Rc<Vec<Rc<ListenerEntry>>>>>,
    /// Incremented on entry to each listener loop, decremented on exit.
    firing_count: Cell<u32>,
    /// Keyed by stamp, so fan-out order follows parent registration order.
    event_parents: RefCell<BTreeMap<Stamp, Weak<Evented>>>,
}

impl Evented {
    pub fn new() -> Self {
        Self::default()
    }

    /// The object's unique identity, assigned on first use.
    pub fn stamp(&self) -> Stamp {
        *self.stamp.get_or_init(next_stamp)
    }

    /// Registers `listener` for each whitespace-separated type in `types`.
    ///
    /// Registering a callback that is already present for a type (same
    /// allocation, same context) is a no-op; the returned handle names the
    /// existing entry. A blank `types` string is warned about and ignored.
    pub fn on(&self, types: &str, listener: Listener, context: Option<Stamp>) -> ListenerHandle {
        self.add_split(types, listener, context, false)
    }

    /// Like [`on`](Self::on), but the listener is unregistered immediately
    /// before its first invocation.
    pub fn once(&self, types: &str, listener: Listener, context: Option<Stamp>) -> ListenerHandle {
        self.add_split(types, listener, context, true)
    }

    /// Registers many type/listener pairs sharing one context.
    ///
    /// Type keys are taken verbatim, without whitespace splitting; this is
    /// the hot path for objects that attach their whole handler table at
    /// construction time.
    pub fn on_many(&self, pairs: &[(&str, Listener)], context: Option<Stamp>) -> ListenerHandle {
        self.add_many(pairs, context, false)
    }

    /// Mapping form of [`once`](Self::once).
    pub fn once_many(&self, pairs: &[(&str, Listener)], context: Option<Stamp>) -> ListenerHandle {
        self.add_many(pairs, context, true)
    }

    /// Removes every listener of each whitespace-separated type in `types`.
    pub fn off(&self, types: &str) {
        let tokens = split_words(types);
        if tokens.is_empty() {
            tracing::warn!("off called with empty event type list");
            return;
        }
        for event_type in tokens {
            self.remove_type(event_type);
        }
    }

    /// Removes the first entry matching `listener` and `context` for each
    /// named type. Removing an absent listener is a silent no-op.
    pub fn off_listener(&self, types: &str, listener: &Listener, context: Option<Stamp>) {
        let tokens = split_words(types);
        if tokens.is_empty() {
            tracing::warn!("off_listener called with empty event type list");
            return;
        }
        for event_type in tokens {
            self.remove_listener(event_type, listener, context);
        }
    }

    /// Removes exactly the entries a registration call returned.
    pub fn off_handle(&self, handle: &ListenerHandle) {
        for (event_type, id) in handle.entries() {
            self.remove_by_id(event_type, *id);
        }
    }

    /// Clears the entire registry, every type at once.
    pub fn off_all(&self) {
        let removed: Vec<_> = self.listeners.borrow_mut().drain().collect();
        if self.firing_count.get() > 0 {
            for (_, entries) in &removed {
                for entry in entries.iter() {
                    *entry.callback.borrow_mut() = Listener::noop();
                }
            }
        }
    }

    /// Fires an event of `event_type` with the given payload.
    ///
    /// Returns without building an event record when nothing is listening,
    /// locally or (when `propagate` is set) anywhere among transitive event
    /// parents. Listeners run in registration order, each receiving the same
    /// record. With `propagate`, the event is re-fired on every event parent
    /// after local dispatch completes, preserving the original
    /// `source_target` across hops.
    pub fn fire(&self, event_type: &str, data: JsonMap, propagate: bool) {
        let mut path = Vec::new();
        self.fire_guarded(event_type, data, None, None, propagate, &mut path);
    }

    /// True if any listener is attached for `event_type`, checking event
    /// parents transitively when `propagate` is set.
    pub fn listens(&self, event_type: &str, propagate: bool) -> bool {
        if event_type.trim().is_empty() {
            tracing::warn!("listens called with a blank event type");
            return false;
        }
        let mut path = Vec::new();
        self.listens_guarded(event_type, None, propagate, &mut path)
    }

    /// True if this specific `listener`/`context` pair is attached for
    /// `event_type`, checking event parents when `propagate` is set.
    pub fn listens_listener(
        &self,
        event_type: &str,
        listener: &Listener,
        context: Option<Stamp>,
        propagate: bool,
    ) -> bool {
        let mut path = Vec::new();
        self.listens_guarded(event_type, Some((listener, context)), propagate, &mut path)
    }

    /// Registers `parent` to receive propagated copies of this object's
    /// events. The edge is a `Weak` back-reference; it never keeps the
    /// parent alive and never touches the parent's own listeners.
    pub fn add_event_parent(&self, parent: &Rc<Evented>) {
        self.event_parents
            .borrow_mut()
            .insert(parent.stamp(), Rc::downgrade(parent));
    }

    /// Removes a propagation edge. Absent edges are a silent no-op.
    pub fn remove_event_parent(&self, parent: &Evented) {
        self.event_parents.borrow_mut().remove(&parent.stamp());
    }

    fn add_split(
        &self,
        types: &str,
        listener: Listener,
        context: Option<Stamp>,
        once: bool,
    ) -> ListenerHandle {
        let tokens = split_words(types);
        if tokens.is_empty() {
            tracing::warn!("listener registered with empty event type list");
            return ListenerHandle::default();
        }
        let mut handle = ListenerHandle::default();
        for event_type in tokens {
            let id = self.add_listener(event_type, listener.clone(), context, once);
            handle.entries.push((event_type.to_string(), id));
        }
        handle
    }

    fn add_many(
        &self,
        pairs: &[(&str, Listener)],
        context: Option<Stamp>,
        once: bool,
    ) -> ListenerHandle {
        let mut handle = ListenerHandle::default();
        for (event_type, listener) in pairs {
            let id = self.add_listener(event_type, listener.clone(), context, once);
            handle.entries.push((event_type.to_string(), id));
        }
        handle
    }

    fn add_listener(
        &self,
        event_type: &str,
        listener: Listener,
        context: Option<Stamp>,
        once: bool,
    ) -> ListenerId {
        let context = self.normalize_context(context);
        if let Some(existing) = self.find_entry(event_type, &listener, context) {
            return existing;
        }

        let id = ListenerId(self.next_listener_id.get());
        self.next_listener_id.set(id.0 + 1);
        let entry = Rc::new(ListenerEntry {
            id,
            callback: RefCell::new(listener),
            context,
            once,
        });

        let mut map = self.listeners.borrow_mut();
        let slot = map
            .entry(event_type.to_string())
            .or_insert_with(|| Rc::new(Vec::new()));
        Rc::make_mut(slot).push(entry);
        id
    }

    /// A context equal to the object's own stamp carries no information and
    /// is stored as `None`.
    fn normalize_context(&self, context: Option<Stamp>) -> Option<Stamp> {
        context.filter(|c| *c != self.stamp())
    }

    fn find_entry(
        &self,
        event_type: &str,
        listener: &Listener,
        context: Option<Stamp>,
    ) -> Option<ListenerId> {
        let map = self.listeners.borrow();
        let entries = map.get(event_type)?;
        entries
            .iter()
            .find(|e| e.matches(listener, context))
            .map(|e| e.id)
    }

    fn remove_type(&self, event_type: &str) {
        let removed = self.listeners.borrow_mut().remove(event_type);
        if let Some(entries) = removed {
            if self.firing_count.get() > 0 {
                for entry in entries.iter() {
                    *entry.callback.borrow_mut() = Listener::noop();
                }
            }
        }
    }

    fn remove_listener(&self, event_type: &str, listener: &Listener, context: Option<Stamp>) {
        let context = self.normalize_context(context);
        let mut map = self.listeners.borrow_mut();
        let Some(slot) = map.get_mut(event_type) else {
            return;
        };
        let Some(pos) = slot.iter().position(|e| e.matches(listener, context)) else {
            return;
        };
        Self::splice_out(slot, pos, self.firing_count.get() > 0);
    }

    fn remove_by_id(&self, event_type: &str, id: ListenerId) {
        let mut map = self.listeners.borrow_mut();
        let Some(slot) = map.get_mut(event_type) else {
            return;
        };
        let Some(pos) = slot.iter().position(|e| e.id == id) else {
            return;
        };
        Self::splice_out(slot, pos, self.firing_count.get() > 0);
    }

    fn splice_out(slot: &mut Rc<Vec<Rc<ListenerEntry>>>, pos: usize, firing: bool) {
        if firing {
            // Tombstone first: the entry is shared with any in-flight
            // snapshot, which must see the no-op instead of the callback.
            *slot[pos].callback.borrow_mut() = Listener::noop();
        }
        // Rc::make_mut leaves an in-flight snapshot holding the old vec.
        Rc::make_mut(slot).remove(pos);
    }

    fn live_parents(&self) -> Vec<Rc<Evented>> {
        self.event_parents
            .borrow()
            .values()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// `path` holds the stamps of every object on the current propagation
    /// chain. A parent already on the chain is skipped, which terminates
    /// parent cycles; parents reached along distinct chains (a diamond)
    /// still each receive the event.
    fn listens_guarded(
        &self,
        event_type: &str,
        listener: Option<(&Listener, Option<Stamp>)>,
        propagate: bool,
        path: &mut Vec<Stamp>,
    ) -> bool {
        {
            let map = self.listeners.borrow();
            if let Some(entries) = map.get(event_type) {
                match listener {
                    None => {
                        if !entries.is_empty() {
                            return true;
                        }
                    }
                    Some((l, context)) => {
                        let context = self.normalize_context(context);
                        if entries.iter().any(|e| e.matches(l, context)) {
                            return true;
                        }
                    }
                }
            }
        }

        if propagate {
            path.push(self.stamp());
            for parent in self.live_parents() {
                if path.contains(&parent.stamp()) {
                    continue;
                }
                if parent.listens_guarded(event_type, listener, true, path) {
                    path.pop();
                    return true;
                }
            }
            path.pop();
        }
        false
    }

    fn fire_guarded(
        &self,
        event_type: &str,
        data: JsonMap,
        source: Option<Stamp>,
        from: Option<Stamp>,
        propagate: bool,
        path: &mut Vec<Stamp>,
    ) {
        if !self.listens_guarded(event_type, None, propagate, path) {
            return;
        }

        let event = Event {
            event_type: event_type.to_string(),
            data,
            target: self.stamp(),
            source_target: source.unwrap_or_else(|| self.stamp()),
            propagated_from: from,
        };

        let snapshot = self.listeners.borrow().get(event_type).cloned();
        if let Some(entries) = snapshot {
            self.firing_count.set(self.firing_count.get() + 1);
            for entry in entries.iter() {
                // Removal rewrites the callback cell, so take our copy first.
                let callback = entry.callback.borrow().clone();
                if entry.once {
                    // Unregister before invoking, so a listener re-adding
                    // itself from its own callback stays registered.
                    self.remove_by_id(event_type, entry.id);
                }
                callback.call(&event);
            }
            self.firing_count.set(self.firing_count.get() - 1);
        }

        if propagate {
            path.push(self.stamp());
            for parent in self.live_parents() {
                if path.contains(&parent.stamp()) {
                    continue;
                }
                parent.fire_guarded(
                    &event.event_type,
                    event.data.clone(),
                    Some(event.source_target),
                    Some(self.stamp()),
                    true,
                    path,
                );
            }
            path.pop();
        }
    }
}

/// The evented behavior set.
///
/// Implementing the single accessor mixes the full event API into a type;
/// every provided method delegates to the owned [`Evented`].
pub trait WithEvents {
    fn events(&self) -> &Rc<Evented>;

    fn stamp(&self) -> Stamp {
        self.events().stamp()
    }

    fn on(&self, types: &str, listener: Listener, context: Option<Stamp>) -> ListenerHandle {
        self.events().on(types, listener, context)
    }

    fn once(&self, types: &str, listener: Listener, context: Option<Stamp>) -> ListenerHandle {
        self.events().once(types, listener, context)
    }

    fn on_many(&self, pairs: &[(&str, Listener)], context: Option<Stamp>) -> ListenerHandle {
        self.events().on_many(pairs, context)
    }

    fn off(&self, types: &str) {
        self.events().off(types)
    }

    fn off_listener(&self, types: &str, listener: &Listener, context: Option<Stamp>) {
        self.events().off_listener(types, listener, context)
    }

    fn off_handle(&self, handle: &ListenerHandle) {
        self.events().off_handle(handle)
    }

    fn off_all(&self) {
        self.events().off_all()
    }

    fn fire(&self, event_type: &str, data: JsonMap, propagate: bool) {
        self.events().fire(event_type, data, propagate)
    }

    fn listens(&self, event_type: &str, propagate: bool) -> bool {
        self.events().listens(event_type, propagate)
    }

    fn add_event_parent(&self, parent: &Rc<Evented>) {
        self.events().add_event_parent(parent)
    }

    fn remove_event_parent(&self, parent: &Evented) {
        self.events().remove_event_parent(parent)
    }
}
