//! Publish/subscribe event engine for the tessella object model.
//!
//! [`Evented`] owns a per-object listener registry and a set of event-parent
//! edges. Dispatch is synchronous and single-threaded: `fire` does not
//! return until every matching listener, and all transitive propagation to
//! event parents, has completed. Listeners may add or remove listeners of
//! the type being dispatched; an in-flight pass never invokes an entry
//! removed from under it.
//!
//! Types that want the behavior implement [`WithEvents`] and delegate to an
//! owned `Rc<Evented>`.

pub mod event;
pub mod evented;
pub mod listener;

pub use event::Event;
pub use evented::{Evented, WithEvents};
pub use listener::{Listener, ListenerHandle, ListenerId};
