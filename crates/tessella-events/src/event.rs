//! Event records.

use serde::Serialize;
use serde_json::Value;
use tessella_util::{JsonMap, Stamp};

/// Ephemeral record built once per `fire` call and passed to every listener.
///
/// Targets are identified by [`Stamp`] rather than by object reference;
/// listeners that need the firing object itself capture it in their closure.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// The event type name this record was fired as.
    pub event_type: String,
    /// Caller-supplied payload.
    pub data: JsonMap,
    /// The object whose listeners are currently being invoked.
    pub target: Stamp,
    /// The object the event originated on. Identical to `target` unless the
    /// event reached this object through propagation; preserved across
    /// every propagation hop.
    pub source_target: Stamp,
    /// The immediate child the event propagated from, if any.
    pub propagated_from: Option<Stamp>,
}

impl Event {
    /// Looks up a payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// True if this record reached its target through propagation.
    pub fn propagated(&self) -> bool {
        self.propagated_from.is_some()
    }
}
