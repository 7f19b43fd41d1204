//! Shallow merging of JSON maps.
//!
//! Options objects and event payloads are plain `serde_json` maps. Merging
//! is always shallow: later sources overwrite earlier keys wholesale, nested
//! objects are replaced rather than recursed into.

use serde_json::{Map, Value};

/// The map type used for options objects and event payloads.
pub type JsonMap = Map<String, Value>;

/// Shallow-merges `src` into `dest`, overwriting existing keys.
pub fn merge_into(dest: &mut JsonMap, src: &JsonMap) {
    for (key, value) in src {
        dest.insert(key.clone(), value.clone());
    }
}

/// Builds a fresh map from `sources`, merged left to right.
pub fn merged(sources: &[&JsonMap]) -> JsonMap {
    let mut out = JsonMap::new();
    for src in sources {
        merge_into(&mut out, src);
    }
    out
}
