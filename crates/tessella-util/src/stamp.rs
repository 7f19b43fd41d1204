//! Object identity stamping.
//!
//! Every object that participates in event propagation carries a unique
//! numeric stamp, assigned once and memoized for the object's lifetime.
//! Stamps are monotonically increasing across the whole process.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique numeric identity of an object.
///
/// Ordering follows assignment order, so iterating a map keyed by stamps
/// visits objects in the order they were stamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Stamp(u64);

impl Stamp {
    /// Returns the raw numeric value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

static NEXT_STAMP: AtomicU64 = AtomicU64::new(0);

/// Allocates the next stamp.
///
/// The counter starts at zero and the first stamp handed out is 1. The
/// read-and-increment is atomic, so the accessor stays correct if a second
/// thread of control is ever introduced.
pub fn next_stamp() -> Stamp {
    Stamp(NEXT_STAMP.fetch_add(1, Ordering::Relaxed) + 1)
}
