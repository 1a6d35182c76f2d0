//! Synchronization primitives.
//!
//! Thin wrappers over std or parking_lot mutexes, plus relaxed atomics for stats.

pub(crate) mod atomics;
pub(crate) mod mutex;
