//! Debug utilities for tracking device allocations.
//!
//! Only compiled when the `debug` feature is enabled.

pub(crate) mod backtrace;
pub mod poison;

pub use poison::UNINIT_PATTERN;
