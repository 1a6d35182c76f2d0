//! Diagnostics, assertions and event hooks.
//!
//! This module provides:
//! - **Runtime diagnostics**: coded error messages for every failure path
//! - **Assertions**: `dm_assert!`, `dm_check!`, `dm_debug_assert!`
//! - **Hooks**: event listeners and diagnostic sinks per facade
//! - **Strict mode**: optional panic-on-diagnostic for CI
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                           |
//! |-------|-----------------------------------|
//! | DM0xx | External device API failures      |
//! | DM1xx | Size and length contract          |
//! | DM2xx | Handle ownership                  |
//! | DM3xx | Memory limits                     |
//! | DM4xx | Lifetimes and leaks               |
//! | DM9xx | Assertions                        |
//!
//! ## Usage
//!
//! ```rust
//! use devmem::{dm_assert, dm_check, dm_emit};
//!
//! dm_emit!(DM401, "2 handles detached");
//!
//! let staged = 4096usize;
//! dm_assert!(staged % 256 == 0, "staging must be 256-byte aligned");
//! assert!(dm_check!(staged < 1024).is_err());
//! ```

// Core diagnostic types
pub mod assert;
pub mod context;
pub mod emit;
pub mod kind;
pub mod macros;
pub mod strict;

// Application integration
mod hooks;

// Re-export core types
pub use assert::AssertionFailure;
pub use context::DiagContext;
pub use emit::{emit, emit_with_context, render, set_verbose, suppress_diagnostics};
pub use emit::{CollectedDiagnostic, CollectingSink, DiagnosticSink};
pub use kind::{Diagnostic, DiagnosticKind};
pub use strict::{init_from_env, set_strict_mode, strict_mode, StrictMode, StrictModeGuard};

// Re-export predefined diagnostics
pub use kind::{DM001, DM002, DM003, DM004, DM101, DM102, DM201, DM301, DM401, DM901};

// Hooks
pub use hooks::{DeviceEvent, DeviceHooks};
