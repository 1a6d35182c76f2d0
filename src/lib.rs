//! # devmem
//!
//! Owned, checked device memory transfers for GPU accelerators.
//!
//! ## Features
//!
//! - Four operations: allocate, free, upload (host to device), download (device to host)
//! - RAII device buffers, released exactly once on every exit path
//! - Typed errors, with opt-in panic or process-exit failure policies
//! - Coded diagnostics (`DM001`..`DM901`) on stderr and through `log`
//! - Invariant checks that never let execution continue: `dm_assert!`, `dm_check!`
//! - CUDA (`gpu-cuda`) and Vulkan (`gpu-vulkan`) backends, plus a host-simulated
//!   backend with fault injection for tests
//! - Per-facade statistics, memory limit and leak reporting
//!
//! ## Quick Start
//!
//! ```rust
//! use devmem::{DeviceConfig, DeviceMemory, HostBackend};
//!
//! let memory = DeviceMemory::new(HostBackend::new(), DeviceConfig::default());
//!
//! let host: Vec<u8> = (0x11..=0xAA).collect();
//! let mut buffer = memory.allocate(host.len())?;
//! memory.upload(&host, &mut buffer, host.len())?;
//!
//! let mut readback = vec![0u8; host.len()];
//! memory.download(&buffer, &mut readback, host.len())?;
//! assert_eq!(readback, host);
//!
//! buffer.free()?;
//! # Ok::<(), devmem::DeviceError>(())
//! ```
//!
//! With the `gpu-cuda` feature, swap the backend:
//!
//! ```rust,ignore
//! use devmem::gpu::cuda::CudaBackend;
//!
//! let memory = DeviceMemory::new(CudaBackend::new(0)?, DeviceConfig::from_env());
//! ```

pub mod api;
pub mod diagnostics;
pub mod gpu;

#[allow(dead_code)]
mod core;
#[allow(dead_code)]
mod sync;
#[allow(dead_code)]
mod util;

#[cfg(feature = "debug")]
pub mod debug;

// Re-export public API at crate root for convenience
pub use api::buffer::DeviceBuffer;
pub use api::config::{DeviceConfig, FailurePolicy};
pub use api::error::{DeviceError, Result};
pub use api::memory::DeviceMemory;
pub use api::stats::DeviceStats;
pub use api::transfer::{Operation, TransferDirection};
pub use core::registry::LiveAllocation;

// Backends
pub use gpu::{BackendCall, BackendError, DeviceBackend, DevicePtr, HostBackend, MemInfo};

// Diagnostics - Core types and predefined codes
pub use diagnostics::{AssertionFailure, DiagContext, Diagnostic, DiagnosticKind};
pub use diagnostics::{CollectingSink, DiagnosticSink, DeviceEvent, DeviceHooks};
pub use diagnostics::{StrictMode, set_strict_mode, StrictModeGuard};
pub use diagnostics::{DM001, DM002, DM003, DM004, DM101, DM102, DM201, DM301, DM401, DM901};

// Size helpers
pub use util::size::{format_bytes, gb, kb, mb};
