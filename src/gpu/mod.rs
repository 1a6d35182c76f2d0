//! Device backends
//!
//! The facade talks to accelerator memory only through [`DeviceBackend`].
//!
//! ## Backends
//! - `host`: simulated device memory in RAM (always available)
//! - `cuda`: CUDA driver API via the `cudarc` crate (enable `gpu-cuda` feature)
//! - `vulkan`: host-visible Vulkan buffers via the `ash` crate (enable `gpu-vulkan` feature)

// Always present for API stability: traits define the interface
pub mod traits;
pub use traits::{BackendError, DeviceBackend, DevicePtr, MemInfo};

// Simulated backend for testing (always available)
pub mod host;
pub use host::{BackendCall, HostBackend};

// Hardware backends are conditionally compiled
#[cfg(feature = "gpu-cuda")]
pub mod cuda;

#[cfg(feature = "gpu-vulkan")]
pub mod vulkan;
