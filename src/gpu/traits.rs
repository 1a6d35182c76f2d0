//! Device backend traits and types
//!
//! This module defines the interface to the external accelerator memory API WITHOUT
//! pulling in any backend-specific dependencies. The facade depends on these traits,
//! not on CUDA or Vulkan directly.

use std::fmt;

/// Raw device address as handed out by a backend.
///
/// Same width as CUDA's `CUdeviceptr`. A `DevicePtr` carries no ownership;
/// [`DeviceBuffer`](crate::DeviceBuffer) is the owned handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DevicePtr(u64);

impl DevicePtr {
    /// Wrap a raw device address.
    pub const fn from_raw(addr: u64) -> Self {
        Self(addr)
    }

    /// The raw device address.
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DevicePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Errors reported by a device backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The device could not satisfy the allocation
    OutOfMemory {
        /// Bytes requested
        requested: usize,
    },
    /// The handle was never allocated by this backend, or was already freed
    InvalidHandle(DevicePtr),
    /// The copy would run past the end of the device allocation
    OutOfRange {
        /// Device allocation size in bytes
        capacity: usize,
        /// Bytes the copy wanted to touch
        requested: usize,
    },
    /// Error code and description from the external API
    Api {
        /// Backend-specific result code
        code: i64,
        /// Human-readable description from the API
        message: String,
    },
}

impl BackendError {
    /// Build an API error from a result code and its description.
    pub fn api(code: i64, message: impl Into<String>) -> Self {
        BackendError::Api {
            code,
            message: message.into(),
        }
    }

    /// Whether this error means the device ran out of memory.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, BackendError::OutOfMemory { .. })
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::OutOfMemory { requested } => {
                write!(f, "out of device memory ({} bytes requested)", requested)
            }
            BackendError::InvalidHandle(ptr) => {
                write!(f, "invalid device handle {}", ptr)
            }
            BackendError::OutOfRange { capacity, requested } => write!(
                f,
                "copy of {} bytes exceeds device allocation of {} bytes",
                requested, capacity
            ),
            BackendError::Api { code, message } => write!(f, "{} (code {})", message, code),
        }
    }
}

impl std::error::Error for BackendError {}

/// Free/total memory as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemInfo {
    /// Free bytes on the device
    pub free: usize,
    /// Total bytes on the device
    pub total: usize,
}

impl MemInfo {
    /// Bytes currently in use on the device (by any process).
    pub fn used(&self) -> usize {
        self.total.saturating_sub(self.free)
    }
}

/// The external accelerator memory API.
///
/// Every method is a single blocking call with two outcomes. Implementations
/// must not retry and must not release anything on a failed call.
/// This trait is object-safe for use with `Arc<dyn DeviceBackend>`.
pub trait DeviceBackend: Send + Sync {
    /// Short backend name used in diagnostics (e.g. `"cuda:0"`)
    fn name(&self) -> &str;

    /// Allocate exactly `size` bytes of device memory
    fn malloc(&self, size: usize) -> Result<DevicePtr, BackendError>;

    /// Release a live allocation
    fn free(&self, ptr: DevicePtr) -> Result<(), BackendError>;

    /// Copy `src.len()` bytes from host memory to the start of `dst`
    fn copy_htod(&self, src: &[u8], dst: DevicePtr) -> Result<(), BackendError>;

    /// Copy `dst.len()` bytes from the start of `src` into host memory
    fn copy_dtoh(&self, src: DevicePtr, dst: &mut [u8]) -> Result<(), BackendError>;

    /// Free/total device memory, if the API reports it
    fn mem_info(&self) -> Option<MemInfo> {
        None
    }
}
