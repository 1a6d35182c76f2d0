//! The device memory facade.

use std::fmt;
use std::sync::Arc;

use crate::api::buffer::DeviceBuffer;
use crate::api::config::DeviceConfig;
use crate::api::error::{DeviceError, Result};
use crate::api::stats::DeviceStats;
use crate::api::transfer::Operation;
use crate::core::registry::LiveAllocation;
use crate::core::state::DeviceState;
use crate::diagnostics::DiagContext;
use crate::gpu::{DeviceBackend, DevicePtr, HostBackend, MemInfo};

/// Allocate, free, upload and download device memory through one backend.
///
/// Cheap to clone (internally an `Arc`) and thread-safe. Every operation is
/// a single blocking call into the backend. Failures are reported as coded
/// diagnostics and then handled by the configured
/// [`FailurePolicy`](crate::FailurePolicy).
///
/// # Example
///
/// ```rust
/// use devmem::{DeviceConfig, DeviceMemory, HostBackend};
///
/// let memory = DeviceMemory::new(HostBackend::new(), DeviceConfig::default());
///
/// let pattern: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
/// let mut buffer = memory.allocate(pattern.len())?;
/// memory.upload(&pattern, &mut buffer, pattern.len())?;
///
/// let mut readback = vec![0u8; pattern.len()];
/// memory.download(&buffer, &mut readback, pattern.len())?;
/// assert_eq!(readback, pattern);
/// # Ok::<(), devmem::DeviceError>(())
/// ```
#[derive(Clone)]
pub struct DeviceMemory {
    inner: Arc<DeviceState>,
}

impl DeviceMemory {
    /// Create a facade over `backend`.
    pub fn new<B: DeviceBackend + 'static>(backend: B, config: DeviceConfig) -> Self {
        Self::with_backend(Arc::new(backend), config)
    }

    /// Create a facade over a shared backend.
    pub fn with_backend(backend: Arc<dyn DeviceBackend>, config: DeviceConfig) -> Self {
        Self {
            inner: Arc::new(DeviceState::new(backend, config)),
        }
    }

    /// A facade over an unlimited host-simulated backend with default config.
    pub fn host() -> Self {
        Self::new(HostBackend::new(), DeviceConfig::default())
    }

    /// Allocate exactly `size` bytes of device memory.
    ///
    /// `size` must be non-zero. The contents of a fresh buffer are unspecified.
    pub fn allocate(&self, size: usize) -> Result<DeviceBuffer> {
        let ptr = self.inner.allocate(size)?;
        Ok(DeviceBuffer::new(ptr, size, self.inner.clone()))
    }

    /// Allocate a buffer sized to `host` and upload it.
    ///
    /// If the upload fails the allocation is released before returning.
    pub fn allocate_from(&self, host: &[u8]) -> Result<DeviceBuffer> {
        let mut buffer = self.allocate(host.len())?;
        self.upload(host, &mut buffer, host.len())?;
        Ok(buffer)
    }

    /// Release a buffer. Same as [`DeviceBuffer::free`].
    pub fn free(&self, buffer: DeviceBuffer) -> Result<()> {
        buffer.free()
    }

    /// Copy the first `size` bytes of `host` to the start of `buffer`.
    ///
    /// Both buffers must hold at least `size` bytes. A zero `size` does nothing.
    pub fn upload(&self, host: &[u8], buffer: &mut DeviceBuffer, size: usize) -> Result<()> {
        self.check_owner(buffer, Operation::Upload)?;
        self.inner.upload(host, buffer.device_ptr(), buffer.len(), size)
    }

    /// Copy the first `size` bytes of `buffer` into the start of `host`.
    ///
    /// Both buffers must hold at least `size` bytes. A zero `size` does nothing.
    pub fn download(&self, buffer: &DeviceBuffer, host: &mut [u8], size: usize) -> Result<()> {
        self.check_owner(buffer, Operation::Download)?;
        self.inner.download(buffer.device_ptr(), buffer.len(), host, size)
    }

    /// Take back a handle returned by [`DeviceBuffer::into_raw`].
    ///
    /// A handle this facade did not detach (never allocated, already freed,
    /// or still owned by a buffer) is a programming error: it trips a debug
    /// assertion, and in release builds fails with
    /// [`DeviceError::InvalidHandle`].
    pub fn from_raw(&self, ptr: DevicePtr) -> Result<DeviceBuffer> {
        let size = self.inner.reattach(ptr)?;
        Ok(DeviceBuffer::new(ptr, size, self.inner.clone()))
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> DeviceStats {
        self.inner.stats()
    }

    /// Every allocation this facade still owns, by address.
    pub fn live_allocations(&self) -> Vec<LiveAllocation> {
        self.inner.live_allocations()
    }

    /// Live allocations as text, with backtraces when they were recorded.
    pub fn leak_report(&self) -> String {
        self.inner.leak_report()
    }

    /// Free and total device memory, if the backend reports it.
    pub fn mem_info(&self) -> Option<MemInfo> {
        self.inner.mem_info()
    }

    /// Name of the backend, e.g. `"cuda:0"`.
    pub fn backend_name(&self) -> &str {
        self.inner.backend_name()
    }

    /// Configuration in effect.
    pub fn config(&self) -> &DeviceConfig {
        self.inner.config()
    }

    fn check_owner(&self, buffer: &DeviceBuffer, operation: Operation) -> Result<()> {
        if Arc::ptr_eq(&self.inner, buffer.state()) {
            return Ok(());
        }
        let ctx = DiagContext::for_op(self.inner.backend_name(), operation)
            .with_ptr(buffer.device_ptr());
        Err(self.inner.fail(DeviceError::InvalidHandle(buffer.device_ptr()), ctx))
    }
}

impl Default for DeviceMemory {
    fn default() -> Self {
        Self::host()
    }
}

impl fmt::Debug for DeviceMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceMemory")
            .field("backend", &self.inner.backend_name())
            .field("config", self.inner.config())
            .finish()
    }
}
