//! Owned device buffers.

use std::fmt;
use std::sync::Arc;

use crate::api::error::Result;
use crate::core::state::DeviceState;
use crate::gpu::DevicePtr;

/// An owned block of device memory.
///
/// The block is released when the buffer is dropped. `free` releases it
/// explicitly and reports the outcome; since it consumes the buffer, a
/// double free or a use after free does not compile.
///
/// # Example
///
/// ```rust
/// use devmem::DeviceMemory;
///
/// let memory = DeviceMemory::host();
/// let mut buffer = memory.allocate(4)?;
/// buffer.copy_from_host(&[1, 2, 3, 4])?;
/// assert_eq!(buffer.to_vec()?, vec![1, 2, 3, 4]);
/// buffer.free()?;
/// # Ok::<(), devmem::DeviceError>(())
/// ```
pub struct DeviceBuffer {
    ptr: DevicePtr,
    len: usize,
    state: Arc<DeviceState>,
    /// Set once ownership has left this value (freed or turned into a raw handle)
    released: bool,
}

impl DeviceBuffer {
    pub(crate) fn new(ptr: DevicePtr, len: usize, state: Arc<DeviceState>) -> Self {
        Self {
            ptr,
            len,
            state,
            released: false,
        }
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: zero-size allocations are rejected.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The backend's handle for this block.
    pub fn device_ptr(&self) -> DevicePtr {
        self.ptr
    }

    pub(crate) fn state(&self) -> &Arc<DeviceState> {
        &self.state
    }

    /// Upload all of `host` to the start of this buffer.
    pub fn copy_from_host(&mut self, host: &[u8]) -> Result<()> {
        self.state.upload(host, self.ptr, self.len, host.len())
    }

    /// Fill all of `host` from the start of this buffer.
    pub fn copy_to_host(&self, host: &mut [u8]) -> Result<()> {
        self.state.download(self.ptr, self.len, host, host.len())
    }

    /// Download the whole buffer.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut host = vec![0u8; self.len];
        self.copy_to_host(&mut host)?;
        Ok(host)
    }

    /// Release the device memory now.
    ///
    /// The handle is gone after this call whether or not the backend
    /// reported success.
    pub fn free(mut self) -> Result<()> {
        self.released = true;
        self.state.release(self.ptr, self.len)
    }

    /// Give up ownership and return the raw handle.
    ///
    /// The allocation stays on the facade's live list (and in
    /// `leak_report`) until it is taken back with `DeviceMemory::from_raw`.
    pub fn into_raw(mut self) -> DevicePtr {
        self.released = true;
        self.state.detach(self.ptr);
        self.ptr
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        if !self.released {
            // Already reported through the facade's failure path.
            let _ = self.state.release(self.ptr, self.len);
        }
    }
}

impl fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("backend", &self.state.backend_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::api::memory::DeviceMemory;
    use crate::api::transfer::Operation;
    use crate::gpu::HostBackend;
    use crate::DeviceConfig;
    use std::sync::Arc;

    #[test]
    fn test_drop_releases() {
        let backend = Arc::new(HostBackend::new());
        let memory = DeviceMemory::with_backend(backend.clone(), DeviceConfig::default());

        {
            let _buffer = memory.allocate(128).unwrap();
            assert_eq!(backend.live_blocks(), 1);
        }

        assert_eq!(backend.live_blocks(), 0);
        assert_eq!(backend.call_count(Operation::Free), 1);
    }

    #[test]
    fn test_copy_helpers_use_host_length() {
        let memory = DeviceMemory::host();
        let mut buffer = memory.allocate(8).unwrap();

        buffer.copy_from_host(&[9, 8, 7]).unwrap();
        let mut head = [0u8; 3];
        buffer.copy_to_host(&mut head).unwrap();
        assert_eq!(head, [9, 8, 7]);

        assert!(buffer.copy_from_host(&[0u8; 9]).is_err());
        assert_eq!(buffer.to_vec().unwrap().len(), 8);
    }

    #[test]
    fn test_into_raw_skips_release() {
        let backend = Arc::new(HostBackend::new());
        let memory = DeviceMemory::with_backend(backend.clone(), DeviceConfig::default());

        let ptr = memory.allocate(64).unwrap().into_raw();
        assert_eq!(backend.call_count(Operation::Free), 0);
        assert_eq!(memory.live_allocations()[0].ptr, ptr);
        assert!(memory.live_allocations()[0].detached);

        memory.from_raw(ptr).unwrap().free().unwrap();
        assert!(memory.live_allocations().is_empty());
    }

    #[test]
    fn test_debug_format() {
        let memory = DeviceMemory::host();
        let buffer = memory.allocate(16).unwrap();
        let text = format!("{:?}", buffer);
        assert!(text.contains("len: 16"));
        assert!(text.contains("\"host\""));
    }
}
