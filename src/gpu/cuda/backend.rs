//! CUDA driver backend

use std::sync::Arc;

use cudarc::driver::{result, sys, CudaDevice, DriverError};

use super::super::traits::{BackendError, DeviceBackend, DevicePtr, MemInfo};

/// Device memory on one CUDA device, through its primary context
pub struct CudaBackend {
    /// Device handle; owns the retained primary context
    device: Arc<CudaDevice>,
    /// Diagnostic name, e.g. "cuda:0"
    name: String,
}

impl CudaBackend {
    /// Open device `ordinal` and retain its primary context
    pub fn new(ordinal: usize) -> Result<Self, BackendError> {
        let device = CudaDevice::new(ordinal).map_err(driver_error)?;
        Ok(Self::from_device(device))
    }

    /// Wrap an already opened device
    pub fn from_device(device: Arc<CudaDevice>) -> Self {
        let name = format!("cuda:{}", device.ordinal());
        Self { device, name }
    }

    /// The underlying cudarc device
    pub fn device(&self) -> &Arc<CudaDevice> {
        &self.device
    }

    /// Make the device context current on the calling thread.
    ///
    /// Driver memory calls act on the current context, and the facade may be
    /// used from any thread.
    fn bind(&self) -> Result<(), BackendError> {
        self.device.bind_to_thread().map_err(driver_error)
    }
}

impl DeviceBackend for CudaBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn malloc(&self, size: usize) -> Result<DevicePtr, BackendError> {
        self.bind()?;
        // SAFETY: the context is current; the returned allocation is owned by
        // the caller until passed back to `free`.
        let raw = unsafe { result::malloc_sync(size) }.map_err(|err| {
            if err.0 == sys::CUresult::CUDA_ERROR_OUT_OF_MEMORY {
                BackendError::OutOfMemory { requested: size }
            } else {
                driver_error(err)
            }
        })?;
        Ok(DevicePtr::from_raw(raw))
    }

    fn free(&self, ptr: DevicePtr) -> Result<(), BackendError> {
        self.bind()?;
        // SAFETY: the facade passes each pointer from `malloc` exactly once.
        unsafe { result::free_sync(ptr.as_raw()) }.map_err(driver_error)
    }

    fn copy_htod(&self, src: &[u8], dst: DevicePtr) -> Result<(), BackendError> {
        self.bind()?;
        // SAFETY: the facade checked that `dst` holds at least `src.len()` bytes.
        unsafe { result::memcpy_htod_sync(dst.as_raw(), src) }.map_err(driver_error)
    }

    fn copy_dtoh(&self, src: DevicePtr, dst: &mut [u8]) -> Result<(), BackendError> {
        self.bind()?;
        // SAFETY: the facade checked that `src` holds at least `dst.len()` bytes.
        unsafe { result::memcpy_dtoh_sync(dst, src.as_raw()) }.map_err(driver_error)
    }

    fn mem_info(&self) -> Option<MemInfo> {
        self.bind().ok()?;
        let (free, total) = result::mem_get_info().ok()?;
        Some(MemInfo { free, total })
    }
}

/// Convert a driver error into a backend error carrying the driver's description
fn driver_error(err: DriverError) -> BackendError {
    let message = err
        .error_string()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|_| format!("{:?}", err.0));
    BackendError::api(err.0 as i64, message)
}
