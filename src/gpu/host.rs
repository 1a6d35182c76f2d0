//! Host-simulated device backend
//!
//! Device memory lives in ordinary `Vec<u8>` blocks, so the facade can be
//! exercised without GPU hardware. Addresses are never reused, which keeps
//! stale handles detectable. Failures can be injected per operation, and
//! every call is logged for inspection.

use std::collections::HashMap;

use super::traits::{BackendError, DeviceBackend, DevicePtr, MemInfo};
use crate::api::transfer::Operation;
use crate::dm_debug_assert;
use crate::sync::mutex::Mutex;

/// First simulated device address.
const BASE_ADDRESS: u64 = 0x7f00_0000_0000;

/// Simulated allocation granularity, matching CUDA's 256-byte alignment.
const ALLOC_ALIGN: u64 = 256;

/// One call the backend received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCall {
    /// Which external operation was called
    pub operation: Operation,
    /// Handle passed in or handed out, if any
    pub ptr: Option<DevicePtr>,
    /// Byte count of the allocation or copy
    pub bytes: usize,
    /// Whether the call succeeded
    pub ok: bool,
}

#[derive(Debug)]
struct HostState {
    blocks: HashMap<DevicePtr, Vec<u8>>,
    next_address: u64,
    used: usize,
    injected: HashMap<Operation, BackendError>,
    calls: Vec<BackendCall>,
}

/// Device backend that simulates accelerator memory in host RAM
#[derive(Debug)]
pub struct HostBackend {
    state: Mutex<HostState>,
    /// Simulated device size (None = unlimited)
    capacity: Option<usize>,
}

impl HostBackend {
    /// Create an unlimited host backend
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HostState {
                blocks: HashMap::new(),
                next_address: BASE_ADDRESS,
                used: 0,
                injected: HashMap::new(),
                calls: Vec::new(),
            }),
            capacity: None,
        }
    }

    /// Create a host backend that reports out-of-memory past `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new()
        }
    }

    /// Make the next call of `operation` fail with `error`.
    ///
    /// The failing call touches no memory and hands out no handle.
    pub fn fail_next(&self, operation: Operation, error: BackendError) {
        self.state.lock().injected.insert(operation, error);
    }

    /// Every call received so far, oldest first.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().calls.clone()
    }

    /// Number of calls received for one operation.
    pub fn call_count(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Number of blocks currently allocated.
    pub fn live_blocks(&self) -> usize {
        self.state.lock().blocks.len()
    }

    /// Bytes currently allocated.
    pub fn used_bytes(&self) -> usize {
        self.state.lock().used
    }

    /// Take a pending injected failure for `operation` and log the failed call.
    fn injected_failure(
        state: &mut HostState,
        operation: Operation,
        ptr: Option<DevicePtr>,
        bytes: usize,
    ) -> Option<BackendError> {
        let error = state.injected.remove(&operation)?;
        state.calls.push(BackendCall {
            operation,
            ptr,
            bytes,
            ok: false,
        });
        Some(error)
    }

    fn record(state: &mut HostState, operation: Operation, ptr: Option<DevicePtr>, bytes: usize, ok: bool) {
        state.calls.push(BackendCall {
            operation,
            ptr,
            bytes,
            ok,
        });
    }

    /// Passing a handle that was never allocated, or was already freed, is out
    /// of contract: a debug assertion in debug builds, an error otherwise.
    fn check_handle(known: bool, ptr: DevicePtr) -> Result<(), BackendError> {
        dm_debug_assert!(known, "device handle {} was never allocated or already freed", ptr);
        if known {
            Ok(())
        } else {
            Err(BackendError::InvalidHandle(ptr))
        }
    }
}

impl Default for HostBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceBackend for HostBackend {
    fn name(&self) -> &str {
        "host"
    }

    fn malloc(&self, size: usize) -> Result<DevicePtr, BackendError> {
        let mut state = self.state.lock();
        if let Some(error) = Self::injected_failure(&mut state, Operation::Allocate, None, size) {
            return Err(error);
        }

        if let Some(capacity) = self.capacity {
            if state.used.saturating_add(size) > capacity {
                Self::record(&mut state, Operation::Allocate, None, size, false);
                return Err(BackendError::OutOfMemory { requested: size });
            }
        }

        let span = (size as u64).max(1);
        let next_address = span
            .checked_add(ALLOC_ALIGN - 1)
            .map(|end| end / ALLOC_ALIGN * ALLOC_ALIGN)
            .and_then(|rounded| state.next_address.checked_add(rounded));

        let mut block = Vec::new();
        let (Some(next_address), Ok(())) = (next_address, block.try_reserve_exact(size)) else {
            Self::record(&mut state, Operation::Allocate, None, size, false);
            return Err(BackendError::OutOfMemory { requested: size });
        };
        block.resize(size, 0u8);
        #[cfg(feature = "debug")]
        crate::debug::poison::poison_uninit(&mut block);

        let ptr = DevicePtr::from_raw(state.next_address);
        state.next_address = next_address;
        state.used += size;
        state.blocks.insert(ptr, block);
        Self::record(&mut state, Operation::Allocate, Some(ptr), size, true);
        Ok(ptr)
    }

    fn free(&self, ptr: DevicePtr) -> Result<(), BackendError> {
        let removed = {
            let mut state = self.state.lock();
            if let Some(error) = Self::injected_failure(&mut state, Operation::Free, Some(ptr), 0) {
                return Err(error);
            }
            let removed = state.blocks.remove(&ptr);
            if let Some(ref block) = removed {
                state.used -= block.len();
            }
            let size = removed.as_ref().map_or(0, Vec::len);
            Self::record(&mut state, Operation::Free, Some(ptr), size, removed.is_some());
            removed
        };

        Self::check_handle(removed.is_some(), ptr)
    }

    fn copy_htod(&self, src: &[u8], dst: DevicePtr) -> Result<(), BackendError> {
        let outcome = {
            let mut state = self.state.lock();
            if let Some(error) =
                Self::injected_failure(&mut state, Operation::Upload, Some(dst), src.len())
            {
                return Err(error);
            }
            let outcome = match state.blocks.get_mut(&dst) {
                None => None,
                Some(block) if src.len() > block.len() => Some(Err(BackendError::OutOfRange {
                    capacity: block.len(),
                    requested: src.len(),
                })),
                Some(block) => {
                    block[..src.len()].copy_from_slice(src);
                    Some(Ok(()))
                }
            };
            let ok = matches!(outcome, Some(Ok(())));
            Self::record(&mut state, Operation::Upload, Some(dst), src.len(), ok);
            outcome
        };

        match outcome {
            Some(result) => result,
            None => Self::check_handle(false, dst),
        }
    }

    fn copy_dtoh(&self, src: DevicePtr, dst: &mut [u8]) -> Result<(), BackendError> {
        let outcome = {
            let mut state = self.state.lock();
            if let Some(error) =
                Self::injected_failure(&mut state, Operation::Download, Some(src), dst.len())
            {
                return Err(error);
            }
            let outcome = match state.blocks.get(&src) {
                None => None,
                Some(block) if dst.len() > block.len() => Some(Err(BackendError::OutOfRange {
                    capacity: block.len(),
                    requested: dst.len(),
                })),
                Some(block) => {
                    dst.copy_from_slice(&block[..dst.len()]);
                    Some(Ok(()))
                }
            };
            let ok = matches!(outcome, Some(Ok(())));
            Self::record(&mut state, Operation::Download, Some(src), dst.len(), ok);
            outcome
        };

        match outcome {
            Some(result) => result,
            None => Self::check_handle(false, src),
        }
    }

    fn mem_info(&self) -> Option<MemInfo> {
        let total = self.capacity?;
        Some(MemInfo {
            free: total.saturating_sub(self.used_bytes()),
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malloc_copy_free() {
        let backend = HostBackend::new();
        let ptr = backend.malloc(300).unwrap();

        backend.copy_htod(&[1, 2, 3], ptr).unwrap();
        let mut out = [0u8; 4];
        backend.copy_dtoh(ptr, &mut out).unwrap();
        assert_eq!(&out[..3], &[1, 2, 3]);

        assert_eq!(backend.used_bytes(), 300);
        backend.free(ptr).unwrap();
        assert_eq!(backend.live_blocks(), 0);
        assert_eq!(backend.used_bytes(), 0);
    }

    #[test]
    fn test_addresses_are_aligned_and_not_reused() {
        let backend = HostBackend::new();
        let a = backend.malloc(1).unwrap();
        let b = backend.malloc(257).unwrap();
        backend.free(a).unwrap();
        let c = backend.malloc(1).unwrap();

        assert_eq!(a.as_raw() % ALLOC_ALIGN, 0);
        assert_eq!(b.as_raw() - a.as_raw(), ALLOC_ALIGN);
        assert_eq!(c.as_raw() - b.as_raw(), 2 * ALLOC_ALIGN);
    }

    #[test]
    fn test_capacity_reports_out_of_memory() {
        let backend = HostBackend::with_capacity(1024);
        let ptr = backend.malloc(1000).unwrap();
        assert_eq!(
            backend.malloc(25),
            Err(BackendError::OutOfMemory { requested: 25 })
        );
        assert_eq!(backend.mem_info(), Some(MemInfo { free: 24, total: 1024 }));
        backend.free(ptr).unwrap();
    }

    #[test]
    fn test_injected_failure_fires_once() {
        let backend = HostBackend::new();
        backend.fail_next(Operation::Allocate, BackendError::api(2, "out of memory"));

        assert!(backend.malloc(64).is_err());
        assert_eq!(backend.live_blocks(), 0);
        assert!(backend.malloc(64).is_ok());

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert!(!calls[0].ok);
        assert_eq!(calls[0].ptr, None);
        assert!(calls[1].ok);
    }

    #[test]
    fn test_unrepresentable_size_is_out_of_memory() {
        let backend = HostBackend::new();
        assert_eq!(
            backend.malloc(usize::MAX),
            Err(BackendError::OutOfMemory { requested: usize::MAX })
        );
        assert_eq!(
            backend.malloc(usize::MAX - 1),
            Err(BackendError::OutOfMemory { requested: usize::MAX - 1 })
        );
        assert_eq!(backend.live_blocks(), 0);
        assert_eq!(backend.used_bytes(), 0);

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| !c.ok && c.ptr.is_none()));
        assert!(backend.malloc(16).is_ok());
    }

    #[test]
    fn test_copy_past_end_is_out_of_range() {
        let backend = HostBackend::new();
        let ptr = backend.malloc(8).unwrap();
        assert_eq!(
            backend.copy_htod(&[0u8; 9], ptr),
            Err(BackendError::OutOfRange { capacity: 8, requested: 9 })
        );
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "was never allocated or already freed")]
    fn test_double_free_is_out_of_contract() {
        let backend = HostBackend::new();
        let ptr = backend.malloc(16).unwrap();
        backend.free(ptr).unwrap();
        let _ = backend.free(ptr);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "was never allocated or already freed")]
    fn test_unknown_handle_is_out_of_contract() {
        let backend = HostBackend::new();
        let mut out = [0u8; 4];
        let _ = backend.copy_dtoh(DevicePtr::from_raw(0xdead_0000), &mut out);
    }

    #[test]
    #[cfg(feature = "debug")]
    fn test_fresh_blocks_are_poisoned() {
        let backend = HostBackend::new();
        let ptr = backend.malloc(32).unwrap();
        let mut out = [0u8; 32];
        backend.copy_dtoh(ptr, &mut out).unwrap();
        assert!(crate::debug::poison::is_uninit_poison(&out));
    }
}
