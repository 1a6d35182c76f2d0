//! Live-allocation registry.
//!
//! Tracks every device allocation a facade currently owns, including those
//! detached into raw handles, plus bytes reserved for in-flight allocations
//! so the memory limit holds under concurrent `allocate` calls.

use std::collections::HashMap;

use crate::gpu::DevicePtr;
use crate::sync::mutex::Mutex;

use super::budget::{check_status, BudgetStatus};

/// One allocation the facade still owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveAllocation {
    /// Device address
    pub ptr: DevicePtr,
    /// Size in bytes
    pub size: usize,
    /// Handed out through `DeviceBuffer::into_raw` and not yet reclaimed
    pub detached: bool,
    /// Allocation backtrace (only with the `debug` feature and backtraces enabled)
    pub backtrace: Option<String>,
}

#[derive(Default)]
struct RegistryState {
    live: HashMap<DevicePtr, LiveAllocation>,
    live_bytes: usize,
    reserved: usize,
}

#[derive(Default)]
pub(crate) struct LiveRegistry {
    state: Mutex<RegistryState>,
}

impl LiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `size` bytes against `limit` before calling the backend.
    ///
    /// The reservation is released when the returned guard drops, unless it
    /// was committed. On failure, returns the bytes already live or reserved.
    pub fn reserve(&self, size: usize, limit: usize) -> Result<Reservation<'_>, usize> {
        let mut state = self.state.lock();
        match check_status(state.live_bytes.saturating_add(state.reserved), size, limit) {
            BudgetStatus::Ok => {
                state.reserved = state.reserved.saturating_add(size);
                Ok(Reservation {
                    registry: self,
                    size,
                    committed: false,
                })
            }
            BudgetStatus::Exceeded { live, .. } => Err(live),
        }
    }

    fn release_reservation(&self, size: usize) {
        let mut state = self.state.lock();
        state.reserved = state.reserved.saturating_sub(size);
    }

    pub fn reserved_bytes(&self) -> usize {
        self.state.lock().reserved
    }

    /// Forget an allocation. Returns it if it was live.
    pub fn remove(&self, ptr: DevicePtr) -> Option<LiveAllocation> {
        let mut state = self.state.lock();
        let entry = state.live.remove(&ptr)?;
        state.live_bytes = state.live_bytes.saturating_sub(entry.size);
        Some(entry)
    }

    /// Mark an owned allocation as detached into a raw handle.
    pub fn detach(&self, ptr: DevicePtr) -> bool {
        let mut state = self.state.lock();
        match state.live.get_mut(&ptr) {
            Some(entry) if !entry.detached => {
                entry.detached = true;
                true
            }
            _ => false,
        }
    }

    /// Reclaim a detached allocation. Returns its size, or `None` if the
    /// handle is unknown or already owned by a buffer.
    pub fn reattach(&self, ptr: DevicePtr) -> Option<usize> {
        let mut state = self.state.lock();
        match state.live.get_mut(&ptr) {
            Some(entry) if entry.detached => {
                entry.detached = false;
                Some(entry.size)
            }
            _ => None,
        }
    }

    pub fn contains(&self, ptr: DevicePtr) -> bool {
        self.state.lock().live.contains_key(&ptr)
    }

    pub fn len(&self) -> usize {
        self.state.lock().live.len()
    }

    pub fn live_bytes(&self) -> usize {
        self.state.lock().live_bytes
    }

    /// All live allocations, ordered by address.
    pub fn snapshot(&self) -> Vec<LiveAllocation> {
        let state = self.state.lock();
        let mut entries: Vec<_> = state.live.values().cloned().collect();
        entries.sort_by_key(|e| e.ptr);
        entries
    }
}

/// Bytes held against the limit for one in-flight allocation.
#[must_use]
pub(crate) struct Reservation<'a> {
    registry: &'a LiveRegistry,
    size: usize,
    committed: bool,
}

impl Reservation<'_> {
    /// Turn the reservation into a live allocation at `ptr`.
    pub fn commit(mut self, ptr: DevicePtr, backtrace: Option<String>) {
        let mut state = self.registry.state.lock();
        state.reserved = state.reserved.saturating_sub(self.size);
        state.live_bytes = state.live_bytes.saturating_add(self.size);
        state.live.insert(
            ptr,
            LiveAllocation {
                ptr,
                size: self.size,
                detached: false,
                backtrace,
            },
        );
        self.committed = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.registry.release_reservation(self.size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ptr(addr: u64) -> DevicePtr {
        DevicePtr::from_raw(addr)
    }

    fn insert(registry: &LiveRegistry, addr: u64, size: usize) {
        registry.reserve(size, 0).unwrap().commit(ptr(addr), None);
    }

    #[test]
    fn test_reserve_commit_remove() {
        let registry = LiveRegistry::new();
        let reservation = registry.reserve(100, 0).unwrap();
        assert_eq!(registry.reserved_bytes(), 100);
        reservation.commit(ptr(0x10), None);

        assert!(registry.contains(ptr(0x10)));
        assert_eq!(registry.live_bytes(), 100);
        assert_eq!(registry.reserved_bytes(), 0);

        let entry = registry.remove(ptr(0x10)).unwrap();
        assert_eq!(entry.size, 100);
        assert_eq!(registry.len(), 0);
        assert!(registry.remove(ptr(0x10)).is_none());
    }

    #[test]
    fn test_reservations_count_against_limit() {
        let registry = LiveRegistry::new();
        let first = registry.reserve(600, 1000).unwrap();
        assert_eq!(registry.reserve(600, 1000).err(), Some(600));
        drop(first);
        assert_eq!(registry.reserved_bytes(), 0);
        assert!(registry.reserve(1000, 1000).is_ok());
    }

    #[test]
    fn test_reservation_released_when_unwinding() {
        let registry = LiveRegistry::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _reservation = registry.reserve(512, 1024).unwrap();
            panic!("backend panicked");
        }));
        assert!(result.is_err());
        assert_eq!(registry.reserved_bytes(), 0);
        assert!(registry.reserve(1024, 1024).is_ok());
    }

    #[test]
    fn test_detach_reattach() {
        let registry = LiveRegistry::new();
        insert(&registry, 0x20, 64);

        assert_eq!(registry.reattach(ptr(0x20)), None);
        assert!(registry.detach(ptr(0x20)));
        assert!(!registry.detach(ptr(0x20)));
        assert_eq!(registry.reattach(ptr(0x20)), Some(64));
        assert_eq!(registry.reattach(ptr(0x20)), None);
        assert_eq!(registry.reattach(ptr(0x99)), None);
    }

    #[test]
    fn test_snapshot_sorted() {
        let registry = LiveRegistry::new();
        for addr in [0x30, 0x10, 0x20] {
            insert(&registry, addr, 8);
        }
        let addrs: Vec<u64> = registry.snapshot().iter().map(|e| e.ptr.as_raw()).collect();
        assert_eq!(addrs, vec![0x10, 0x20, 0x30]);
    }
}
