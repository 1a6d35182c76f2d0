//! Shared facade state.

use std::sync::Arc;

use crate::api::config::{DeviceConfig, FailurePolicy};
use crate::api::error::{DeviceError, Result};
use crate::api::stats::{DeviceStats, StatsCollector};
use crate::api::transfer::{Operation, TransferPlan};
use crate::core::registry::{LiveAllocation, LiveRegistry};
use crate::diagnostics::emit::emit_with_context;
use crate::diagnostics::macros::dm_log;
use crate::diagnostics::{DeviceEvent, DiagContext, DM401};
use crate::dm_debug_assert;
use crate::gpu::{DeviceBackend, DevicePtr, MemInfo};
use crate::util::size::format_bytes;

/// State shared by a `DeviceMemory` and every buffer it hands out.
///
/// Wrapped in an `Arc`; the last owner to drop it reports leaked handles.
pub(crate) struct DeviceState {
    backend: Arc<dyn DeviceBackend>,
    config: DeviceConfig,
    stats: StatsCollector,
    registry: LiveRegistry,
}

impl DeviceState {
    pub fn new(backend: Arc<dyn DeviceBackend>, config: DeviceConfig) -> Self {
        Self {
            backend,
            config,
            stats: StatsCollector::default(),
            registry: LiveRegistry::new(),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats.snapshot()
    }

    pub fn live_allocations(&self) -> Vec<LiveAllocation> {
        self.registry.snapshot()
    }

    pub fn mem_info(&self) -> Option<MemInfo> {
        self.backend.mem_info()
    }

    fn context(&self, operation: Operation) -> DiagContext {
        DiagContext::for_op(self.backend.name(), operation)
    }

    /// Allocate exactly `size` bytes.
    ///
    /// The backend is not called for a zero size or when the limit would be
    /// exceeded. A failed malloc leaves nothing to free.
    pub fn allocate(&self, size: usize) -> Result<DevicePtr> {
        let ctx = || self.context(Operation::Allocate).with_bytes(size);

        if size == 0 {
            return Err(self.fail(DeviceError::ZeroSize, ctx()));
        }

        let reservation = match self.registry.reserve(size, self.config.memory_limit) {
            Ok(reservation) => reservation,
            Err(live) => {
                let error = DeviceError::BudgetExceeded {
                    requested: size,
                    live,
                    limit: self.config.memory_limit,
                };
                return Err(self.fail(error, ctx()));
            }
        };

        match self.backend.malloc(size) {
            Ok(ptr) => {
                reservation.commit(ptr, self.capture_backtrace());
                self.stats.record_alloc(size);
                dm_log!(trace, "allocated {} bytes at {} on {}", size, ptr, self.backend.name());
                self.config.hooks.emit(DeviceEvent::Allocated { ptr, size });
                Ok(ptr)
            }
            Err(e) => {
                drop(reservation);
                Err(self.fail(DeviceError::AllocationFailed(e), ctx()))
            }
        }
    }

    /// Release `ptr`. The handle is gone afterwards even if the backend fails.
    pub fn release(&self, ptr: DevicePtr, size: usize) -> Result<()> {
        self.registry.remove(ptr);

        match self.backend.free(ptr) {
            Ok(()) => {
                self.stats.record_free(size, true);
                dm_log!(trace, "freed {} bytes at {} on {}", size, ptr, self.backend.name());
                self.config.hooks.emit(DeviceEvent::Freed { ptr, size });
                Ok(())
            }
            Err(e) => {
                self.stats.record_free(size, false);
                let ctx = self.context(Operation::Free).with_bytes(size).with_ptr(ptr);
                Err(self.fail(DeviceError::DeallocationFailed(e), ctx))
            }
        }
    }

    /// Copy the first `size` bytes of `host` to the start of the device block.
    pub fn upload(&self, host: &[u8], ptr: DevicePtr, device_len: usize, size: usize) -> Result<()> {
        let ctx = || self.context(Operation::Upload).with_bytes(size).with_ptr(ptr);

        let plan = TransferPlan::new(size, host.len(), device_len);
        if !plan.fits() {
            return Err(self.fail(out_of_bounds(plan), ctx()));
        }
        if plan.is_noop() {
            return Ok(());
        }

        match self.backend.copy_htod(&host[..size], ptr) {
            Ok(()) => {
                self.stats.record_upload(size);
                dm_log!(trace, "uploaded {} bytes to {}", size, ptr);
                self.config.hooks.emit(DeviceEvent::Uploaded { ptr, bytes: size });
                Ok(())
            }
            Err(e) => Err(self.fail(DeviceError::UploadFailed(e), ctx())),
        }
    }

    /// Copy `size` bytes from the start of the device block into `host`.
    pub fn download(&self, ptr: DevicePtr, device_len: usize, host: &mut [u8], size: usize) -> Result<()> {
        let ctx = || self.context(Operation::Download).with_bytes(size).with_ptr(ptr);

        let plan = TransferPlan::new(size, host.len(), device_len);
        if !plan.fits() {
            return Err(self.fail(out_of_bounds(plan), ctx()));
        }
        if plan.is_noop() {
            return Ok(());
        }

        match self.backend.copy_dtoh(ptr, &mut host[..size]) {
            Ok(()) => {
                self.stats.record_download(size);
                dm_log!(trace, "downloaded {} bytes from {}", size, ptr);
                self.config.hooks.emit(DeviceEvent::Downloaded { ptr, bytes: size });
                Ok(())
            }
            Err(e) => Err(self.fail(DeviceError::DownloadFailed(e), ctx())),
        }
    }

    /// Mark a live allocation as handed out through a raw handle.
    pub fn detach(&self, ptr: DevicePtr) {
        let detached = self.registry.detach(ptr);
        dm_debug_assert!(detached, "device handle {} is not an attached allocation", ptr);
    }

    /// Take a detached handle back, returning its size.
    pub fn reattach(&self, ptr: DevicePtr) -> Result<usize> {
        if let Some(size) = self.registry.reattach(ptr) {
            return Ok(size);
        }

        dm_debug_assert!(
            false,
            "device handle {} was never allocated, already freed, or is still owned",
            ptr
        );
        let mut ctx = DiagContext::capture().with_ptr(ptr);
        ctx.backend = Some(self.backend.name().to_string());
        Err(self.fail(DeviceError::InvalidHandle(ptr), ctx))
    }

    /// A human-readable listing of every allocation still owned.
    pub fn leak_report(&self) -> String {
        let live = self.registry.snapshot();
        let total: usize = live.iter().map(|a| a.size).sum();

        let mut report = format!(
            "{} live device allocation(s) on {}, {} total\n",
            live.len(),
            self.backend.name(),
            format_bytes(total)
        );
        for allocation in &live {
            report.push_str(&format!("  {}: {}", allocation.ptr, format_bytes(allocation.size)));
            if allocation.detached {
                report.push_str(" (detached)");
            }
            report.push('\n');
            if let Some(ref backtrace) = allocation.backtrace {
                for line in backtrace.lines() {
                    report.push_str("    ");
                    report.push_str(line);
                    report.push('\n');
                }
            }
        }
        report
    }

    /// Report a failure once, then apply the failure policy.
    ///
    /// Returns the error for `Propagate`, and for `Panic` while already unwinding.
    #[cold]
    pub fn fail(&self, error: DeviceError, ctx: DiagContext) -> DeviceError {
        self.stats.record_failure();

        let diag = error.diagnostic();
        let operation = ctx.operation;
        let context = ctx.with_detail(error.to_string()).format();

        emit_with_context(diag, &context);
        self.config.hooks.report(diag, Some(&context));
        self.config.hooks.emit(DeviceEvent::Failed {
            operation,
            code: diag.code,
            message: error.to_string(),
        });

        match self.config.failure_policy {
            FailurePolicy::Propagate => error,
            FailurePolicy::Panic if std::thread::panicking() => error,
            FailurePolicy::Panic => panic!("{}", error),
            FailurePolicy::Exit => {
                match (operation, error.backend_error()) {
                    (_, Some(_)) | (None, None) => eprintln!("{}", error),
                    (Some(op), None) => eprintln!("{} failed, err: {}", op, error),
                }
                std::process::exit(1)
            }
        }
    }

    fn capture_backtrace(&self) -> Option<String> {
        #[cfg(feature = "debug")]
        {
            if self.config.track_backtraces {
                return Some(crate::debug::backtrace::capture());
            }
        }
        None
    }
}

impl Drop for DeviceState {
    fn drop(&mut self) {
        let leaked = self.registry.len();
        if leaked == 0 {
            return;
        }

        let bytes = self.registry.live_bytes();
        dm_log!(
            warn,
            "{} device allocation(s) ({}) still live on {}",
            leaked,
            format_bytes(bytes),
            self.backend.name()
        );

        if std::thread::panicking() {
            return;
        }
        let context = format!(
            "backend={}, live={}, bytes={}",
            self.backend.name(),
            leaked,
            bytes
        );
        emit_with_context(&DM401, &context);
        self.config.hooks.report(&DM401, Some(&context));
    }
}

fn out_of_bounds(plan: TransferPlan) -> DeviceError {
    DeviceError::LengthOutOfBounds {
        requested: plan.requested,
        host: plan.host,
        device: plan.device,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::gpu::{BackendError, HostBackend};

    fn state_with(backend: Arc<HostBackend>, config: DeviceConfig) -> DeviceState {
        DeviceState::new(backend, config)
    }

    #[test]
    fn test_zero_size_never_reaches_backend() {
        let backend = Arc::new(HostBackend::new());
        let state = state_with(backend.clone(), DeviceConfig::default());

        assert_eq!(state.allocate(0), Err(DeviceError::ZeroSize));
        assert!(backend.calls().is_empty());
        assert_eq!(state.stats().failed_ops, 1);
    }

    #[test]
    fn test_budget_reservation_released_on_malloc_failure() {
        let backend = Arc::new(HostBackend::new());
        let state = state_with(backend.clone(), DeviceConfig::default().with_memory_limit(1024));

        backend.fail_next(Operation::Allocate, BackendError::OutOfMemory { requested: 1024 });
        assert!(state.allocate(1024).is_err());

        let ptr = state.allocate(1024).unwrap();
        state.release(ptr, 1024).unwrap();
    }

    struct PanickingBackend;

    impl DeviceBackend for PanickingBackend {
        fn name(&self) -> &str {
            "panicking"
        }

        fn malloc(&self, size: usize) -> std::result::Result<DevicePtr, BackendError> {
            panic!("driver aborted a {} byte allocation", size)
        }

        fn free(&self, _ptr: DevicePtr) -> std::result::Result<(), BackendError> {
            Ok(())
        }

        fn copy_htod(&self, _src: &[u8], _dst: DevicePtr) -> std::result::Result<(), BackendError> {
            Ok(())
        }

        fn copy_dtoh(&self, _src: DevicePtr, _dst: &mut [u8]) -> std::result::Result<(), BackendError> {
            Ok(())
        }
    }

    #[test]
    fn test_budget_reservation_released_when_backend_panics() {
        let state = DeviceState::new(
            Arc::new(PanickingBackend),
            DeviceConfig::default().with_memory_limit(1024),
        );

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| state.allocate(1024)));
        assert!(result.is_err());
        assert_eq!(state.registry.reserved_bytes(), 0);
        assert_eq!(state.registry.live_bytes(), 0);
    }

    #[test]
    fn test_unrepresentable_size_fails_without_panicking() {
        let backend = Arc::new(HostBackend::new());
        let state = state_with(backend.clone(), DeviceConfig::default().with_memory_limit(usize::MAX));

        assert_eq!(
            state.allocate(usize::MAX - 1),
            Err(DeviceError::AllocationFailed(BackendError::OutOfMemory {
                requested: usize::MAX - 1
            }))
        );
        assert_eq!(state.registry.reserved_bytes(), 0);

        let ptr = state.allocate(16).unwrap();
        state.release(ptr, 16).unwrap();
    }

    #[test]
    fn test_failed_free_still_forgets_handle() {
        let backend = Arc::new(HostBackend::new());
        let state = state_with(backend.clone(), DeviceConfig::default());

        let ptr = state.allocate(64).unwrap();
        backend.fail_next(Operation::Free, BackendError::api(700, "context lost"));

        assert!(matches!(
            state.release(ptr, 64),
            Err(DeviceError::DeallocationFailed(_))
        ));
        assert!(state.live_allocations().is_empty());

        let stats = state.stats();
        assert_eq!(stats.live_bytes, 0);
        assert_eq!(stats.deallocation_count, 0);
    }

    #[test]
    fn test_noop_transfer_skips_backend() {
        let backend = Arc::new(HostBackend::new());
        let state = state_with(backend.clone(), DeviceConfig::default());

        let ptr = state.allocate(16).unwrap();
        state.upload(&[], ptr, 16, 0).unwrap();
        state.download(ptr, 16, &mut [], 0).unwrap();
        assert_eq!(backend.call_count(Operation::Upload), 0);
        assert_eq!(backend.call_count(Operation::Download), 0);
        state.release(ptr, 16).unwrap();
    }

    #[test]
    fn test_leak_reported_on_drop() {
        let sink = Arc::new(CollectingSink::new());
        let backend = Arc::new(HostBackend::new());
        let state = state_with(backend, DeviceConfig::default().with_sink(sink.clone()));

        let ptr = state.allocate(32).unwrap();
        state.detach(ptr);
        assert!(state.leak_report().contains("(detached)"));
        drop(state);

        assert_eq!(sink.count_code("DM401"), 1);
    }
}
