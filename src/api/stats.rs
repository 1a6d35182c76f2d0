//! Device memory statistics.

use crate::sync::atomics::{AtomicCounter, AtomicGauge};
use crate::util::size::format_bytes;

/// Aggregated statistics for one facade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Successful allocations.
    pub allocation_count: u64,

    /// Successful releases.
    pub deallocation_count: u64,

    /// Bytes currently allocated through the facade.
    pub live_bytes: usize,

    /// Peak live bytes (high water mark).
    pub peak_bytes: usize,

    /// Successful host-to-device copies.
    pub upload_count: u64,

    /// Successful device-to-host copies.
    pub download_count: u64,

    /// Bytes copied host to device.
    pub bytes_uploaded: u64,

    /// Bytes copied device to host.
    pub bytes_downloaded: u64,

    /// Operations that took the failure path.
    pub failed_ops: u64,
}

impl DeviceStats {
    /// Allocations not yet released.
    pub fn active_allocations(&self) -> u64 {
        self.allocation_count.saturating_sub(self.deallocation_count)
    }
}

impl std::fmt::Display for DeviceStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Device Memory Statistics:")?;
        writeln!(f, "  Live:          {}", format_bytes(self.live_bytes))?;
        writeln!(f, "  Peak:          {}", format_bytes(self.peak_bytes))?;
        writeln!(f, "  Allocations:   {}", self.allocation_count)?;
        writeln!(f, "  Releases:      {}", self.deallocation_count)?;
        writeln!(f, "  Active:        {}", self.active_allocations())?;
        writeln!(
            f,
            "  Uploaded:      {} in {} copies",
            format_bytes(self.bytes_uploaded as usize),
            self.upload_count
        )?;
        writeln!(
            f,
            "  Downloaded:    {} in {} copies",
            format_bytes(self.bytes_downloaded as usize),
            self.download_count
        )?;
        writeln!(f, "  Failures:      {}", self.failed_ops)?;
        Ok(())
    }
}

/// Live counters behind `DeviceStats`.
#[derive(Debug, Default)]
pub(crate) struct StatsCollector {
    allocations: AtomicCounter,
    deallocations: AtomicCounter,
    live: AtomicGauge,
    uploads: AtomicCounter,
    downloads: AtomicCounter,
    bytes_up: AtomicCounter,
    bytes_down: AtomicCounter,
    failures: AtomicCounter,
}

impl StatsCollector {
    pub fn record_alloc(&self, size: usize) {
        self.allocations.increment();
        self.live.add(size);
    }

    /// `released` is false when the external free failed; the bytes still
    /// leave the live set because the handle is gone either way.
    pub fn record_free(&self, size: usize, released: bool) {
        if released {
            self.deallocations.increment();
        }
        self.live.sub(size);
    }

    pub fn record_upload(&self, bytes: usize) {
        self.uploads.increment();
        self.bytes_up.add(bytes as u64);
    }

    pub fn record_download(&self, bytes: usize) {
        self.downloads.increment();
        self.bytes_down.add(bytes as u64);
    }

    pub fn record_failure(&self) {
        self.failures.increment();
    }

    pub fn snapshot(&self) -> DeviceStats {
        DeviceStats {
            allocation_count: self.allocations.get(),
            deallocation_count: self.deallocations.get(),
            live_bytes: self.live.get(),
            peak_bytes: self.live.peak(),
            upload_count: self.uploads.get(),
            download_count: self.downloads.get(),
            bytes_uploaded: self.bytes_up.get(),
            bytes_downloaded: self.bytes_down.get(),
            failed_ops: self.failures.get(),
        }
    }
}
