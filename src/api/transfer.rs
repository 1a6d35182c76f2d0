//! Facade operations and transfer length rules.

use std::fmt;

use crate::diagnostics::{Diagnostic, DM001, DM002, DM003, DM004};

/// The four external operations the facade performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Request device memory
    Allocate,
    /// Release device memory
    Free,
    /// Copy host to device
    Upload,
    /// Copy device to host
    Download,
}

impl Operation {
    /// Lowercase name used in logs and diagnostic context.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Allocate => "allocate",
            Operation::Free => "free",
            Operation::Upload => "upload",
            Operation::Download => "download",
        }
    }

    /// The diagnostic reported when the external call for this operation fails.
    pub fn failure_diagnostic(self) -> &'static Diagnostic {
        match self {
            Operation::Allocate => &DM001,
            Operation::Free => &DM002,
            Operation::Upload => &DM003,
            Operation::Download => &DM004,
        }
    }

    /// Direction of data movement, for the two copy operations.
    pub fn direction(self) -> Option<TransferDirection> {
        match self {
            Operation::Upload => Some(TransferDirection::HostToDevice),
            Operation::Download => Some(TransferDirection::DeviceToHost),
            Operation::Allocate | Operation::Free => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a copy between host and device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Host to device (upload)
    HostToDevice,
    /// Device to host (download)
    DeviceToHost,
}

/// Lengths involved in a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TransferPlan {
    pub requested: usize,
    pub host: usize,
    pub device: usize,
}

impl TransferPlan {
    pub(crate) fn new(requested: usize, host: usize, device: usize) -> Self {
        Self {
            requested,
            host,
            device,
        }
    }

    /// Both buffers hold at least `requested` bytes.
    pub(crate) fn fits(&self) -> bool {
        self.requested <= self.host && self.requested <= self.device
    }

    /// Nothing to move; the external API is not called.
    pub(crate) fn is_noop(&self) -> bool {
        self.requested == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_codes() {
        assert_eq!(Operation::Allocate.failure_diagnostic().code, "DM001");
        assert_eq!(Operation::Free.failure_diagnostic().code, "DM002");
        assert_eq!(Operation::Upload.failure_diagnostic().code, "DM003");
        assert_eq!(Operation::Download.failure_diagnostic().code, "DM004");
    }

    #[test]
    fn test_directions() {
        assert_eq!(Operation::Upload.direction(), Some(TransferDirection::HostToDevice));
        assert_eq!(Operation::Download.direction(), Some(TransferDirection::DeviceToHost));
        assert_eq!(Operation::Free.direction(), None);
    }

    #[test]
    fn test_plan_fits() {
        assert!(TransferPlan::new(128, 128, 4096).fits());
        assert!(!TransferPlan::new(4096, 128, 4096).fits());
        assert!(!TransferPlan::new(4097, 8192, 4096).fits());
        assert!(TransferPlan::new(0, 0, 16).is_noop());
    }
}
