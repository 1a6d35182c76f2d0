//! Facade error type.

use std::fmt;

use crate::api::transfer::Operation;
use crate::diagnostics::{AssertionFailure, Diagnostic, DM101, DM102, DM201, DM301, DM901};
use crate::gpu::{BackendError, DevicePtr};

/// Errors returned by `DeviceMemory` operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The external allocator refused the request
    AllocationFailed(BackendError),
    /// The external API failed to release a handle
    DeallocationFailed(BackendError),
    /// The host-to-device copy failed
    UploadFailed(BackendError),
    /// The device-to-host copy failed
    DownloadFailed(BackendError),
    /// A zero-byte allocation was requested
    ZeroSize,
    /// The copy length exceeds the host or the device buffer
    LengthOutOfBounds {
        /// Bytes the caller asked to copy
        requested: usize,
        /// Host buffer length
        host: usize,
        /// Device buffer length
        device: usize,
    },
    /// The allocation would exceed `DeviceConfig::memory_limit`
    BudgetExceeded {
        /// Bytes requested
        requested: usize,
        /// Live bytes before the request
        live: usize,
        /// Configured limit
        limit: usize,
    },
    /// A raw handle that this facade does not consider detached
    InvalidHandle(DevicePtr),
    /// A `dm_check!` failed inside a caller's device routine
    Assertion(AssertionFailure),
}

impl DeviceError {
    /// The operation this error belongs to, if it came from an external call
    /// or a per-operation contract check.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            DeviceError::AllocationFailed(_)
            | DeviceError::ZeroSize
            | DeviceError::BudgetExceeded { .. } => Some(Operation::Allocate),
            DeviceError::DeallocationFailed(_) => Some(Operation::Free),
            DeviceError::UploadFailed(_) => Some(Operation::Upload),
            DeviceError::DownloadFailed(_) => Some(Operation::Download),
            DeviceError::LengthOutOfBounds { .. }
            | DeviceError::InvalidHandle(_)
            | DeviceError::Assertion(_) => None,
        }
    }

    /// The coded diagnostic reported for this error.
    pub fn diagnostic(&self) -> &'static Diagnostic {
        match self {
            DeviceError::AllocationFailed(_) => Operation::Allocate.failure_diagnostic(),
            DeviceError::DeallocationFailed(_) => Operation::Free.failure_diagnostic(),
            DeviceError::UploadFailed(_) => Operation::Upload.failure_diagnostic(),
            DeviceError::DownloadFailed(_) => Operation::Download.failure_diagnostic(),
            DeviceError::ZeroSize => &DM101,
            DeviceError::LengthOutOfBounds { .. } => &DM102,
            DeviceError::BudgetExceeded { .. } => &DM301,
            DeviceError::InvalidHandle(_) => &DM201,
            DeviceError::Assertion(_) => &DM901,
        }
    }

    /// The backend error behind an external-operation failure.
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            DeviceError::AllocationFailed(e)
            | DeviceError::DeallocationFailed(e)
            | DeviceError::UploadFailed(e)
            | DeviceError::DownloadFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::AllocationFailed(e) => write!(f, "device malloc failed, err: {}", e),
            DeviceError::DeallocationFailed(e) => write!(f, "device free failed, err: {}", e),
            DeviceError::UploadFailed(e) => {
                write!(f, "host to device memcpy failed, err: {}", e)
            }
            DeviceError::DownloadFailed(e) => {
                write!(f, "device to host memcpy failed, err: {}", e)
            }
            DeviceError::ZeroSize => write!(f, "zero-size device allocation requested"),
            DeviceError::LengthOutOfBounds {
                requested,
                host,
                device,
            } => write!(
                f,
                "transfer of {} bytes exceeds buffers (host {} bytes, device {} bytes)",
                requested, host, device
            ),
            DeviceError::BudgetExceeded {
                requested,
                live,
                limit,
            } => write!(
                f,
                "allocation of {} bytes exceeds device memory limit ({} live, {} limit)",
                requested, live, limit
            ),
            DeviceError::InvalidHandle(ptr) => {
                write!(f, "device handle {} is not owned by this facade", ptr)
            }
            DeviceError::Assertion(failure) => write!(f, "{}", failure),
        }
    }
}

impl std::error::Error for DeviceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeviceError::Assertion(failure) => Some(failure),
            other => other
                .backend_error()
                .map(|e| e as &(dyn std::error::Error + 'static)),
        }
    }
}

impl From<AssertionFailure> for DeviceError {
    fn from(failure: AssertionFailure) -> Self {
        DeviceError::Assertion(failure)
    }
}

/// Result alias for facade operations.
pub type Result<T> = std::result::Result<T, DeviceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display_matches_fail_fast_wording() {
        let err = DeviceError::AllocationFailed(BackendError::api(2, "out of memory"));
        assert_eq!(err.to_string(), "device malloc failed, err: out of memory (code 2)");
        assert_eq!(err.operation(), Some(Operation::Allocate));
        assert_eq!(err.diagnostic().code, "DM001");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_contract_errors_have_codes() {
        assert_eq!(DeviceError::ZeroSize.diagnostic().code, "DM101");
        let oob = DeviceError::LengthOutOfBounds {
            requested: 10,
            host: 4,
            device: 16,
        };
        assert_eq!(oob.diagnostic().code, "DM102");
        assert!(oob.source().is_none());
        assert_eq!(
            DeviceError::InvalidHandle(DevicePtr::from_raw(1)).diagnostic().code,
            "DM201"
        );
    }

    #[test]
    fn test_from_assertion() {
        let failure = AssertionFailure::new("ok", "f.rs", 1, None);
        let err: DeviceError = failure.clone().into();
        assert_eq!(err, DeviceError::Assertion(failure));
        assert_eq!(err.diagnostic().code, "DM901");
    }
}
