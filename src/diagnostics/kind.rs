//! Diagnostic kinds and core types.
//!
//! Mirrors rustc's diagnostic levels for familiar UX.

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A hard error - something is definitely wrong.
    Error,
    /// A warning - something is probably wrong or suboptimal.
    Warning,
    /// Additional context about another diagnostic.
    Note,
    /// Actionable suggestion to fix the issue.
    Help,
}

impl DiagnosticKind {
    /// Get the display prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Note => "note",
            DiagnosticKind::Help => "help",
        }
    }
}

/// A diagnostic message with code, message, and optional context.
///
/// Diagnostic codes follow the pattern:
/// - `DM0xx` - External device API failures
/// - `DM1xx` - Size and length contract violations
/// - `DM2xx` - Handle ownership violations
/// - `DM3xx` - Memory limit issues
/// - `DM4xx` - Lifetime/leak issues
/// - `DM9xx` - Assertions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// Diagnostic code (e.g., "DM001").
    pub code: &'static str,
    /// Primary message.
    pub message: &'static str,
    /// Optional additional context.
    pub note: Option<&'static str>,
    /// Optional fix suggestion.
    pub help: Option<&'static str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub const fn error(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Create a new warning diagnostic.
    pub const fn warning(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Add a note to this diagnostic.
    pub const fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    /// Add a help message to this diagnostic.
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }

    /// Whether this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        self.kind == DiagnosticKind::Error
    }
}

// =============================================================================
// Predefined diagnostics (DM0xx - External device API)
// =============================================================================

/// DM001: Device allocation failed.
pub const DM001: Diagnostic = Diagnostic::error(
    "DM001",
    "device malloc failed"
).with_note("the device memory API rejected the allocation request")
 .with_help("check free device memory with DeviceMemory::mem_info(), or reduce the allocation size");

/// DM002: Device deallocation failed.
pub const DM002: Diagnostic = Diagnostic::error(
    "DM002",
    "device free failed"
).with_note("the handle is invalid after this call whether or not the release succeeded")
 .with_help("a failed free usually means the device context was lost or already torn down");

/// DM003: Host-to-device copy failed.
pub const DM003: Diagnostic = Diagnostic::error(
    "DM003",
    "host to device memcpy failed"
).with_note("the device buffer contents are unspecified after a failed upload");

/// DM004: Device-to-host copy failed.
pub const DM004: Diagnostic = Diagnostic::error(
    "DM004",
    "device to host memcpy failed"
).with_note("the host buffer contents are unspecified after a failed download");

// =============================================================================
// Predefined diagnostics (DM1xx - Sizes)
// =============================================================================

/// DM101: Zero-size allocation.
pub const DM101: Diagnostic = Diagnostic::error(
    "DM101",
    "zero-size device allocation requested"
).with_note("device allocations must be at least one byte")
 .with_help("skip the allocation when there is nothing to transfer");

/// DM102: Transfer longer than one of its buffers.
pub const DM102: Diagnostic = Diagnostic::error(
    "DM102",
    "transfer length exceeds buffer capacity"
).with_note("both the host and the device buffer must hold at least `size` bytes")
 .with_help("pass the length of the smaller buffer, or allocate a larger device buffer");

// =============================================================================
// Predefined diagnostics (DM2xx - Handles)
// =============================================================================

/// DM201: Raw handle not owned by this facade.
pub const DM201: Diagnostic = Diagnostic::error(
    "DM201",
    "raw device handle is not owned by this facade"
).with_note("the handle was never allocated here, was already freed, or is already owned by a DeviceBuffer")
 .with_help("only pass pointers obtained from DeviceBuffer::into_raw() on the same DeviceMemory");

// =============================================================================
// Predefined diagnostics (DM3xx - Limits)
// =============================================================================

/// DM301: Allocation exceeds the configured device memory limit.
pub const DM301: Diagnostic = Diagnostic::warning(
    "DM301",
    "allocation exceeds device memory limit"
).with_note("the allocation would push live device memory over DeviceConfig::memory_limit")
 .with_help("raise the limit (DEVMEM_MEMORY_LIMIT) or free buffers before allocating");

// =============================================================================
// Predefined diagnostics (DM4xx - Lifetimes)
// =============================================================================

/// DM401: Live allocations at shutdown.
pub const DM401: Diagnostic = Diagnostic::warning(
    "DM401",
    "device allocations still live at shutdown"
).with_note("handles detached with DeviceBuffer::into_raw() were never reclaimed")
 .with_help("reclaim raw handles with DeviceMemory::from_raw() and drop them; enable the `debug` feature for allocation backtraces");

// =============================================================================
// Predefined diagnostics (DM9xx - Assertions)
// =============================================================================

/// DM901: Assertion failed.
pub const DM901: Diagnostic = Diagnostic::error(
    "DM901",
    "assertion failed"
).with_note("execution does not continue past a failed dm_assert!")
 .with_help("use dm_check! to receive the failure as a value instead of a panic");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predefined_kinds() {
        assert!(DM001.is_error());
        assert!(DM901.is_error());
        assert!(!DM301.is_error());
        assert_eq!(DM401.kind, DiagnosticKind::Warning);
    }

    #[test]
    fn test_builder() {
        let diag = Diagnostic::warning("DM999", "custom")
            .with_note("a note")
            .with_help("some help");
        assert_eq!(diag.code, "DM999");
        assert_eq!(diag.note, Some("a note"));
        assert_eq!(diag.help, Some("some help"));
        assert_eq!(diag.kind.prefix(), "warning");
    }
}
