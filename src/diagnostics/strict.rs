//! Strict mode handling for diagnostics.
//!
//! Controls whether an emitted diagnostic is also fatal:
//! - Warn: just emit the diagnostic
//! - PanicOnError / PanicOnWarning: emit and then panic (useful for CI)
//!
//! Assertions (`dm_assert!`) halt regardless of the strict mode.

use std::sync::atomic::{AtomicU8, Ordering};

use super::kind::DiagnosticKind;

/// Strict mode behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StrictMode {
    /// Just warn, don't panic.
    Warn = 0,
    /// Panic on errors.
    PanicOnError = 1,
    /// Panic on errors and warnings.
    PanicOnWarning = 2,
}

impl StrictMode {
    /// Parse the `DEVMEM_STRICT` value. Unknown values fall back to `Warn`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "1" | "error" | "true" => StrictMode::PanicOnError,
            "2" | "warning" | "all" => StrictMode::PanicOnWarning,
            _ => StrictMode::Warn,
        }
    }

    /// Whether a diagnostic of `kind` is fatal under this mode.
    pub fn is_fatal(self, kind: DiagnosticKind) -> bool {
        match (self, kind) {
            (StrictMode::PanicOnWarning, DiagnosticKind::Error | DiagnosticKind::Warning) => true,
            (StrictMode::PanicOnError, DiagnosticKind::Error) => true,
            _ => false,
        }
    }
}

impl From<u8> for StrictMode {
    fn from(val: u8) -> Self {
        match val {
            1 => StrictMode::PanicOnError,
            2 => StrictMode::PanicOnWarning,
            _ => StrictMode::Warn,
        }
    }
}

/// Global strict mode setting.
static STRICT_MODE: AtomicU8 = AtomicU8::new(0);

/// Set the strict mode.
pub fn set_strict_mode(mode: StrictMode) {
    STRICT_MODE.store(mode as u8, Ordering::Relaxed);
}

/// Get the current strict mode.
pub fn strict_mode() -> StrictMode {
    StrictMode::from(STRICT_MODE.load(Ordering::Relaxed))
}

/// Check if a diagnostic of this kind should panic right now.
pub fn should_panic(kind: DiagnosticKind) -> bool {
    strict_mode().is_fatal(kind)
}

/// RAII guard for temporarily setting strict mode.
pub struct StrictModeGuard {
    previous: StrictMode,
}

impl StrictModeGuard {
    /// Create a new guard that sets strict mode.
    pub fn new(mode: StrictMode) -> Self {
        let previous = strict_mode();
        set_strict_mode(mode);
        Self { previous }
    }

    /// Create a guard that enables panic-on-error.
    pub fn panic_on_error() -> Self {
        Self::new(StrictMode::PanicOnError)
    }
}

impl Drop for StrictModeGuard {
    fn drop(&mut self) {
        set_strict_mode(self.previous);
    }
}

/// Initialize strict mode from the `DEVMEM_STRICT` environment variable.
///
/// - "0" or "warn" -> Warn
/// - "1" or "error" -> PanicOnError
/// - "2" or "warning" -> PanicOnWarning
pub fn init_from_env() {
    if let Ok(val) = std::env::var("DEVMEM_STRICT") {
        set_strict_mode(StrictMode::parse(&val));
    }
}
