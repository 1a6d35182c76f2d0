//! Diagnostic macros for user-facing API.
//!
//! These macros provide a clean, rustc-like diagnostic experience.

/// Emit a runtime diagnostic.
///
/// # Example
///
/// ```rust
/// devmem::dm_diagnostic!(
///     Warning,
///     code = "DM999",
///     message = "staging buffer reused across threads",
///     help = "allocate one staging buffer per worker"
/// );
/// ```
#[macro_export]
macro_rules! dm_diagnostic {
    (
        $kind:ident,
        code = $code:expr,
        message = $msg:expr
        $(, note = $note:expr)?
        $(, help = $help:expr)?
    ) => {{
        let diag = $crate::diagnostics::Diagnostic {
            kind: $crate::diagnostics::DiagnosticKind::$kind,
            code: $code,
            message: $msg,
            note: None $(.or(Some($note)))?,
            help: None $(.or(Some($help)))?,
        };
        $crate::diagnostics::emit::emit(&diag);
    }};
}

/// Emit a predefined diagnostic by code, optionally with context.
///
/// # Example
///
/// ```rust
/// devmem::dm_emit!(DM401);
/// devmem::dm_emit!(DM301, "requested=4096 limit=1024");
/// ```
#[macro_export]
macro_rules! dm_emit {
    ($code:ident) => {{
        $crate::diagnostics::emit::emit(&$crate::diagnostics::$code);
    }};
    ($code:ident, $($ctx:tt)+) => {{
        $crate::diagnostics::emit::emit_with_context(
            &$crate::diagnostics::$code,
            &format!($($ctx)+),
        );
    }};
}

/// Assert an invariant. On failure, reports DM901 with the condition and
/// source location, then panics. Never compiled out.
///
/// # Example
///
/// ```rust,should_panic
/// let len = 0usize;
/// devmem::dm_assert!(len > 0, "upload length");
/// ```
#[macro_export]
macro_rules! dm_assert {
    ($cond:expr $(,)?) => {{
        if !$cond {
            $crate::diagnostics::assert::assert_failed(
                stringify!($cond),
                file!(),
                line!(),
                None,
            );
        }
    }};
    ($cond:expr, $($label:tt)+) => {{
        if !$cond {
            $crate::diagnostics::assert::assert_failed(
                stringify!($cond),
                file!(),
                line!(),
                Some(format!($($label)+)),
            );
        }
    }};
}

/// Check an invariant and return the outcome as a value.
///
/// Evaluates to `Result<(), AssertionFailure>`; a failure is reported as
/// DM901 before it is returned.
///
/// # Example
///
/// ```rust
/// fn checked(len: usize) -> Result<(), devmem::AssertionFailure> {
///     devmem::dm_check!(len > 0, "length")?;
///     Ok(())
/// }
/// assert!(checked(0).is_err());
/// ```
#[macro_export]
macro_rules! dm_check {
    ($cond:expr $(,)?) => {
        if $cond {
            ::core::result::Result::Ok(())
        } else {
            ::core::result::Result::Err(
                $crate::diagnostics::assert::AssertionFailure::new(
                    stringify!($cond),
                    file!(),
                    line!(),
                    None,
                )
                .report(),
            )
        }
    };
    ($cond:expr, $($label:tt)+) => {
        if $cond {
            ::core::result::Result::Ok(())
        } else {
            ::core::result::Result::Err(
                $crate::diagnostics::assert::AssertionFailure::new(
                    stringify!($cond),
                    file!(),
                    line!(),
                    Some(format!($($label)+)),
                )
                .report(),
            )
        }
    };
}

/// `dm_assert!` in debug builds; type-checked but never evaluated in release.
#[macro_export]
macro_rules! dm_debug_assert {
    ($($arg:tt)+) => {{
        if cfg!(debug_assertions) {
            $crate::dm_assert!($($arg)+);
        }
    }};
}

/// Crate-internal logging through the `log` facade when that feature is on.
macro_rules! dm_log {
    ($level:ident, $($arg:tt)+) => {{
        #[cfg(feature = "log")]
        {
            log::$level!($($arg)+);
        }
        #[cfg(not(feature = "log"))]
        {
            if false {
                let _ = format!($($arg)+);
            }
        }
    }};
}

pub(crate) use dm_log;

// Re-export macros at module level for convenience
pub use crate::{dm_assert, dm_check, dm_debug_assert, dm_diagnostic, dm_emit};
