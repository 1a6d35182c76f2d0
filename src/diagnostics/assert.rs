//! Invariant checks that never let execution continue silently.
//!
//! `dm_assert!` reports DM901 and panics. `dm_check!` reports DM901 and
//! hands back an [`AssertionFailure`] for `?` propagation.
//! `dm_debug_assert!` is the debug-build-only form of `dm_assert!`.

use std::fmt;

use super::emit::emit_assertion;
use super::kind::DM901;

/// A violated invariant: the stringified condition and where it was checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    /// The condition as written at the call site.
    pub condition: &'static str,
    /// Source file of the check.
    pub file: &'static str,
    /// Source line of the check.
    pub line: u32,
    /// Caller-supplied label, if any.
    pub label: Option<String>,
}

impl AssertionFailure {
    /// Describe a failed check.
    pub fn new(condition: &'static str, file: &'static str, line: u32, label: Option<String>) -> Self {
        Self {
            condition,
            file,
            line,
            label,
        }
    }

    /// Emit DM901 for this failure and return it.
    ///
    /// The report reaches stderr in release builds too, with or without the
    /// `diagnostics` feature.
    pub fn report(self) -> Self {
        emit_assertion(&DM901, &self.to_string());
        self
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "assertion failed: `{}` in file: {} at line: {}",
            self.condition, self.file, self.line
        )?;
        if let Some(ref label) = self.label {
            write!(f, " ({})", label)?;
        }
        Ok(())
    }
}

impl std::error::Error for AssertionFailure {}

/// Report a failed `dm_assert!` and stop.
#[cold]
#[inline(never)]
pub fn assert_failed(
    condition: &'static str,
    file: &'static str,
    line: u32,
    label: Option<String>,
) -> ! {
    let failure = AssertionFailure::new(condition, file, line, label).report();
    panic!("{}", failure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_label() {
        let failure = AssertionFailure::new("len > 0", "src/lib.rs", 12, Some("upload".into()));
        assert_eq!(
            failure.to_string(),
            "assertion failed: `len > 0` in file: src/lib.rs at line: 12 (upload)"
        );
    }

    #[test]
    #[should_panic(expected = "assertion failed: `1 + 1 == 3`")]
    fn test_assert_failed_panics() {
        assert_failed("1 + 1 == 3", file!(), line!(), None);
    }
}
