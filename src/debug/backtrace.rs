//! Allocation backtrace capture.

/// Capture the current call stack as text.
pub fn capture() -> String {
    let bt = backtrace::Backtrace::new();
    format!("{:?}", bt)
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_capture_is_not_empty() {
        assert!(!super::capture().is_empty());
    }
}
