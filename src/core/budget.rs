//! Device memory limit checks.

/// Result of a limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    /// Under the limit, allocation allowed
    Ok,

    /// Over the limit, allocation denied
    Exceeded {
        /// Bytes live or reserved before the request
        live: usize,
        /// Configured limit
        limit: usize,
    },
}

/// Check whether `additional` more bytes fit under `limit` (0 = unlimited).
pub fn check_status(live: usize, additional: usize, limit: usize) -> BudgetStatus {
    if limit == 0 {
        return BudgetStatus::Ok;
    }

    match live.checked_add(additional) {
        Some(projected) if projected <= limit => BudgetStatus::Ok,
        _ => BudgetStatus::Exceeded { live, limit },
    }
}
