//! Diagnostic emission backend.
//!
//! Handles outputting diagnostics to stderr, the `log` facade, or custom sinks.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_queue::SegQueue;

use super::kind::{Diagnostic, DiagnosticKind};
use super::strict::should_panic;

/// Global flag to suppress diagnostic output (for testing).
static DIAGNOSTICS_SUPPRESSED: AtomicBool = AtomicBool::new(false);

/// Global flag to enable verbose diagnostics.
static VERBOSE_DIAGNOSTICS: AtomicBool = AtomicBool::new(false);

/// Suppress all diagnostic output.
pub fn suppress_diagnostics(suppress: bool) {
    DIAGNOSTICS_SUPPRESSED.store(suppress, Ordering::Relaxed);
}

/// Enable verbose diagnostic output.
pub fn set_verbose(verbose: bool) {
    VERBOSE_DIAGNOSTICS.store(verbose, Ordering::Relaxed);
}

/// Check if diagnostics are suppressed.
pub fn is_suppressed() -> bool {
    DIAGNOSTICS_SUPPRESSED.load(Ordering::Relaxed)
}

/// Emit a diagnostic to stderr.
///
/// Stderr output happens in debug builds, or in release builds with the
/// `diagnostics` feature. With the `log` feature the diagnostic is also
/// forwarded to the `log` facade. Strict mode is applied last.
pub fn emit(diag: &Diagnostic) {
    emit_inner(diag, None, false);
}

/// Emit a diagnostic with additional runtime context.
pub fn emit_with_context(diag: &Diagnostic, context: &str) {
    emit_inner(diag, Some(context), false);
}

/// Emit a failed invariant check. Written to stderr in every build profile.
pub(crate) fn emit_assertion(diag: &Diagnostic, context: &str) {
    emit_inner(diag, Some(context), true);
}

fn emit_inner(diag: &Diagnostic, context: Option<&str>, always_stderr: bool) {
    if is_suppressed() {
        return;
    }

    if always_stderr || cfg!(any(debug_assertions, feature = "diagnostics")) {
        emit_to_stderr(diag, context);
    }

    #[cfg(feature = "log")]
    {
        emit_to_log(diag, context);
    }

    // A second panic while unwinding would abort the process.
    if should_panic(diag.kind) && !std::thread::panicking() {
        match context {
            Some(ctx) => panic!(
                "[devmem][{}] {}\nContext: {}\nStrict mode enabled - diagnostics are fatal.",
                diag.code, diag.message, ctx
            ),
            None => panic!(
                "[devmem][{}] {}\nStrict mode enabled - diagnostics are fatal.",
                diag.code, diag.message
            ),
        }
    }
}

/// Render a diagnostic the way it is printed to stderr.
pub fn render(diag: &Diagnostic, context: Option<&str>) -> String {
    let mut out = format!("[devmem][{}] {}: {}\n", diag.code, diag.kind.prefix(), diag.message);

    if let Some(ctx) = context {
        out.push_str(&format!("  context: {}\n", ctx));
    }
    if let Some(note) = diag.note {
        out.push_str(&format!("  note: {}\n", note));
    }
    if let Some(help) = diag.help {
        out.push_str(&format!("  help: {}\n", help));
    }
    if VERBOSE_DIAGNOSTICS.load(Ordering::Relaxed) && diag.kind == DiagnosticKind::Error {
        out.push_str("  hint: set RUST_BACKTRACE=1 for a backtrace\n");
    }

    out
}

/// Internal: emit to stderr.
fn emit_to_stderr(diag: &Diagnostic, context: Option<&str>) {
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{}", render(diag, context));
}

/// Emit a diagnostic using the log crate.
#[cfg(feature = "log")]
pub fn emit_to_log(diag: &Diagnostic, context: Option<&str>) {
    let ctx = context.unwrap_or("-");
    match diag.kind {
        DiagnosticKind::Error => {
            log::error!("[{}] {} ({})", diag.code, diag.message, ctx);
        }
        DiagnosticKind::Warning => {
            log::warn!("[{}] {} ({})", diag.code, diag.message, ctx);
        }
        DiagnosticKind::Note | DiagnosticKind::Help => {
            log::info!("[{}] {} ({})", diag.code, diag.message, ctx);
        }
    }
}

/// A diagnostic sink trait for custom output.
pub trait DiagnosticSink: Send + Sync {
    /// Handle a diagnostic.
    fn emit(&self, diag: &Diagnostic, context: Option<&str>);
}

/// A diagnostic captured by [`CollectingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedDiagnostic {
    /// The predefined diagnostic.
    pub diagnostic: Diagnostic,
    /// Runtime context, if any.
    pub context: Option<String>,
}

/// A sink that collects diagnostics from any thread without locking.
#[derive(Default)]
pub struct CollectingSink {
    queue: SegQueue<CollectedDiagnostic>,
    errors: AtomicUsize,
}

impl CollectingSink {
    /// Create a new collecting sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of diagnostics waiting to be drained.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing has been collected since the last drain.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Take every collected diagnostic, oldest first.
    pub fn drain(&self) -> Vec<CollectedDiagnostic> {
        let mut out = Vec::with_capacity(self.queue.len());
        while let Some(item) = self.queue.pop() {
            out.push(item);
        }
        self.errors.store(0, Ordering::Relaxed);
        out
    }

    /// Check if any errors were collected since the last drain.
    pub fn has_errors(&self) -> bool {
        self.errors.load(Ordering::Relaxed) > 0
    }

    /// Count collected diagnostics with the given code, without draining.
    pub fn count_code(&self, code: &str) -> usize {
        let items = self.drain();
        let count = items.iter().filter(|d| d.diagnostic.code == code).count();
        for item in items {
            self.push(item);
        }
        count
    }

    fn push(&self, item: CollectedDiagnostic) {
        if item.diagnostic.kind == DiagnosticKind::Error {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        self.queue.push(item);
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diag: &Diagnostic, context: Option<&str>) {
        self.push(CollectedDiagnostic {
            diagnostic: diag.clone(),
            context: context.map(String::from),
        });
    }
}

impl std::fmt::Debug for CollectingSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectingSink")
            .field("pending", &self.queue.len())
            .field("errors", &self.errors.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::kind::{DM001, DM301};

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        sink.emit(&DM001, Some("backend=host"));
        sink.emit(&DM301, None);

        assert_eq!(sink.len(), 2);
        assert!(sink.has_errors());
        assert_eq!(sink.count_code("DM001"), 1);
        assert_eq!(sink.len(), 2);

        let drained = sink.drain();
        assert_eq!(drained[0].diagnostic.code, "DM001");
        assert_eq!(drained[0].context.as_deref(), Some("backend=host"));
        assert!(sink.is_empty());
        assert!(!sink.has_errors());
    }

    #[test]
    fn test_render() {
        let text = render(&DM001, Some("op=allocate"));
        assert!(text.starts_with("[devmem][DM001] error: device malloc failed\n"));
        assert!(text.contains("  context: op=allocate\n"));
        assert!(text.contains("  help: "));
    }

    #[test]
    fn test_suppression() {
        suppress_diagnostics(true);
        assert!(is_suppressed());
        suppress_diagnostics(false);
        assert!(!is_suppressed());
    }
}
