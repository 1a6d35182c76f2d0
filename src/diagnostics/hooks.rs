//! Event hooks for embedding applications.
//!
//! Listeners receive every allocation, release, transfer and failure a
//! facade performs. Sinks receive the coded diagnostics it reports.

use std::fmt;
use std::sync::Arc;

use crate::api::transfer::Operation;
use crate::gpu::DevicePtr;

use super::emit::DiagnosticSink;
use super::kind::Diagnostic;

/// Events emitted by a `DeviceMemory` facade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Device memory was allocated
    Allocated { ptr: DevicePtr, size: usize },

    /// Device memory was released
    Freed { ptr: DevicePtr, size: usize },

    /// Bytes were copied host to device
    Uploaded { ptr: DevicePtr, bytes: usize },

    /// Bytes were copied device to host
    Downloaded { ptr: DevicePtr, bytes: usize },

    /// An operation took the failure path (`None` for raw-handle reclaims)
    Failed {
        operation: Option<Operation>,
        code: &'static str,
        message: String,
    },
}

type Listener = Arc<dyn Fn(&DeviceEvent) + Send + Sync>;

/// Listeners and sinks attached to a facade through its config.
#[derive(Clone, Default)]
pub struct DeviceHooks {
    listeners: Vec<Listener>,
    sinks: Vec<Arc<dyn DiagnosticSink>>,
}

impl DeviceHooks {
    /// Create empty hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event listener.
    pub fn add_listener<F>(&mut self, listener: F)
    where
        F: Fn(&DeviceEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Register a diagnostic sink.
    pub fn add_sink(&mut self, sink: Arc<dyn DiagnosticSink>) {
        self.sinks.push(sink);
    }

    /// Whether any listener or sink is attached.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty() && self.sinks.is_empty()
    }

    /// Emit an event to all listeners.
    pub fn emit(&self, event: DeviceEvent) {
        for listener in &self.listeners {
            listener(&event);
        }
    }

    /// Forward a diagnostic to all sinks.
    pub fn report(&self, diag: &Diagnostic, context: Option<&str>) {
        for sink in &self.sinks {
            sink.emit(diag, context);
        }
    }
}

impl fmt::Debug for DeviceHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHooks")
            .field("listeners", &self.listeners.len())
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::emit::CollectingSink;
    use crate::diagnostics::kind::DM003;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_event_emission() {
        let mut hooks = DeviceHooks::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let counter_clone = counter.clone();
        hooks.add_listener(move |event| {
            if matches!(event, DeviceEvent::Allocated { .. }) {
                counter_clone.fetch_add(1, Ordering::Relaxed);
            }
        });

        let ptr = DevicePtr::from_raw(0x100);
        hooks.emit(DeviceEvent::Allocated { ptr, size: 16 });
        hooks.emit(DeviceEvent::Freed { ptr, size: 16 });

        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_sinks_receive_reports() {
        let sink = Arc::new(CollectingSink::new());
        let mut hooks = DeviceHooks::new();
        assert!(hooks.is_empty());
        hooks.add_sink(sink.clone());

        hooks.report(&DM003, Some("bytes=8"));

        let collected = sink.drain();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].diagnostic.code, "DM003");
    }
}
