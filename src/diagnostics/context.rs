//! Diagnostic context - backend, operation and thread awareness.
//!
//! Provides the runtime details printed under a diagnostic's `context:` line.

use std::thread::ThreadId;

use crate::api::transfer::Operation;
use crate::gpu::DevicePtr;

/// Diagnostic context containing runtime state.
#[derive(Debug, Clone)]
pub struct DiagContext {
    /// Backend name (e.g. "cuda:0").
    pub backend: Option<String>,
    /// The facade operation that was running.
    pub operation: Option<Operation>,
    /// Byte count of the allocation or transfer.
    pub bytes: Option<usize>,
    /// Device address involved, if any.
    pub ptr: Option<DevicePtr>,
    /// Current thread ID.
    pub thread_id: ThreadId,
    /// Thread name (if available).
    pub thread_name: Option<String>,
    /// Free-form detail (error text, source location).
    pub detail: Option<String>,
}

impl DiagContext {
    /// Capture the current thread.
    pub fn capture() -> Self {
        let thread = std::thread::current();
        Self {
            backend: None,
            operation: None,
            bytes: None,
            ptr: None,
            thread_id: thread.id(),
            thread_name: thread.name().map(String::from),
            detail: None,
        }
    }

    /// Capture the current thread for a facade operation.
    pub fn for_op(backend: &str, operation: Operation) -> Self {
        let mut ctx = Self::capture();
        ctx.backend = Some(backend.to_string());
        ctx.operation = Some(operation);
        ctx
    }

    /// Attach a byte count.
    pub fn with_bytes(mut self, bytes: usize) -> Self {
        self.bytes = Some(bytes);
        self
    }

    /// Attach a device address.
    pub fn with_ptr(mut self, ptr: DevicePtr) -> Self {
        self.ptr = Some(ptr);
        self
    }

    /// Attach free-form detail.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Format context for diagnostic output.
    pub fn format(&self) -> String {
        let mut parts = Vec::new();

        if let Some(ref backend) = self.backend {
            parts.push(format!("backend={}", backend));
        }
        if let Some(op) = self.operation {
            parts.push(format!("op={}", op));
        }
        if let Some(bytes) = self.bytes {
            parts.push(format!("bytes={}", bytes));
        }
        if let Some(ptr) = self.ptr {
            parts.push(format!("ptr={}", ptr));
        }

        if let Some(ref name) = self.thread_name {
            parts.push(format!("thread=\"{}\"", name));
        } else {
            parts.push(format!("thread={:?}", self.thread_id));
        }

        if let Some(ref detail) = self.detail {
            parts.push(detail.clone());
        }

        parts.join(", ")
    }
}

impl std::fmt::Display for DiagContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format())
    }
}
