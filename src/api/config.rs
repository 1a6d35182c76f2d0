//! Facade configuration.

use std::sync::Arc;

use crate::diagnostics::{DeviceEvent, DeviceHooks, DiagnosticSink};
use crate::util::size::parse_bytes;

/// What the facade does after reporting a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Return the error to the caller (default)
    #[default]
    Propagate,
    /// Panic with the error message
    Panic,
    /// Print `<op> failed, err: <description>` and exit the process with status 1
    Exit,
}

impl FailurePolicy {
    /// Parse a `DEVMEM_FAILURE_POLICY` value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "propagate" | "return" => Some(FailurePolicy::Propagate),
            "panic" => Some(FailurePolicy::Panic),
            "exit" | "fail-fast" => Some(FailurePolicy::Exit),
            _ => None,
        }
    }
}

/// Configuration for a `DeviceMemory` facade.
#[derive(Debug, Clone, Default)]
pub struct DeviceConfig {
    /// Failure handling after the diagnostic is reported
    pub failure_policy: FailurePolicy,

    /// Cap on live device bytes through this facade (0 = unlimited)
    pub memory_limit: usize,

    /// Record an allocation backtrace per live buffer (needs the `debug` feature)
    pub track_backtraces: bool,

    /// Event listeners and diagnostic sinks
    pub hooks: DeviceHooks,
}

impl DeviceConfig {
    /// Panic on every failure. Useful in tests and tools.
    pub fn strict() -> Self {
        Self::default().with_failure_policy(FailurePolicy::Panic)
    }

    /// Exit the process on every failure, like a C helper that calls `exit()`.
    pub fn fail_fast() -> Self {
        Self::default().with_failure_policy(FailurePolicy::Exit)
    }

    /// Read `DEVMEM_FAILURE_POLICY` and `DEVMEM_MEMORY_LIMIT` on top of the defaults.
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(policy) = std::env::var("DEVMEM_FAILURE_POLICY")
            .ok()
            .and_then(|v| FailurePolicy::parse(&v))
        {
            config.failure_policy = policy;
        }

        if let Some(limit) = std::env::var("DEVMEM_MEMORY_LIMIT")
            .ok()
            .and_then(|v| parse_bytes(&v))
        {
            config.memory_limit = limit;
        }

        config
    }

    /// Builder pattern: set failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Builder pattern: set the live device memory limit.
    pub fn with_memory_limit(mut self, limit: usize) -> Self {
        self.memory_limit = limit;
        self
    }

    /// Builder pattern: enable allocation backtraces.
    pub fn with_backtraces(mut self, enable: bool) -> Self {
        self.track_backtraces = enable;
        self
    }

    /// Builder pattern: add an event listener.
    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&DeviceEvent) + Send + Sync + 'static,
    {
        self.hooks.add_listener(listener);
        self
    }

    /// Builder pattern: add a diagnostic sink.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.hooks.add_sink(sink);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::size::mb;

    #[test]
    fn test_defaults() {
        let config = DeviceConfig::default();
        assert_eq!(config.failure_policy, FailurePolicy::Propagate);
        assert_eq!(config.memory_limit, 0);
        assert!(!config.track_backtraces);
        assert!(config.hooks.is_empty());
    }

    #[test]
    fn test_presets_and_builders() {
        assert_eq!(DeviceConfig::strict().failure_policy, FailurePolicy::Panic);
        assert_eq!(DeviceConfig::fail_fast().failure_policy, FailurePolicy::Exit);

        let config = DeviceConfig::default()
            .with_memory_limit(mb(256))
            .with_backtraces(true)
            .with_listener(|_| {});
        assert_eq!(config.memory_limit, mb(256));
        assert!(config.track_backtraces);
        assert!(!config.hooks.is_empty());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(FailurePolicy::parse("EXIT"), Some(FailurePolicy::Exit));
        assert_eq!(FailurePolicy::parse("fail-fast"), Some(FailurePolicy::Exit));
        assert_eq!(FailurePolicy::parse(" panic "), Some(FailurePolicy::Panic));
        assert_eq!(FailurePolicy::parse("return"), Some(FailurePolicy::Propagate));
        assert_eq!(FailurePolicy::parse("retry"), None);
    }
}
