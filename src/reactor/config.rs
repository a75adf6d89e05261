//! Reactor configuration.

/// What the reactor does when an event callback fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// End the run; `Reactor::run` returns the error.
    #[default]
    Stop,
    /// Log the error and keep going.
    Log,
}

/// Reactor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactorConfig {
    /// Upper bound on live native handles.
    pub max_handles: usize,
    /// Error policy for callbacks on adaptors the reactor builds.
    pub on_error: ErrorPolicy,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            max_handles: 4096,
            on_error: ErrorPolicy::Stop,
        }
    }
}
