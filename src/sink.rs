//! Error sinks: where callback failures go.
//!
//! An adaptor reports every error (or panic) raised by its plain handler
//! to the sink it was built with. What happens next is the sink's
//! business: log it, collect it, or stop the reactor.

use std::sync::{Arc, Mutex, PoisonError};

use crate::handler::{EventKind, HandlerError};

/// Receives errors raised inside event callbacks.
pub trait ErrorSink: Send + Sync {
    fn report(&self, kind: EventKind, error: &HandlerError);
}

impl<F> ErrorSink for F
where
    F: Fn(EventKind, &HandlerError) + Send + Sync,
{
    fn report(&self, kind: EventKind, error: &HandlerError) {
        self(kind, error)
    }
}

/// Logs each report at error level and carries on.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, kind: EventKind, error: &HandlerError) {
        tracing::error!(event = %kind, error = %error, "event handler failed");
    }
}

/// Collects reports in memory.
///
/// Clones share the same log, so one clone can be handed to the resolver
/// while another is inspected.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    reports: Arc<Mutex<Vec<(EventKind, HandlerError)>>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every report so far, oldest first.
    pub fn reports(&self) -> Vec<(EventKind, HandlerError)> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove and return every report so far.
    pub fn take(&self) -> Vec<(EventKind, HandlerError)> {
        std::mem::take(&mut *self.reports.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorSink for ErrorLog {
    fn report(&self, kind: EventKind, error: &HandlerError) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((kind, error.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn error_log_collects_in_order() {
        let log = ErrorLog::new();
        let sink: Arc<dyn ErrorSink> = Arc::new(log.clone());
        sink.report(EventKind::Delivery, &HandlerError::failed("one"));
        sink.report(EventKind::LinkFlow, &HandlerError::failed("two"));

        let reports = log.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].0, EventKind::Delivery);
        assert_eq!(reports[1].1.to_string(), "handler failed: two");
    }

    #[test]
    fn take_drains_log() {
        let log = ErrorLog::new();
        log.report(EventKind::TimerTask, &HandlerError::failed("x"));
        assert_eq!(log.take().len(), 1);
        assert!(log.is_empty());
    }

    #[test]
    fn closure_is_a_sink() {
        let calls = AtomicUsize::new(0);
        let sink = |_: EventKind, _: &HandlerError| {
            calls.fetch_add(1, Ordering::SeqCst);
        };
        sink.report(EventKind::ReactorInit, &HandlerError::failed("x"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tracing_sink_does_not_panic() {
        TracingSink.report(EventKind::ReactorFinal, &HandlerError::Panicked("boom".into()));
    }
}
