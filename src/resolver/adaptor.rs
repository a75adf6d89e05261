//! Adaptor: exposes a plain event handler to the native core.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::handler::{Event, EventHandler, HandlerError};
use crate::native::{NativeCore, NativeHandler};
use crate::sink::ErrorSink;

/// Bridges native callbacks onto a plain [`EventHandler`].
///
/// Holds strong references to the handler and to the sink, so both live
/// at least as long as the handle the core issued for this adaptor.
pub struct Adaptor {
    handler: Arc<dyn EventHandler>,
    on_error: Arc<dyn ErrorSink>,
}

impl Adaptor {
    pub fn new(handler: Arc<dyn EventHandler>, on_error: Arc<dyn ErrorSink>) -> Self {
        Self { handler, on_error }
    }

    /// The wrapped plain handler.
    pub fn handler(&self) -> &Arc<dyn EventHandler> {
        &self.handler
    }
}

impl NativeHandler for Adaptor {
    fn handle(&self, _core: &dyn NativeCore, event: &Event) {
        let outcome = catch_unwind(AssertUnwindSafe(|| event.dispatch(self.handler.as_ref())));
        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e,
            Err(panic) => HandlerError::Panicked(panic_message(panic.as_ref())),
        };
        self.on_error.report(event.kind(), &error);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::EventKind;
    use crate::native::HandleTable;
    use crate::sink::ErrorLog;

    struct Rejecting;

    impl EventHandler for Rejecting {
        fn on_delivery(&self, _event: &Event) -> Result<(), HandlerError> {
            Err(HandlerError::failed("bad delivery"))
        }
    }

    struct Panicking;

    impl EventHandler for Panicking {
        fn on_link_flow(&self, _event: &Event) -> Result<(), HandlerError> {
            panic!("credit underflow");
        }
    }

    fn run(handler: Arc<dyn EventHandler>, kind: EventKind) -> ErrorLog {
        let log = ErrorLog::new();
        let adaptor = Adaptor::new(handler, Arc::new(log.clone()));
        adaptor.handle(&HandleTable::new(1), &Event::new(kind));
        log
    }

    #[test]
    fn success_reports_nothing() {
        let log = run(Arc::new(Rejecting), EventKind::ReactorInit);
        assert!(log.is_empty());
    }

    #[test]
    fn handler_error_goes_to_sink() {
        let log = run(Arc::new(Rejecting), EventKind::Delivery);
        let reports = log.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, EventKind::Delivery);
        assert!(matches!(reports[0].1, HandlerError::Failed(ref r) if r == "bad delivery"));
    }

    #[test]
    fn panic_is_caught_and_reported() {
        let log = run(Arc::new(Panicking), EventKind::LinkFlow);
        let reports = log.reports();
        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0].1, HandlerError::Panicked(ref m) if m == "credit underflow"));
    }

    #[test]
    fn formatted_panic_message_is_kept() {
        let payload: Box<dyn Any + Send> = Box::new(format!("code {}", 7));
        assert_eq!(panic_message(payload.as_ref()), "code 7");
    }
}
