//! Reactor context: the handle callbacks use to talk back to the loop.
//!
//! Everything goes through an unbounded channel into the run loop, so a
//! context can be cloned freely, sent across threads, and used from
//! inside a callback the loop is currently running.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use super::ReactorError;
use crate::handler::{EventKind, Handler, HandlerError};
use crate::sink::ErrorSink;

/// A scheduled timer task.
///
/// Clones share the cancellation flag.
#[derive(Debug, Clone)]
pub struct Task {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

impl Task {
    pub(crate) fn new() -> Self {
        // Ids double as the tie-breaker for equal deadlines, so they
        // must increase in schedule order.
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self {
            id: COUNTER.fetch_add(1, Ordering::Relaxed),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Prevent the task from firing. No effect once it has fired.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Command sent from a context to the run loop.
pub(crate) enum Command {
    Schedule {
        deadline: Instant,
        task: Task,
        handler: Option<Handler>,
    },
    Stop,
    Fail {
        kind: EventKind,
        error: HandlerError,
    },
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Schedule {
                deadline,
                task,
                handler,
            } => f
                .debug_struct("Schedule")
                .field("deadline", deadline)
                .field("task", task)
                .field("handler", handler)
                .finish(),
            Command::Stop => f.write_str("Stop"),
            Command::Fail { kind, error } => f
                .debug_struct("Fail")
                .field("kind", kind)
                .field("error", error)
                .finish(),
        }
    }
}

/// Cloneable handle to a reactor's run loop.
#[derive(Debug, Clone)]
pub struct ReactorContext {
    tx: mpsc::UnboundedSender<Command>,
}

impl ReactorContext {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { tx }
    }

    /// Schedule a `timer_task` event `delay` from now.
    ///
    /// The event goes to `handler`, or to the reactor's default handler
    /// when `handler` is `None`. The deadline is fixed at call time.
    ///
    /// # Errors
    ///
    /// Returns [`ReactorError::Closed`] if the reactor has been dropped.
    pub fn schedule(
        &self,
        delay: Duration,
        handler: Option<Handler>,
    ) -> Result<Task, ReactorError> {
        let task = Task::new();
        self.send(Command::Schedule {
            deadline: Instant::now() + delay,
            task: task.clone(),
            handler,
        })?;
        Ok(task)
    }

    /// Ask the loop to finish after the current event.
    ///
    /// `reactor_final` is still emitted.
    pub fn stop(&self) -> Result<(), ReactorError> {
        self.send(Command::Stop)
    }

    fn send(&self, command: Command) -> Result<(), ReactorError> {
        self.tx.send(command).map_err(|_| ReactorError::Closed)
    }
}

/// Sink used under [`ErrorPolicy::Stop`](super::ErrorPolicy::Stop):
/// the first callback error ends the run.
pub(crate) struct StopOnError {
    ctx: ReactorContext,
}

impl StopOnError {
    pub(crate) fn new(ctx: ReactorContext) -> Self {
        Self { ctx }
    }
}

impl ErrorSink for StopOnError {
    fn report(&self, kind: EventKind, error: &HandlerError) {
        tracing::debug!(event = %kind, error = %error, "handler error, stopping reactor");
        let sent = self.ctx.send(Command::Fail {
            kind,
            error: error.clone(),
        });
        if sent.is_err() {
            tracing::trace!(event = %kind, "reactor gone, failure report dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ids_increase() {
        let a = Task::new();
        let b = Task::new();
        assert!(b.id() > a.id());
    }

    #[test]
    fn cancel_is_shared_by_clones() {
        let t = Task::new();
        let clone = t.clone();
        clone.cancel();
        assert!(t.is_cancelled());
    }

    #[test]
    fn schedule_after_loop_dropped_is_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = ReactorContext::new(tx);
        drop(rx);
        assert!(matches!(ctx.schedule(Duration::ZERO, None), Err(ReactorError::Closed)));
        assert!(matches!(ctx.stop(), Err(ReactorError::Closed)));
    }

    #[test]
    fn stop_on_error_forwards_failure() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = StopOnError::new(ReactorContext::new(tx));
        sink.report(EventKind::Delivery, &HandlerError::failed("x"));
        match rx.try_recv().unwrap() {
            Command::Fail { kind, error } => {
                assert_eq!(kind, EventKind::Delivery);
                assert_eq!(error.to_string(), "handler failed: x");
            }
            other => panic!("expected Fail, got {other:?}"),
        }
    }

    #[test]
    fn stop_on_error_after_loop_dropped_is_quiet() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = StopOnError::new(ReactorContext::new(tx));
        drop(rx);
        sink.report(EventKind::TimerTask, &HandlerError::failed("late"));
    }
}
