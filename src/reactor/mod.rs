//! Reactor: a single-owner event loop over the native handle table.
//!
//! The loop owns the timer queue and the default handler. Callbacks reach
//! it only through [`ReactorContext`], which queues commands on a channel
//! the loop drains after every event. Handlers are resolved on the way in,
//! so the loop itself only ever deals in native handles.
//!
//! Every event goes first to its own handler (a task's handler, or the
//! default one) and then to the global handler, which sees everything.

mod config;
mod context;
mod timer;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

pub use config::{ErrorPolicy, ReactorConfig};
pub use context::{ReactorContext, Task};

use context::{Command, StopOnError};
use timer::{TimerEntry, TimerQueue};

use crate::handler::{Event, EventKind, Handler, HandlerError};
use crate::native::{CoreError, HandleTable, HandlerSet, NativeCore, NativeHandle};
use crate::resolver::resolve;
use crate::sink::{ErrorSink, TracingSink};

/// Reactor errors.
#[derive(Debug, thiserror::Error)]
pub enum ReactorError {
    #[error("native core: {0}")]
    Core(#[from] CoreError),
    #[error("{kind} handler failed: {source}")]
    Handler {
        kind: EventKind,
        source: HandlerError,
    },
    #[error("reactor is closed")]
    Closed,
}

pub struct Reactor {
    core: Arc<HandleTable>,
    on_error: Arc<dyn ErrorSink>,
    handler: Option<NativeHandle>,
    /// Whether `handler` was built from a plain handler by this reactor.
    handler_owned: bool,
    global: Arc<HandlerSet>,
    global_handle: NativeHandle,
    timers: TimerQueue,
    ctx: ReactorContext,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    stopping: bool,
}

impl Reactor {
    /// Create a reactor with no default handler.
    ///
    /// # Errors
    ///
    /// Fails if `max_handles` leaves no room for the global handler.
    pub fn new(config: ReactorConfig) -> Result<Self, ReactorError> {
        let core = Arc::new(HandleTable::new(config.max_handles));
        let (tx, cmd_rx) = mpsc::unbounded_channel();
        let ctx = ReactorContext::new(tx);
        let on_error: Arc<dyn ErrorSink> = match config.on_error {
            ErrorPolicy::Stop => Arc::new(StopOnError::new(ctx.clone())),
            ErrorPolicy::Log => Arc::new(TracingSink),
        };
        let global = Arc::new(HandlerSet::new());
        let global_handle = core.construct(global.clone())?;

        Ok(Self {
            core,
            on_error,
            handler: None,
            handler_owned: false,
            global,
            global_handle,
            timers: TimerQueue::new(),
            ctx,
            cmd_rx,
            stopping: false,
        })
    }

    /// Create a reactor and install `handler` as its default handler.
    pub fn with_handler(handler: Handler, config: ReactorConfig) -> Result<Self, ReactorError> {
        let mut reactor = Self::new(config)?;
        reactor.set_handler(Some(handler))?;
        Ok(reactor)
    }

    /// The handle table backing this reactor.
    ///
    /// Native handlers meant for this reactor must be constructed here.
    pub fn core(&self) -> &Arc<HandleTable> {
        &self.core
    }

    /// The sink adaptors built by this reactor report to.
    pub fn error_sink(&self) -> &Arc<dyn ErrorSink> {
        &self.on_error
    }

    pub fn context(&self) -> ReactorContext {
        self.ctx.clone()
    }

    /// Handle of the current default handler.
    pub fn handler(&self) -> Option<NativeHandle> {
        self.handler
    }

    /// The global handler's children.
    pub fn global_handler(&self) -> &HandlerSet {
        &self.global
    }

    /// Replace the default handler.
    ///
    /// A previous default that this reactor built from a plain handler is
    /// released here. A native one stays registered until [`run`] returns,
    /// when every handle in the table is released, native ones included.
    ///
    /// [`run`]: Reactor::run
    pub fn set_handler(&mut self, handler: Option<Handler>) -> Result<(), ReactorError> {
        let resolved = resolve(handler.as_ref(), &self.on_error, &*self.core)?;
        let owned = matches!(handler, Some(Handler::Plain(_)));
        let previous = std::mem::replace(&mut self.handler, resolved);
        let previous_owned = std::mem::replace(&mut self.handler_owned, owned);
        if let (Some(h), true) = (previous, previous_owned) {
            self.release(h);
        }
        Ok(())
    }

    /// Add a handler that sees every event after the event's own handler.
    pub fn add_global(&mut self, handler: Handler) -> Result<(), ReactorError> {
        if let Some(h) = resolve(Some(&handler), &self.on_error, &*self.core)? {
            self.global.add(h);
        }
        Ok(())
    }

    /// Schedule a `timer_task` event. See [`ReactorContext::schedule`].
    pub fn schedule(
        &self,
        delay: Duration,
        handler: Option<Handler>,
    ) -> Result<Task, ReactorError> {
        self.ctx.schedule(delay, handler)
    }

    /// Run until no timers remain or a callback calls `stop`.
    ///
    /// Emits `reactor_init` first and `reactor_final` last. Every handle
    /// in the table is released on return, whatever the outcome. That
    /// includes native handlers installed with [`set_handler`].
    ///
    /// [`set_handler`]: Reactor::set_handler
    ///
    /// # Errors
    ///
    /// Under [`ErrorPolicy::Stop`], the first callback error ends the run
    /// and is returned as [`ReactorError::Handler`]. Handle exhaustion
    /// while resolving a task's handler returns [`ReactorError::Core`].
    pub async fn run(mut self) -> Result<(), ReactorError> {
        tracing::debug!(max_handles = self.core.capacity(), "reactor starting");
        let result = self.run_loop().await;
        let released = self.core.release_all();
        match &result {
            Ok(()) => tracing::debug!(released, "reactor stopped"),
            Err(e) => tracing::debug!(released, error = %e, "reactor aborted"),
        }
        result
    }

    async fn run_loop(&mut self) -> Result<(), ReactorError> {
        self.emit(EventKind::ReactorInit, None)?;

        loop {
            self.drain()?;
            if self.stopping {
                break;
            }

            let mut discarded = Vec::new();
            let next = self.timers.next_deadline(&mut discarded);
            self.release_entries(discarded);
            let Some(deadline) = next else { break };

            if deadline > Instant::now() {
                self.emit(EventKind::ReactorQuiesced, None)?;
                if self.stopping {
                    break;
                }
                let woken = tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => None,
                    cmd = self.cmd_rx.recv() => cmd,
                };
                if let Some(cmd) = woken {
                    // New work may be due sooner; re-evaluate.
                    self.apply(cmd)?;
                    continue;
                }
            }

            let mut discarded = Vec::new();
            let due = self.timers.pop_due(Instant::now(), &mut discarded);
            self.release_entries(discarded);
            for entry in due {
                // An earlier task in this batch may have cancelled it.
                if !entry.task.is_cancelled() && !self.stopping {
                    tracing::trace!(task = entry.task.id(), "timer fired");
                    self.emit(EventKind::TimerTask, entry.handler)?;
                }
                self.release_entry(entry);
            }
        }

        self.emit(EventKind::ReactorFinal, None)
    }

    /// Dispatch `kind` to `target` (or the default handler), then to the
    /// global handler, then apply whatever the callbacks queued.
    fn emit(&mut self, kind: EventKind, target: Option<NativeHandle>) -> Result<(), ReactorError> {
        let event = Event::new(kind).with_reactor(self.ctx.clone());
        if let Some(handle) = target.or(self.handler) {
            if let Err(e) = self.core.dispatch(handle, &event) {
                tracing::warn!(%handle, event = %kind, error = %e, "dispatch failed");
            }
        }
        if let Err(e) = self.core.dispatch(self.global_handle, &event) {
            tracing::warn!(event = %kind, error = %e, "global dispatch failed");
        }
        self.drain()
    }

    fn drain(&mut self) -> Result<(), ReactorError> {
        while let Ok(cmd) = self.cmd_rx.try_recv() {
            self.apply(cmd)?;
        }
        Ok(())
    }

    fn apply(&mut self, cmd: Command) -> Result<(), ReactorError> {
        match cmd {
            Command::Schedule {
                deadline,
                task,
                handler,
            } => {
                let owned = matches!(handler, Some(Handler::Plain(_)));
                let handle = resolve(handler.as_ref(), &self.on_error, &*self.core)?;
                let pending = self.timers.len() + 1;
                tracing::trace!(task = task.id(), pending, "task scheduled");
                self.timers.push(TimerEntry {
                    deadline,
                    task,
                    handler: handle,
                    owned,
                });
            }
            Command::Stop => {
                tracing::debug!("stop requested");
                self.stopping = true;
            }
            Command::Fail { kind, error } => {
                return Err(ReactorError::Handler {
                    kind,
                    source: error,
                });
            }
        }
        Ok(())
    }

    fn release_entries(&self, entries: Vec<TimerEntry>) {
        for entry in entries {
            self.release_entry(entry);
        }
    }

    fn release_entry(&self, entry: TimerEntry) {
        if let (Some(h), true) = (entry.handler, entry.owned) {
            self.release(h);
        }
    }

    fn release(&self, handle: NativeHandle) {
        if let Err(e) = self.core.release(handle) {
            tracing::warn!(%handle, error = %e, "release failed");
        }
    }
}

impl std::fmt::Debug for Reactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reactor")
            .field("core", &self.core)
            .field("handler", &self.handler)
            .field("global", &self.global.len())
            .field("pending_timers", &self.timers.len())
            .finish()
    }
}
