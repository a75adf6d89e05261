//! Events and the handler capability.
//!
//! An [`EventHandler`] is the application-side object that reacts to
//! events. A [`Handler`] is what callers hand to the resolver: either a
//! plain event handler, or a handle that the native core already knows
//! about.
//!
//! Dispatch is a single match on [`EventKind`]. Kinds without a dedicated
//! callback fall through to [`EventHandler::on_unhandled`].

mod closure;

use std::fmt;
use std::sync::Arc;

pub use closure::FnHandler;

use crate::native::NativeHandle;
use crate::reactor::ReactorContext;

/// The type of an event flowing through the dispatch core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ReactorInit,
    ReactorQuiesced,
    ReactorFinal,
    TimerTask,
    ConnectionInit,
    ConnectionRemoteOpen,
    ConnectionRemoteClose,
    LinkFlow,
    Delivery,
    TransportClosed,
    /// Application-defined event. Always routed to `on_unhandled`.
    Custom(&'static str),
}

impl EventKind {
    /// Snake-case event name, as passed to [`EventHandler::on_unhandled`].
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::ReactorInit => "reactor_init",
            EventKind::ReactorQuiesced => "reactor_quiesced",
            EventKind::ReactorFinal => "reactor_final",
            EventKind::TimerTask => "timer_task",
            EventKind::ConnectionInit => "connection_init",
            EventKind::ConnectionRemoteOpen => "connection_remote_open",
            EventKind::ConnectionRemoteClose => "connection_remote_close",
            EventKind::LinkFlow => "link_flow",
            EventKind::Delivery => "delivery",
            EventKind::TransportClosed => "transport_closed",
            EventKind::Custom(name) => *name,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single event delivered to handlers.
#[derive(Debug, Clone)]
pub struct Event {
    kind: EventKind,
    payload: Option<Vec<u8>>,
    reactor: Option<ReactorContext>,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            payload: None,
            reactor: None,
        }
    }

    /// Attach raw payload bytes (delivery content, custom data).
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Attach the context of the reactor emitting this event.
    pub fn with_reactor(mut self, reactor: ReactorContext) -> Self {
        self.reactor = Some(reactor);
        self
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    /// The emitting reactor, if the event came from one.
    ///
    /// Callbacks use this to schedule follow-up work or stop the loop.
    pub fn reactor(&self) -> Option<&ReactorContext> {
        self.reactor.as_ref()
    }

    /// Deliver this event to `handler` and then to each of its children.
    ///
    /// Calls the callback matching [`Event::kind`], or `on_unhandled`
    /// with the event name when the kind has no dedicated callback.
    /// Children are visited depth-first in the order `handlers()`
    /// returns them. The first error stops the walk.
    pub fn dispatch(&self, handler: &dyn EventHandler) -> Result<(), HandlerError> {
        match self.kind {
            EventKind::ReactorInit => handler.on_reactor_init(self)?,
            EventKind::ReactorQuiesced => handler.on_reactor_quiesced(self)?,
            EventKind::ReactorFinal => handler.on_reactor_final(self)?,
            EventKind::TimerTask => handler.on_timer_task(self)?,
            EventKind::ConnectionInit => handler.on_connection_init(self)?,
            EventKind::ConnectionRemoteOpen => handler.on_connection_remote_open(self)?,
            EventKind::ConnectionRemoteClose => handler.on_connection_remote_close(self)?,
            EventKind::LinkFlow => handler.on_link_flow(self)?,
            EventKind::Delivery => handler.on_delivery(self)?,
            EventKind::TransportClosed => handler.on_transport_closed(self)?,
            EventKind::Custom(name) => handler.on_unhandled(name, self)?,
        }
        for child in handler.handlers() {
            self.dispatch(child.as_ref())?;
        }
        Ok(())
    }
}

/// Failure raised by an event callback.
///
/// `Clone` so that sinks can forward a report without consuming it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HandlerError {
    #[error("handler failed: {0}")]
    Failed(String),
    #[error("handler panicked: {0}")]
    Panicked(String),
    #[error(transparent)]
    Source(Arc<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    pub fn failed(reason: impl Into<String>) -> Self {
        HandlerError::Failed(reason.into())
    }

    /// Wrap any error type raised inside a callback.
    pub fn wrap<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        HandlerError::Source(Arc::new(err))
    }
}

/// Application-side event handler.
///
/// Every callback defaults to [`EventHandler::on_unhandled`], so an
/// implementation only overrides what it cares about. `Send + Sync` is
/// required because the core may call handlers from any thread.
#[allow(unused_variables)]
pub trait EventHandler: Send + Sync {
    fn on_reactor_init(&self, event: &Event) -> Result<(), HandlerError> {
        self.on_unhandled(event.kind().name(), event)
    }

    fn on_reactor_quiesced(&self, event: &Event) -> Result<(), HandlerError> {
        self.on_unhandled(event.kind().name(), event)
    }

    fn on_reactor_final(&self, event: &Event) -> Result<(), HandlerError> {
        self.on_unhandled(event.kind().name(), event)
    }

    fn on_timer_task(&self, event: &Event) -> Result<(), HandlerError> {
        self.on_unhandled(event.kind().name(), event)
    }

    fn on_connection_init(&self, event: &Event) -> Result<(), HandlerError> {
        self.on_unhandled(event.kind().name(), event)
    }

    fn on_connection_remote_open(&self, event: &Event) -> Result<(), HandlerError> {
        self.on_unhandled(event.kind().name(), event)
    }

    fn on_connection_remote_close(&self, event: &Event) -> Result<(), HandlerError> {
        self.on_unhandled(event.kind().name(), event)
    }

    fn on_link_flow(&self, event: &Event) -> Result<(), HandlerError> {
        self.on_unhandled(event.kind().name(), event)
    }

    fn on_delivery(&self, event: &Event) -> Result<(), HandlerError> {
        self.on_unhandled(event.kind().name(), event)
    }

    fn on_transport_closed(&self, event: &Event) -> Result<(), HandlerError> {
        self.on_unhandled(event.kind().name(), event)
    }

    /// Fallback for every event without an overridden callback.
    fn on_unhandled(&self, name: &str, event: &Event) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Child handlers that see each event after this one.
    fn handlers(&self) -> &[Arc<dyn EventHandler>] {
        &[]
    }
}

/// What a caller hands to the resolver.
///
/// `Native` already refers to a handler registered with the core, so it
/// is passed through untouched. `Plain` needs an adaptor.
#[derive(Clone)]
pub enum Handler {
    Native(NativeHandle),
    Plain(Arc<dyn EventHandler>),
}

impl Handler {
    /// Wrap an event handler value.
    pub fn plain<H: EventHandler + 'static>(handler: H) -> Self {
        Handler::Plain(Arc::new(handler))
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Handler::Native(_))
    }
}

impl From<NativeHandle> for Handler {
    fn from(handle: NativeHandle) -> Self {
        Handler::Native(handle)
    }
}

impl From<Arc<dyn EventHandler>> for Handler {
    fn from(handler: Arc<dyn EventHandler>) -> Self {
        Handler::Plain(handler)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Native(handle) => f.debug_tuple("Native").field(handle).finish(),
            Handler::Plain(_) => f.write_str("Plain(..)"),
        }
    }
}
