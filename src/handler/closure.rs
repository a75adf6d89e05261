//! Closure-backed event handler.

use super::{Event, EventHandler, HandlerError};

/// Wraps a closure as an [`EventHandler`].
///
/// Every event reaches the closure through `on_unhandled`, with the
/// event name as the first argument. Useful for loggers and one-off
/// handlers that don't need a dedicated type.
pub struct FnHandler<F>
where
    F: Fn(&str, &Event) -> Result<(), HandlerError> + Send + Sync,
{
    callback: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&str, &Event) -> Result<(), HandlerError> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&str, &Event) -> Result<(), HandlerError> + Send + Sync,
{
    fn on_unhandled(&self, name: &str, event: &Event) -> Result<(), HandlerError> {
        (self.callback)(name, event)
    }
}
