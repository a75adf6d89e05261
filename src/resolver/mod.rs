//! Handler resolution: turn a [`Handler`] into a native handle.
//!
//! A native-backed handler already has a handle and passes straight
//! through. A plain handler is wrapped in a fresh [`Adaptor`] and
//! registered with the core. No caching: resolving the same plain
//! handler twice yields two handles, and the caller owns both.
//!
//! The plain handler is shared by `Arc`, so it outlives every adaptor
//! built from it without any caller bookkeeping.

mod adaptor;

use std::sync::Arc;

pub use adaptor::Adaptor;

use crate::handler::Handler;
use crate::native::{CoreError, NativeCore, NativeHandle};
use crate::sink::ErrorSink;

/// Resolve `handler` to a handle registered with `core`.
///
/// - `None` → `Ok(None)`: no handler to register.
/// - `Native(h)` → `Ok(Some(h))`, no allocation.
/// - `Plain(p)` → a new adaptor over `(p, on_error)`, constructed on
///   `core`.
///
/// # Errors
///
/// Returns the core's [`CoreError`] unchanged if it cannot construct the
/// adaptor's handle.
pub fn resolve<C>(
    handler: Option<&Handler>,
    on_error: &Arc<dyn ErrorSink>,
    core: &C,
) -> Result<Option<NativeHandle>, CoreError>
where
    C: NativeCore + ?Sized,
{
    match handler {
        None => Ok(None),
        Some(Handler::Native(handle)) => {
            tracing::trace!(%handle, "handler already native");
            Ok(Some(*handle))
        }
        Some(Handler::Plain(plain)) => {
            let adaptor = Adaptor::new(plain.clone(), on_error.clone());
            let handle = core.construct(Arc::new(adaptor))?;
            tracing::debug!(%handle, "wrapped plain handler in adaptor");
            Ok(Some(handle))
        }
    }
}
