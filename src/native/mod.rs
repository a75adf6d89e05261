//! Native dispatch core: handle table and callback surface.
//!
//! The core owns every registered handler and hands out opaque
//! [`NativeHandle`]s in exchange. Callers never hold the handler object
//! itself; they dispatch and release through the handle.
//!
//! Ownership chain: core → handler (strong) → whatever the handler
//! captures. Releasing a handle drops the core's reference, after which
//! no callback is made through it.

mod set;
mod table;

use std::fmt;
use std::sync::Arc;

pub use set::HandlerSet;
pub use table::HandleTable;

use crate::handler::Event;

/// Opaque reference to a handler registered with a [`NativeCore`].
///
/// Handles are plain ids: copying one does not extend the lifetime of
/// the handler it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(u64);

impl NativeHandle {
    pub(crate) const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle#{}", self.0)
    }
}

/// Errors from the native core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// The handle table is full; no new handler can be constructed.
    #[error("handle table exhausted ({capacity} handles)")]
    Exhausted { capacity: usize },
    /// The handle was never issued or has already been released.
    #[error("invalid handle {0}")]
    InvalidHandle(NativeHandle),
}

/// A handler the core can call directly.
///
/// `core` is the core performing the dispatch, so composite handlers can
/// forward to other handles.
pub trait NativeHandler: Send + Sync {
    fn handle(&self, core: &dyn NativeCore, event: &Event);
}

/// The registration and dispatch surface of an event-dispatch core.
pub trait NativeCore: Send + Sync {
    /// Take ownership of `handler` and return a fresh handle for it.
    fn construct(&self, handler: Arc<dyn NativeHandler>) -> Result<NativeHandle, CoreError>;

    /// Invoke the handler behind `handle` with `event`.
    fn dispatch(&self, handle: NativeHandle, event: &Event) -> Result<(), CoreError>;

    /// Drop the core's reference to the handler behind `handle`.
    fn release(&self, handle: NativeHandle) -> Result<(), CoreError>;
}
