//! Fan-out handler: forwards each event to a list of child handles.

use std::sync::{Mutex, PoisonError};

use super::{CoreError, NativeCore, NativeHandle, NativeHandler};
use crate::handler::Event;

/// A native handler that forwards every event to its children, in the
/// order they were added.
///
/// The set only stores handles; children stay owned by the core. A child
/// the core no longer knows is dropped from the set on first sight.
#[derive(Debug, Default)]
pub struct HandlerSet {
    children: Mutex<Vec<NativeHandle>>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a child handle.
    pub fn add(&self, handle: NativeHandle) {
        self.children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    /// Remove every occurrence of `handle`. Returns whether any was found.
    pub fn remove(&self, handle: NativeHandle) -> bool {
        let mut children = self.children.lock().unwrap_or_else(PoisonError::into_inner);
        let before = children.len();
        children.retain(|h| *h != handle);
        children.len() != before
    }

    /// Snapshot of the current children.
    pub fn handles(&self) -> Vec<NativeHandle> {
        self.children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NativeHandler for HandlerSet {
    fn handle(&self, core: &dyn NativeCore, event: &Event) {
        // Snapshot so children can add to or remove from this set.
        for child in self.handles() {
            match core.dispatch(child, event) {
                Ok(()) => {}
                Err(CoreError::InvalidHandle(_)) => {
                    tracing::debug!(%child, "dropping released child handler");
                    self.remove(child);
                }
                Err(e) => tracing::warn!(%child, error = %e, "skipping child handler"),
            }
        }
    }
}
