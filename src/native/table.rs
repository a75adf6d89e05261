//! In-process handle table.
//!
//! All methods take `&self`; the table is shared behind an `Arc` between
//! the reactor, the resolver and any thread that dispatches events.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::{CoreError, NativeCore, NativeHandle, NativeHandler};
use crate::handler::Event;

/// Bounded table of registered native handlers.
///
/// Ids come from one process-wide counter and are never reused, so a
/// stale handle, or one issued by another table, never aliases a live
/// handler here. Dispatching either is [`CoreError::InvalidHandle`].
pub struct HandleTable {
    entries: RwLock<HashMap<NativeHandle, Arc<dyn NativeHandler>>>,
    capacity: usize,
}

fn next_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

impl HandleTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `handle` is currently registered.
    pub fn contains(&self, handle: NativeHandle) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&handle)
    }

    /// Release every handle. Returns how many were live.
    pub fn release_all(&self) -> usize {
        // Drain under the lock, drop outside it: a handler's Drop may
        // touch the table.
        let drained: Vec<_> = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.drain().collect()
        };
        let count = drained.len();
        drop(drained);
        if count > 0 {
            tracing::debug!(count, "released all handles");
        }
        count
    }

    fn lookup(&self, handle: NativeHandle) -> Option<Arc<dyn NativeHandler>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle)
            .cloned()
    }
}

impl NativeCore for HandleTable {
    fn construct(&self, handler: Arc<dyn NativeHandler>) -> Result<NativeHandle, CoreError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= self.capacity {
            return Err(CoreError::Exhausted {
                capacity: self.capacity,
            });
        }
        let handle = NativeHandle::from_raw(next_id());
        entries.insert(handle, handler);
        tracing::trace!(%handle, live = entries.len(), "handle constructed");
        Ok(handle)
    }

    fn dispatch(&self, handle: NativeHandle, event: &Event) -> Result<(), CoreError> {
        // Clone out and drop the read guard before calling: the handler
        // may construct or release handles on this same table.
        let handler = self.lookup(handle).ok_or(CoreError::InvalidHandle(handle))?;
        handler.handle(self, event);
        Ok(())
    }

    fn release(&self, handle: NativeHandle) -> Result<(), CoreError> {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle);
        match removed {
            Some(handler) => {
                drop(handler);
                tracing::trace!(%handle, "handle released");
                Ok(())
            }
            None => Err(CoreError::InvalidHandle(handle)),
        }
    }
}

impl std::fmt::Debug for HandleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleTable")
            .field("live", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::EventKind;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Counter {
        events: Mutex<Vec<EventKind>>,
    }

    impl NativeHandler for Counter {
        fn handle(&self, _core: &dyn NativeCore, event: &Event) {
            self.events.lock().unwrap().push(event.kind());
        }
    }

    /// Releases its own handle from inside the callback.
    struct SelfReleasing {
        me: Mutex<Option<NativeHandle>>,
    }

    impl NativeHandler for SelfReleasing {
        fn handle(&self, core: &dyn NativeCore, _event: &Event) {
            if let Some(h) = self.me.lock().unwrap().take() {
                core.release(h).unwrap();
            }
        }
    }

    #[test]
    fn construct_and_dispatch() {
        let table = HandleTable::new(8);
        let counter = Arc::new(Counter::default());
        let h = table.construct(counter.clone()).unwrap();
        table.dispatch(h, &Event::new(EventKind::Delivery)).unwrap();
        assert_eq!(*counter.events.lock().unwrap(), vec![EventKind::Delivery]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn handles_are_unique_and_never_reused() {
        let table = HandleTable::new(8);
        let a = table.construct(Arc::new(Counter::default())).unwrap();
        table.release(a).unwrap();
        let b = table.construct(Arc::new(Counter::default())).unwrap();
        assert_ne!(a, b);
        assert!(!table.contains(a));
        assert!(table.contains(b));
    }

    #[test]
    fn exhausted_at_capacity() {
        let table = HandleTable::new(2);
        table.construct(Arc::new(Counter::default())).unwrap();
        table.construct(Arc::new(Counter::default())).unwrap();
        let err = table.construct(Arc::new(Counter::default())).unwrap_err();
        assert_eq!(err, CoreError::Exhausted { capacity: 2 });
        assert_eq!(err.to_string(), "handle table exhausted (2 handles)");
    }

    #[test]
    fn release_frees_capacity() {
        let table = HandleTable::new(1);
        let h = table.construct(Arc::new(Counter::default())).unwrap();
        table.release(h).unwrap();
        assert!(table.construct(Arc::new(Counter::default())).is_ok());
    }

    #[test]
    fn no_callback_after_release() {
        let table = HandleTable::new(4);
        let counter = Arc::new(Counter::default());
        let h = table.construct(counter.clone()).unwrap();
        table.release(h).unwrap();
        let err = table.dispatch(h, &Event::new(EventKind::Delivery)).unwrap_err();
        assert_eq!(err, CoreError::InvalidHandle(h));
        assert!(counter.events.lock().unwrap().is_empty());
    }

    #[test]
    fn release_drops_core_reference() {
        let table = HandleTable::new(4);
        let counter = Arc::new(Counter::default());
        let h = table.construct(counter.clone()).unwrap();
        assert_eq!(Arc::strong_count(&counter), 2);
        table.release(h).unwrap();
        assert_eq!(Arc::strong_count(&counter), 1);
    }

    #[test]
    fn double_release_is_invalid() {
        let table = HandleTable::new(4);
        let h = table.construct(Arc::new(Counter::default())).unwrap();
        table.release(h).unwrap();
        assert_eq!(table.release(h), Err(CoreError::InvalidHandle(h)));
    }

    #[test]
    fn handler_may_release_itself_during_dispatch() {
        let table = HandleTable::new(4);
        let handler = Arc::new(SelfReleasing {
            me: Mutex::new(None),
        });
        let h = table.construct(handler.clone()).unwrap();
        *handler.me.lock().unwrap() = Some(h);
        table.dispatch(h, &Event::new(EventKind::TimerTask)).unwrap();
        assert!(!table.contains(h));
    }

    #[test]
    fn release_all_empties_table() {
        let table = HandleTable::new(4);
        for _ in 0..3 {
            table.construct(Arc::new(Counter::default())).unwrap();
        }
        assert_eq!(table.release_all(), 3);
        assert!(table.is_empty());
    }

    #[test]
    fn handle_display() {
        let table = HandleTable::new(4);
        let h = table.construct(Arc::new(Counter::default())).unwrap();
        assert_eq!(h.to_string(), format!("handle#{}", h.as_raw()));
        assert_eq!(NativeHandle::from_raw(7).to_string(), "handle#7");
    }

    #[test]
    fn handle_from_another_table_is_invalid() {
        let ours = HandleTable::new(4);
        let theirs = HandleTable::new(4);
        let counter = Arc::new(Counter::default());
        ours.construct(counter.clone()).unwrap();
        let foreign = theirs.construct(Arc::new(Counter::default())).unwrap();

        let err = ours.dispatch(foreign, &Event::new(EventKind::Delivery)).unwrap_err();
        assert_eq!(err, CoreError::InvalidHandle(foreign));
        assert_eq!(ours.release(foreign), Err(CoreError::InvalidHandle(foreign)));
        assert!(counter.events.lock().unwrap().is_empty());
        assert!(theirs.contains(foreign));
    }
}
