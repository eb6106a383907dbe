use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Callback registered on a [`LocalEmitter`].
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// In-process publish/subscribe keyed by event name.
///
/// Listeners run synchronously on the emitting thread, in registration order.
/// Clones share the same listener table.
pub struct LocalEmitter<T> {
    listeners: Arc<Mutex<HashMap<String, Vec<Listener<T>>>>>,
}

impl<T> LocalEmitter<T> {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn on(&self, event: impl Into<String>, listener: impl Fn(&T) + Send + Sync + 'static) {
        self.lock()
            .entry(event.into())
            .or_default()
            .push(Arc::new(listener));
    }

    /// Calls every listener of `event` with `payload`. Returns whether there
    /// were any.
    pub fn emit(&self, event: &str, payload: &T) -> bool {
        let listeners = self.lock().get(event).cloned().unwrap_or_default();
        for listener in &listeners {
            listener(payload);
        }
        !listeners.is_empty()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.lock().get(event).map_or(0, Vec::len)
    }

    pub fn remove_all_listeners(&self, event: &str) {
        self.lock().remove(event);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Listener<T>>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Clone for LocalEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<T> Default for LocalEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for LocalEmitter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let events: Vec<String> = self.lock().keys().cloned().collect();
        f.debug_struct("LocalEmitter").field("events", &events).finish()
    }
}
