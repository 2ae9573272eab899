//! Event-listener plumbing shared by the resilience crates.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Listener callback invoked for each emitted event.
pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// An ordered collection of event listeners.
///
/// Listeners run in registration order. A panicking listener is isolated so
/// it cannot prevent the remaining listeners from observing the event.
pub struct EventListeners<E> {
    listeners: Vec<Listener<E>>,
}

impl<E> EventListeners<E> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Registers a listener.
    pub fn add<F>(&mut self, listener: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Emits an event to every registered listener.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            let _ = catch_unwind(AssertUnwindSafe(|| listener(event)));
        }
    }

    /// Returns true if no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E> Clone for EventListeners<E> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<E> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}
