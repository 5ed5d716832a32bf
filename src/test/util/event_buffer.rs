use std::sync::{Arc, Mutex};

use crate::event::EventHandler;

/// A buffer of events that provides utility methods for querying what a bulk operation emitted.
#[derive(Clone, Debug)]
pub(crate) struct EventBuffer<T> {
    events: Arc<Mutex<Vec<T>>>,
}

impl<T> EventBuffer<T> {
    pub(crate) fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn filter_map<R>(&self, f: impl Fn(&T) -> Option<R>) -> Vec<R> {
        self.events.lock().unwrap().iter().filter_map(f).collect()
    }

    pub(crate) fn push_event(&self, ev: T) {
        self.events.lock().unwrap().push(ev);
    }
}

impl<T: Clone> EventBuffer<T> {
    /// Returns a list of current events.
    pub(crate) fn all(&self) -> Vec<T> {
        self.events.lock().unwrap().clone()
    }
}

impl<T: Clone + Send + Sync + 'static> EventBuffer<T> {
    pub(crate) fn handler(&self) -> EventHandler<T> {
        let this = self.clone();
        EventHandler::callback(move |ev: T| this.push_event(ev))
    }
}
