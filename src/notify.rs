//! Change notifications for consumers holding derived state.
//!
//! Consumers that cache anything computed from the log (line counts, per-span
//! summaries) register a callback here instead of rescanning on every render.
//! The registry owns its callbacks and dispatch runs inside the store's
//! mutating methods, under the store's mutable borrow, so a callback can never
//! re-enter the store synchronously; a listener that needs to mutate records
//! intent and applies it after the mutating call returns.

use std::fmt;

use crate::types::{ListenerId, SpanId};

/// What a mutation did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    /// Segments were appended.
    Append,
    /// Segments were removed, by a retention trim or explicit span removal.
    Truncate,
}

/// Payload delivered to listeners after each mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogUpdate {
    pub action: UpdateAction,
    /// Distinct span ids touched by the mutation, in the order encountered.
    pub span_ids: Vec<SpanId>,
}

type Callback = Box<dyn FnMut(&LogUpdate)>;

/// Registry of update listeners, invoked in registration order.
pub struct ListenerRegistry {
    listeners: Vec<(ListenerId, Callback)>,
    next_id: u64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        ListenerRegistry {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Registers a callback, returning the handle that removes it.
    pub fn add(&mut self, callback: impl FnMut(&LogUpdate) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(callback)));
        id
    }

    /// Removes a listener; unknown or already-removed handles are a no-op.
    pub fn remove(&mut self, id: ListenerId) {
        self.listeners.retain(|(lid, _)| *lid != id);
    }

    /// Invokes every listener with `update`, in registration order.
    pub fn notify(&mut self, update: &LogUpdate) {
        for (_, callback) in &mut self.listeners {
            callback(update);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
