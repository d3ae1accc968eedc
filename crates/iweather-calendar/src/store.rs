//! In-memory store of resolved events.
//!
//! [`EventStore`] is the single writer and is deliberately not `Clone`;
//! the presentation side holds [`EventReader`] handles.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::Event;

#[derive(Debug, Default)]
struct Inner {
    events: Vec<Event>,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct EventStore {
    inner: Arc<RwLock<Inner>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reader(&self) -> EventReader {
        EventReader {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Publish the result of a resolution pass, replacing the previous one.
    /// Returns the new generation.
    pub fn replace_all(&mut self, events: Vec<Event>) -> u64 {
        let mut inner = self.inner.write();
        inner.events = events;
        inner.generation += 1;
        inner.generation
    }
}

/// Read-only view of an [`EventStore`].
#[derive(Debug, Clone)]
pub struct EventReader {
    inner: Arc<RwLock<Inner>>,
}

impl EventReader {
    pub fn len(&self) -> usize {
        self.inner.read().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Event> {
        self.inner.read().events.get(index).cloned()
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.inner.read().events.clone()
    }

    /// Number of passes published so far; 0 before the first.
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }
}
