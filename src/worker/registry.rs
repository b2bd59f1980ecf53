use super::compact_id::CompactId;
use std::collections::HashSet;
use std::sync::Mutex;

/// Set of identifiers being watched.
///
/// Filled once during ingestion and only shrinks afterwards. Every operation
/// takes the internal lock, so a removal coming from a running task is either
/// fully before or fully after a snapshot, never interleaved with it.
#[derive(Debug, Default)]
pub struct Registry {
    ids: Mutex<HashSet<CompactId>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identifier. Returns false if it was already present.
    ///
    /// Only the worker inserts, while it is loading.
    pub(super) fn insert(&self, id: CompactId) -> bool {
        self.ids.lock().unwrap().insert(id)
    }

    /// Copy of the current membership. Later mutations do not affect it.
    pub fn snapshot(&self) -> Vec<CompactId> {
        self.ids.lock().unwrap().iter().copied().collect()
    }

    /// Remove an identifier; absent ids are a no-op.
    ///
    /// Returns true if the identifier was present.
    pub fn remove(&self, id: &CompactId) -> bool {
        self.ids.lock().unwrap().remove(id)
    }

    pub fn contains(&self, id: &CompactId) -> bool {
        self.ids.lock().unwrap().contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
