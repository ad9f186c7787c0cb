use std::collections::HashMap;

use parking_lot::Mutex;

use crate::api::{Forest, PostId};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WriteOptions {
    /// Whether the entry should be refreshed from the server in the background
    /// after this write
    pub revalidate: bool,
}

/// Key-addressed store of comment forests, one per post.
///
/// Implementations must make each call atomic: a reader never observes a
/// forest halfway through an optimistic write.
pub trait Cache {
    fn read(&self, key: &PostId) -> Option<Forest>;

    /// Stores data known to be the server's truth
    fn write(&self, key: &PostId, forest: Forest);

    /// Replaces the entry with `mutator(current)`, an absent entry being
    /// seen as an empty forest. Returns the forest that was stored.
    fn write_optimistic(
        &self,
        key: &PostId,
        mutator: &dyn Fn(&Forest) -> Forest,
        opts: WriteOptions,
    ) -> Forest;
}

#[derive(Clone, Debug, Default)]
struct Entry {
    forest: Forest,
    revalidation_pending: bool,
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<PostId, Entry>>,
}

impl MemoryCache {
    pub fn new() -> MemoryCache {
        MemoryCache::default()
    }

    /// Marks the entry as stale, so that it gets refreshed in the background
    pub fn invalidate(&self, key: &PostId) {
        if let Some(e) = self.entries.lock().get_mut(key) {
            e.revalidation_pending = true;
        }
    }

    pub fn needs_revalidation(&self, key: &PostId) -> bool {
        self.entries
            .lock()
            .get(key)
            .map(|e| e.revalidation_pending)
            .unwrap_or(false)
    }

    pub fn stale_keys(&self) -> Vec<PostId> {
        self.entries
            .lock()
            .iter()
            .filter(|(_, e)| e.revalidation_pending)
            .map(|(k, _)| k.clone())
            .collect()
    }
}

impl Cache for MemoryCache {
    fn read(&self, key: &PostId) -> Option<Forest> {
        self.entries.lock().get(key).map(|e| e.forest.clone())
    }

    fn write(&self, key: &PostId, forest: Forest) {
        self.entries.lock().insert(
            key.clone(),
            Entry {
                forest,
                revalidation_pending: false,
            },
        );
    }

    fn write_optimistic(
        &self,
        key: &PostId,
        mutator: &dyn Fn(&Forest) -> Forest,
        opts: WriteOptions,
    ) -> Forest {
        let mut entries = self.entries.lock();
        let entry = entries.entry(key.clone()).or_default();
        entry.forest = mutator(&entry.forest);
        entry.revalidation_pending = opts.revalidate;
        entry.forest.clone()
    }
}
