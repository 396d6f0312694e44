//! Transform program cache keyed by code blob identity.
//!
//! Programs are expensive to extract (a multi-megabyte fetch plus parsing) but
//! stable for the lifetime of a code blob revision, so they are kept in a
//! concurrent map with least-recently-used eviction once the configured
//! capacity is reached.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use vidresolve_common::CodeBlobId;

use crate::program::TransformProgram;

/// A cached program with its last access time.
struct CacheEntry {
    program: Arc<TransformProgram>,
    last_accessed: Instant,
}

/// Concurrent cache of extracted transform programs.
pub struct ProgramCache {
    entries: DashMap<CodeBlobId, CacheEntry>,
    /// Zero means unbounded.
    max_entries: usize,
}

impl ProgramCache {
    /// Create an unbounded cache.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a cache holding at most `max_entries` programs.
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
        }
    }

    /// Look up a program, refreshing its access time.
    pub fn get(&self, id: &CodeBlobId) -> Option<Arc<TransformProgram>> {
        self.entries.get_mut(id).map(|mut entry| {
            entry.last_accessed = Instant::now();
            Arc::clone(&entry.program)
        })
    }

    /// Store a program, evicting least recently used entries if over capacity.
    ///
    /// Eviction runs after the insert, so concurrent inserts settle back to
    /// the capacity once each has finished.
    pub fn insert(&self, id: CodeBlobId, program: TransformProgram) -> Arc<TransformProgram> {
        let program = Arc::new(program);

        self.entries.insert(
            id.clone(),
            CacheEntry {
                program: Arc::clone(&program),
                last_accessed: Instant::now(),
            },
        );

        if self.max_entries > 0 {
            while self.entries.len() > self.max_entries {
                if !self.evict_oldest(&id) {
                    break;
                }
            }
        }
        program
    }

    /// Drop one program. The next lookup for it re-extracts.
    pub fn remove(&self, id: &CodeBlobId) -> Option<Arc<TransformProgram>> {
        self.entries.remove(id).map(|(_, entry)| entry.program)
    }

    pub fn contains(&self, id: &CodeBlobId) -> bool {
        self.entries.contains_key(id)
    }

    /// Evict every program.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Remove the least recently used entry other than `keep`.
    fn evict_oldest(&self, keep: &CodeBlobId) -> bool {
        let oldest = self
            .entries
            .iter()
            .filter(|entry| entry.key() != keep)
            .min_by_key(|entry| entry.value().last_accessed)
            .map(|entry| entry.key().clone());

        match oldest {
            Some(id) => {
                tracing::debug!(code_blob = %id, "evicting transform program");
                self.entries.remove(&id);
                true
            }
            None => false,
        }
    }
}

impl Default for ProgramCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProgramCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramCache")
            .field("len", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Op;

    fn id(s: &str) -> CodeBlobId {
        CodeBlobId::new(s)
    }

    #[test]
    fn test_insert_and_get() {
        let cache = ProgramCache::new();
        assert!(cache.is_empty());

        cache.insert(id("abc"), TransformProgram::new(vec![Op::Reverse]));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&id("abc")));

        let program = cache.get(&id("abc")).unwrap();
        assert_eq!(program.ops(), &[Op::Reverse]);
        assert!(cache.get(&id("other")).is_none());
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = ProgramCache::new();
        cache.insert(id("a"), TransformProgram::default());
        cache.insert(id("b"), TransformProgram::default());

        assert!(cache.remove(&id("a")).is_some());
        assert!(cache.remove(&id("a")).is_none());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = ProgramCache::with_capacity(2);
        cache.insert(id("a"), TransformProgram::new(vec![Op::Reverse]));
        std::thread::sleep(std::time::Duration::from_millis(2));
        cache.insert(id("b"), TransformProgram::new(vec![Op::SwapHead(1)]));
        std::thread::sleep(std::time::Duration::from_millis(2));

        // Touch "a" so "b" becomes the oldest.
        cache.get(&id("a"));
        std::thread::sleep(std::time::Duration::from_millis(2));

        cache.insert(id("c"), TransformProgram::new(vec![Op::DropPrefix(1)]));
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&id("a")));
        assert!(!cache.contains(&id("b")));
        assert!(cache.contains(&id("c")));
    }

    #[test]
    fn test_concurrent_inserts_stay_within_capacity() {
        let cache = Arc::new(ProgramCache::with_capacity(4));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        cache.insert(id(&format!("{t}-{i}")), TransformProgram::default());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 4);
    }

    #[test]
    fn test_reinsert_does_not_evict() {
        let cache = ProgramCache::with_capacity(1);
        cache.insert(id("a"), TransformProgram::new(vec![Op::Reverse]));
        cache.insert(id("a"), TransformProgram::new(vec![Op::DropPrefix(2)]));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&id("a")).unwrap().ops(), &[Op::DropPrefix(2)]);
    }
}
