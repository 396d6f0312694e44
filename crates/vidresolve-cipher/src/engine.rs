//! Program population with request coalescing.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Notify;
use tracing::{debug, warn};
use vidresolve_common::CodeBlobId;

use crate::cache::ProgramCache;
use crate::error::{Error, Result};
use crate::extract::extract_transform_program;
use crate::program::TransformProgram;

/// State shared between the task loading a code blob and its waiters.
#[derive(Default)]
struct LoadSlot {
    notify: Notify,
    /// Set when extraction fails so waiters see the same error.
    failure: OnceLock<Error>,
}

/// Clears the loading entry and wakes waiters even if the loader is dropped.
struct LoadGuard<'a> {
    loading: &'a DashMap<CodeBlobId, Arc<LoadSlot>>,
    id: &'a CodeBlobId,
    slot: Arc<LoadSlot>,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.loading.remove(self.id);
        self.slot.notify.notify_waiters();
    }
}

/// Extracts, caches and applies transform programs.
///
/// Concurrent requests for the same code blob share a single fetch and
/// extraction. Failed extractions are reported to every waiting caller but
/// never cached.
#[derive(Debug, Default)]
pub struct CipherEngine {
    cache: ProgramCache,
    loading: DashMap<CodeBlobId, Arc<LoadSlot>>,
}

impl std::fmt::Debug for LoadSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadSlot")
            .field("failure", &self.failure.get())
            .finish()
    }
}

impl CipherEngine {
    /// Create an engine with an unbounded program cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine around an existing cache.
    pub fn with_cache(cache: ProgramCache) -> Self {
        Self {
            cache,
            loading: DashMap::new(),
        }
    }

    pub fn cache(&self) -> &ProgramCache {
        &self.cache
    }

    /// Extract a program without touching the cache.
    pub fn extract(&self, code: &str) -> Result<TransformProgram> {
        extract_transform_program(code)
    }

    /// Evict every cached program.
    pub fn reset(&self) {
        self.cache.clear();
    }

    /// Get the program for a code blob, fetching and extracting it if needed.
    ///
    /// `fetch` is invoked at most once per call, and only by the caller that
    /// wins the right to populate the cache.
    pub async fn get_or_extract<F, Fut, E>(
        &self,
        id: &CodeBlobId,
        fetch: F,
    ) -> std::result::Result<Arc<TransformProgram>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<String, E>>,
        E: From<Error>,
    {
        if let Some(program) = self.cache.get(id) {
            debug!(code_blob = %id, "transform program cache hit");
            return Ok(program);
        }

        loop {
            match self.loading.entry(id.clone()) {
                Entry::Occupied(e) => {
                    let slot = Arc::clone(e.get());
                    let notified = slot.notify.notified();
                    tokio::pin!(notified);
                    // Register before releasing the entry so the wakeup
                    // cannot be missed.
                    notified.as_mut().enable();
                    drop(e);
                    notified.await;

                    if let Some(program) = self.cache.get(id) {
                        return Ok(program);
                    }
                    if let Some(err) = slot.failure.get() {
                        return Err(err.clone().into());
                    }
                    // Loader's fetch failed or was cancelled. Try loading ourselves.
                }
                Entry::Vacant(e) => {
                    // A loader may have finished between the fast path and here.
                    if let Some(program) = self.cache.get(id) {
                        return Ok(program);
                    }

                    let slot = Arc::new(LoadSlot::default());
                    e.insert(Arc::clone(&slot));
                    let guard = LoadGuard {
                        loading: &self.loading,
                        id,
                        slot,
                    };

                    return self.populate(id, fetch, &guard.slot).await;
                }
            }
        }
    }

    async fn populate<F, Fut, E>(
        &self,
        id: &CodeBlobId,
        fetch: F,
        slot: &LoadSlot,
    ) -> std::result::Result<Arc<TransformProgram>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<String, E>>,
        E: From<Error>,
    {
        debug!(code_blob = %id, "fetching code blob");
        let code = fetch().await?;

        match extract_transform_program(&code) {
            Ok(program) => {
                debug!(code_blob = %id, program = %program, "caching transform program");
                Ok(self.cache.insert(id.clone(), program))
            }
            Err(err) => {
                warn!(code_blob = %id, error = %err, "transform extraction failed");
                let _ = slot.failure.set(err.clone());
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Op;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const PLAYER: &str = r#"var Xy={Ab:function(a){a.reverse()},cd:function(a,b){a.splice(0,b)}};
Gz=function(a){a=a.split("");Xy.Ab(a,0);Xy.cd(a,2);return a.join("")};"#;

    fn counting_fetch<'a>(
        calls: &'a AtomicUsize,
        body: &'static str,
    ) -> impl FnOnce() -> std::pin::Pin<Box<dyn Future<Output = Result<String>> + 'a>> {
        move || {
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(body.to_string())
            })
        }
    }

    #[tokio::test]
    async fn test_get_or_extract_caches() {
        let engine = CipherEngine::new();
        let calls = AtomicUsize::new(0);
        let id = CodeBlobId::new("abc123");

        let first = engine
            .get_or_extract(&id, counting_fetch(&calls, PLAYER))
            .await
            .unwrap();
        let second = engine
            .get_or_extract(&id, counting_fetch(&calls, PLAYER))
            .await
            .unwrap();

        assert_eq!(first.ops(), &[Op::Reverse, Op::DropPrefix(2)]);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let engine = CipherEngine::new();
        let calls = AtomicUsize::new(0);
        let id = CodeBlobId::new("shared");

        let (a, b, c) = tokio::join!(
            engine.get_or_extract(&id, counting_fetch(&calls, PLAYER)),
            engine.get_or_extract(&id, counting_fetch(&calls, PLAYER)),
            engine.get_or_extract(&id, counting_fetch(&calls, PLAYER)),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap().ops(), b.unwrap().ops());
        assert_eq!(c.unwrap().ops(), &[Op::Reverse, Op::DropPrefix(2)]);
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_not_cached() {
        let engine = CipherEngine::new();
        let calls = AtomicUsize::new(0);
        let id = CodeBlobId::new("broken");

        let (a, b) = tokio::join!(
            engine.get_or_extract(&id, counting_fetch(&calls, "var x=1;")),
            engine.get_or_extract(&id, counting_fetch(&calls, "var x=1;")),
        );

        assert_eq!(a.unwrap_err(), Error::PatternNotFound);
        assert_eq!(b.unwrap_err(), Error::PatternNotFound);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(engine.cache().is_empty());

        // A later call tries again.
        let program = engine
            .get_or_extract(&id, counting_fetch(&calls, PLAYER))
            .await
            .unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let engine = CipherEngine::new();
        let id = CodeBlobId::new("offline");

        let result: std::result::Result<_, Error> = engine
            .get_or_extract(&id, || async { Err(Error::PatternNotFound) })
            .await;
        assert!(result.is_err());
        assert!(engine.loading.is_empty());
    }

    #[tokio::test]
    async fn test_reset_evicts() {
        let engine = CipherEngine::new();
        let calls = AtomicUsize::new(0);
        let id = CodeBlobId::new("abc");

        engine
            .get_or_extract(&id, counting_fetch(&calls, PLAYER))
            .await
            .unwrap();
        engine.reset();
        assert!(engine.cache().is_empty());

        engine
            .get_or_extract(&id, counting_fetch(&calls, PLAYER))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
