use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

/// Coordinates already visited by one traversal.
///
/// Cloning shares the underlying set, so concurrent branches of the same
/// traversal see each other's visits.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    visited: Arc<Mutex<HashSet<String>>>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as visited. Returns `false` if it already was.
    pub async fn try_visit(&self, key: &str) -> bool {
        self.visited.lock().await.insert(key.to_string())
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.visited.lock().await.contains(key)
    }

    pub async fn len(&self) -> usize {
        self.visited.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.visited.lock().await.is_empty()
    }
}

/// Cooperative cancellation, checked between coordinate expansions.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
