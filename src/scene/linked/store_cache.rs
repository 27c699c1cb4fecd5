//! Shared registry of link target stores.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::core::OpenMode;
use crate::scene::interface::{SceneInterface, SceneRef};
use crate::scene::link::file_identity;
use crate::scene::registry::SceneRegistry;
use crate::util::Result;

/// Opens link targets read-only and shares them between overlay handles.
///
/// Entries are weak: a target stays open while some handle still uses it
/// and is closed when the last one drops.
pub struct StoreCache {
    registry: SceneRegistry,
    open: Mutex<HashMap<PathBuf, Weak<dyn SceneInterface>>>,
}

impl StoreCache {
    /// Cache backed by the default registry.
    pub fn new() -> Arc<Self> {
        Self::with_registry(SceneRegistry::default())
    }

    pub fn with_registry(registry: SceneRegistry) -> Arc<Self> {
        Arc::new(Self {
            registry,
            open: Mutex::new(HashMap::new()),
        })
    }

    /// Root of the store at `file`, opened for reading on first use.
    pub fn open(self: &Arc<Self>, file: &Path) -> Result<SceneRef> {
        let key = file_identity(file);
        if let Some(scene) = self.open.lock().get(&key).and_then(Weak::upgrade) {
            return Ok(scene);
        }

        // Opening may recurse into this cache, so the lock is not held
        let scene = self.registry.create_with_cache(file, OpenMode::READ, self)?;

        let mut open = self.open.lock();
        open.retain(|_, weak| weak.strong_count() > 0);
        if let Some(existing) = open.get(&key).and_then(Weak::upgrade) {
            return Ok(existing);
        }
        tracing::debug!(path = %key.display(), "opened link target");
        open.insert(key, Arc::downgrade(&scene));
        Ok(scene)
    }

    /// Number of target stores currently alive.
    pub fn live_stores(&self) -> usize {
        self.open
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneCache;
    use tempfile::tempdir;

    #[test]
    fn test_targets_are_shared_and_released() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.scc");
        SceneCache::open(&path, OpenMode::WRITE).unwrap().close().unwrap();

        let cache = StoreCache::new();
        let a = cache.open(&path).unwrap();
        let b = cache.open(&path).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.live_stores(), 1);

        drop(a);
        drop(b);
        assert_eq!(cache.live_stores(), 0);
        assert!(cache.open(&dir.path().join("missing.scc")).is_err());
    }
}
