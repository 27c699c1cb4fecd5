//! Extension-based store factory.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::cache::SceneCache;
use super::interface::SceneRef;
use super::linked::{LinkedScene, StoreCache};
use crate::core::OpenMode;
use crate::util::{Error, Result};

/// Builds a store for a file. Stores that follow links open their targets
/// through the given cache.
pub type Constructor = fn(&Path, OpenMode, &Arc<StoreCache>) -> Result<SceneRef>;

#[derive(Clone, Copy)]
struct Entry {
    modes: OpenMode,
    constructor: Constructor,
}

/// Maps file extensions to store constructors and the modes they support.
#[derive(Clone)]
pub struct SceneRegistry {
    entries: BTreeMap<String, Entry>,
}

impl Default for SceneRegistry {
    /// Registry knowing `scc` and `lscc`, both readable and writable.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("scc", OpenMode::READ | OpenMode::WRITE, open_scene_cache);
        registry.register("lscc", OpenMode::READ | OpenMode::WRITE, open_linked_scene);
        registry
    }
}

impl SceneRegistry {
    /// Registry with no formats.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register (or replace) the constructor for `extension`.
    pub fn register(&mut self, extension: &str, modes: OpenMode, constructor: Constructor) {
        self.entries.insert(
            normalize(extension),
            Entry { modes, constructor },
        );
    }

    /// Extensions whose supported modes overlap `mode`, sorted.
    pub fn supported_extensions(&self, mode: OpenMode) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| e.modes.intersects(mode))
            .map(|(ext, _)| ext.clone())
            .collect()
    }

    /// Open `path` with the store registered for its extension.
    pub fn create(&self, path: impl AsRef<Path>, mode: OpenMode) -> Result<SceneRef> {
        let stores = StoreCache::with_registry(self.clone());
        self.create_with_cache(path, mode, &stores)
    }

    /// Like [`create`](Self::create), sharing an existing store cache.
    pub fn create_with_cache(
        &self,
        path: impl AsRef<Path>,
        mode: OpenMode,
        stores: &Arc<StoreCache>,
    ) -> Result<SceneRef> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize)
            .unwrap_or_default();
        let entry = self.entries.get(&extension).ok_or_else(|| {
            Error::unsupported(format!("no scene format registered for '{}'", path.display()))
        })?;
        if !entry.modes.contains(mode) {
            return Err(Error::unsupported(format!(
                "'{}' files do not support {:?}",
                extension, mode
            )));
        }
        (entry.constructor)(path, mode, stores)
    }
}

fn normalize(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}

fn open_scene_cache(path: &Path, mode: OpenMode, _stores: &Arc<StoreCache>) -> Result<SceneRef> {
    Ok(Arc::new(SceneCache::open(path, mode)?))
}

fn open_linked_scene(path: &Path, mode: OpenMode, stores: &Arc<StoreCache>) -> Result<SceneRef> {
    Ok(Arc::new(LinkedScene::open_with(path, mode, stores.clone())?))
}
