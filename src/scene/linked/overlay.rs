//! State shared by every handle of one overlay store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{StoreCache, Target};
use crate::core::OpenMode;
use crate::data::Value;
use crate::scene::cache::SceneCache;
use crate::scene::interface::{path_to_string, walk, Channel, SceneRef, ScenePath};
use crate::scene::link::{file_identity, LinkChain, LinkDescriptor, LinkKey, LINK_ATTRIBUTE};
use crate::scene::remap::RemapCurve;
use crate::util::{Chrono, Error, Result};

/// Link samples written at one location during a write pass.
struct PendingLink {
    /// Overlay store node holding the link attribute.
    main: SceneRef,
    target: SceneRef,
    knots: Vec<(Chrono, LinkDescriptor)>,
}

impl PendingLink {
    /// Copy the target's bounds onto the link node: native samples for a
    /// single knot, one sample per knot otherwise.
    fn write_bounds(&self) -> Result<()> {
        let count = self.target.num_bound_samples()?;
        if count == 0 {
            return Ok(());
        }
        if self.knots.len() == 1 {
            for i in 0..count {
                let bound = self.target.read_bound_at_sample(i)?;
                self.main.write_bound(&bound, self.target.bound_sample_time(i)?)?;
            }
        } else {
            for (time, descriptor) in &self.knots {
                let bound = self.target.read_bound(descriptor.time.unwrap_or(*time))?;
                self.main.write_bound(&bound, *time)?;
            }
        }
        Ok(())
    }
}

pub(super) struct Overlay {
    file_name: PathBuf,
    mode: OpenMode,
    /// Root of the store holding the overlay's own data.
    main: SceneRef,
    /// Set when the overlay owns a store opened for writing.
    writer: Option<SceneCache>,
    stores: Arc<StoreCache>,
    pending: Mutex<BTreeMap<ScenePath, PendingLink>>,
}

impl Overlay {
    pub fn open(path: &Path, mode: OpenMode, stores: Arc<StoreCache>) -> Result<Self> {
        if mode.contains(OpenMode::APPEND) {
            return Err(Error::unsupported(format!(
                "append mode is not supported for {}",
                path.display()
            )));
        }
        let cache = SceneCache::open(path, mode)?;
        let main: SceneRef = Arc::new(cache.clone());
        Ok(Self {
            file_name: path.to_path_buf(),
            mode,
            main,
            writer: mode.is_writable().then_some(cache),
            stores,
            pending: Mutex::new(BTreeMap::new()),
        })
    }

    /// Overlay over an already open, read-only store.
    pub fn over(main: SceneRef, stores: Arc<StoreCache>) -> Self {
        Self {
            file_name: main.file_name().to_path_buf(),
            mode: main.mode(),
            main,
            writer: None,
            stores,
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn file_name(&self) -> &Path {
        &self.file_name
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn main(&self) -> &SceneRef {
        &self.main
    }

    /// Link samples stored at `main`, in time order.
    fn knots(&self, main: &SceneRef, path: &ScenePath) -> Result<Vec<(Chrono, LinkDescriptor)>> {
        if self.writer.is_some() {
            return self
                .pending
                .lock()
                .get(path)
                .map(|link| link.knots.clone())
                .ok_or_else(|| Error::not_found(format!("no link at {}", path_to_string(path))));
        }

        let count = main.num_attribute_samples(LINK_ATTRIBUTE)?;
        let mut knots = Vec::with_capacity(count);
        for i in 0..count {
            let time = main.attribute_sample_time(LINK_ATTRIBUTE, i)?;
            let descriptor = LinkDescriptor::from_value(&main.read_attribute_at_sample(LINK_ATTRIBUTE, i)?)?;
            if let Some((_, first)) = knots.first() {
                if !descriptor.same_target(first) {
                    return Err(Error::invalid(format!(
                        "link samples at {} point at different targets",
                        path_to_string(path)
                    )));
                }
            }
            knots.push((time, descriptor));
        }
        Ok(knots)
    }

    /// Resolve the link at `path`, following `chain` for cycle detection.
    pub(super) fn resolve(&self, main: &SceneRef, path: &ScenePath, chain: &LinkChain) -> Result<Target> {
        let knots = self.knots(main, path)?;
        let Some((_, first)) = knots.first() else {
            return Err(Error::not_found(format!("no link at {}", path_to_string(path))));
        };

        let chain = chain.extended(LinkKey {
            file: file_identity(&first.file_name),
            root: first.root.clone(),
        })?;
        let root = self.stores.open(&first.file_name)?;
        let root = root.with_link_chain(&chain).unwrap_or(root);
        let node = walk(root, &first.root)?;

        let remap = if knots.len() > 1 {
            let curve = RemapCurve::new(knots.iter().map(|(t, d)| (*t, d.time.unwrap_or(*t))))?;
            Some(Arc::new(curve))
        } else {
            None
        };

        tracing::debug!(
            at = %path_to_string(path),
            target = %first.file_name.display(),
            root = %path_to_string(&first.root),
            knots = knots.len(),
            "resolved link"
        );
        Ok(Target { node, remap })
    }

    /// Record one link sample written at `path`.
    pub(super) fn add_knot(&self, main: &SceneRef, path: &ScenePath, value: &Value, time: Chrono) -> Result<()> {
        let descriptor = LinkDescriptor::from_value(value)?;
        let mut pending = self.pending.lock();

        if let Some(link) = pending.get_mut(path) {
            if !link.knots.iter().all(|(_, d)| d.same_target(&descriptor)) {
                return Err(Error::invalid_argument(format!(
                    "every link sample at {} must point at the same file and root",
                    path_to_string(path)
                )));
            }
            main.write_sample(Channel::Attribute(LINK_ATTRIBUTE), value, time)?;
            link.knots.push((time, descriptor));
            return Ok(());
        }

        if !main.child_names()?.is_empty() || main.has_object() {
            return Err(Error::conflict(format!(
                "{} has children or an object and cannot become a link",
                path_to_string(path)
            )));
        }
        if !main.read_tags(true)?.is_empty() {
            return Err(Error::conflict(format!(
                "{} has tags and cannot become a link",
                path_to_string(path)
            )));
        }

        let root = self.stores.open(&descriptor.file_name)?;
        let target = walk(root, &descriptor.root)?;
        main.write_sample(Channel::Attribute(LINK_ATTRIBUTE), value, time)?;
        pending.insert(
            path.clone(),
            PendingLink {
                main: main.clone(),
                target,
                knots: vec![(time, descriptor)],
            },
        );
        Ok(())
    }

    /// Write link bounds into the overlay's own store, then commit it.
    pub fn close(&self) -> Result<()> {
        let Some(writer) = &self.writer else {
            return Ok(());
        };
        let pending = std::mem::take(&mut *self.pending.lock());
        for (path, link) in &pending {
            link.write_bounds()?;
            tracing::trace!(at = %path_to_string(path), "wrote link bounds");
        }
        writer.close()
    }
}

impl Drop for Overlay {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!(path = %self.file_name.display(), error = %e, "failed to close linked scene");
        }
    }
}
