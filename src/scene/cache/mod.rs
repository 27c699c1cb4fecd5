//! Direct scene store (`.scc`).
//!
//! A [`SceneCache`] persists a scene hierarchy into one indexed container.
//! In write mode samples accumulate in an in-memory node arena; closing the
//! store (explicitly or by dropping the last handle) fills default
//! transforms, aggregates bounds bottom-up and commits the container. In
//! read mode the arena is loaded once and sample payloads are decoded from
//! the mapped file on demand.
//!
//! # Example
//!
//! ```no_run
//! use scenecache::prelude::*;
//!
//! let scene = SceneCache::open("shot.scc", OpenMode::WRITE)?;
//! let a = scene.create_child("A")?;
//! a.write_object(&SceneObject::sphere(1.0), 0.0)?;
//! scene.close()?;
//!
//! let scene = SceneCache::open("shot.scc", OpenMode::READ)?;
//! let bound = scene.read_bound(0.0)?;
//! # Ok::<(), scenecache::Error>(())
//! ```

mod finalize;
mod layout;
mod node;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use self::node::{NodeArena, NodeId, SampleChannel, ROOT};
use super::interface::{validate_child_name, walk, Channel, Name, SceneInterface, SceneRef, ScenePath};
use super::link::{LinkDescriptor, LINK_ATTRIBUTE};
use crate::core::{OpenMode, ReadOptions};
use crate::data::Value;
use crate::indexed::{IndexedReader, IndexedWriter};
use crate::util::{Chrono, Error, Result};

struct WriteSession {
    arena: NodeArena,
    /// `None` once the container has been committed or a close failed.
    writer: Option<IndexedWriter>,
    /// Reason the close failed; the file stays uncommitted.
    failure: Option<String>,
}

impl WriteSession {
    fn close(&mut self) -> Result<()> {
        if let Some(reason) = &self.failure {
            return Err(Error::invalid_state(format!("scene cache was not committed: {}", reason)));
        }
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        let committed = finalize::finalize(&mut self.arena)
            .and_then(|()| layout::write_arena(&self.arena))
            .and_then(|tree| writer.commit(&tree));
        let path = writer.path().to_path_buf();
        self.writer = None;
        match committed {
            Ok(()) => {
                tracing::debug!(path = %path.display(), nodes = self.arena.len(), "closed scene cache");
                Ok(())
            }
            Err(e) => {
                self.failure = Some(e.to_string());
                Err(e)
            }
        }
    }
}

enum StoreState {
    Reader(NodeArena),
    Writer(Mutex<WriteSession>),
}

/// State shared by every handle of one open file.
struct CacheStore {
    file_name: PathBuf,
    mode: OpenMode,
    state: StoreState,
}

impl Drop for CacheStore {
    fn drop(&mut self) {
        if let StoreState::Writer(session) = &self.state {
            if let Err(e) = session.lock().close() {
                tracing::error!(path = %self.file_name.display(), error = %e, "failed to close scene cache");
            }
        }
    }
}

/// Handle to one location of a direct scene store.
///
/// Handles are cheap to clone and share the underlying store; the store is
/// closed when the last handle drops.
#[derive(Clone)]
pub struct SceneCache {
    store: Arc<CacheStore>,
    node: NodeId,
    path: ScenePath,
}

impl SceneCache {
    /// Open `path`, taking read options from the environment.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        Self::open_with_options(path, mode, &ReadOptions::from_env())
    }

    /// Open `path` with explicit read options.
    ///
    /// `WRITE` creates or truncates the file. `APPEND` is not supported.
    pub fn open_with_options(path: impl AsRef<Path>, mode: OpenMode, options: &ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        if mode.contains(OpenMode::APPEND) {
            return Err(Error::unsupported(format!(
                "append mode is not supported for {}",
                path.display()
            )));
        }

        let state = if mode.contains(OpenMode::WRITE) {
            let writer = IndexedWriter::create(path)?;
            StoreState::Writer(Mutex::new(WriteSession {
                arena: NodeArena::new(),
                writer: Some(writer),
                failure: None,
            }))
        } else if mode.contains(OpenMode::READ) {
            let reader = IndexedReader::open(path, options)?;
            StoreState::Reader(layout::read_arena(&reader)?)
        } else {
            return Err(Error::invalid_argument("open mode must include READ or WRITE"));
        };

        tracing::debug!(path = %path.display(), ?mode, "opened scene cache");
        Ok(Self {
            store: Arc::new(CacheStore {
                file_name: path.to_path_buf(),
                mode,
                state,
            }),
            node: ROOT,
            path: ScenePath::new(),
        })
    }

    /// Finalize and commit a store opened for writing. Later writes fail;
    /// calling it again, or on a read-only store, does nothing.
    pub fn close(&self) -> Result<()> {
        match &self.store.state {
            StoreState::Writer(session) => session.lock().close(),
            StoreState::Reader(_) => Ok(()),
        }
    }

    fn handle(&self, node: NodeId, path: ScenePath) -> SceneRef {
        Arc::new(Self {
            store: self.store.clone(),
            node,
            path,
        })
    }

    fn root_handle(&self) -> SceneRef {
        self.handle(ROOT, ScenePath::new())
    }

    fn child_path(&self, name: &str) -> ScenePath {
        let mut path = self.path.clone();
        path.push(name.to_string());
        path
    }

    /// Run `f` against the arena, locking it in write mode.
    fn with_arena<R>(&self, f: impl FnOnce(&NodeArena) -> Result<R>) -> Result<R> {
        match &self.store.state {
            StoreState::Reader(arena) => f(arena),
            StoreState::Writer(session) => f(&session.lock().arena),
        }
    }

    /// Arena for sampled-value reads, which need a committed store.
    fn committed(&self) -> Result<&NodeArena> {
        match &self.store.state {
            StoreState::Reader(arena) => Ok(arena),
            StoreState::Writer(_) => Err(Error::invalid_state(format!(
                "cannot read sampled values from {} while it is open for writing",
                self.store.file_name.display()
            ))),
        }
    }

    fn session(&self) -> Result<MutexGuard<'_, WriteSession>> {
        match &self.store.state {
            StoreState::Writer(session) => {
                let guard = session.lock();
                if guard.writer.is_none() {
                    return Err(Error::invalid_state(format!(
                        "{} has already been closed",
                        self.store.file_name.display()
                    )));
                }
                Ok(guard)
            }
            StoreState::Reader(_) => Err(Error::invalid_state(format!(
                "{} is open read-only",
                self.store.file_name.display()
            ))),
        }
    }
}

fn channel<'a>(arena: &'a NodeArena, id: NodeId, ch: Channel<'_>) -> Result<&'a SampleChannel> {
    let node = arena.get(id)?;
    match ch {
        Channel::Bound => Ok(&node.bound),
        Channel::Transform => Ok(&node.transform),
        Channel::Object => Ok(&node.object),
        Channel::Attribute(name) => node
            .attributes
            .get(name)
            .ok_or_else(|| Error::not_found(format!("no attribute '{}'", name))),
    }
}

impl SceneInterface for SceneCache {
    fn file_name(&self) -> &Path {
        &self.store.file_name
    }

    fn mode(&self) -> OpenMode {
        self.store.mode
    }

    fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or("")
    }

    fn path(&self) -> ScenePath {
        self.path.clone()
    }

    fn child_names(&self) -> Result<Vec<Name>> {
        self.with_arena(|arena| arena.child_names(self.node))
    }

    fn has_child(&self, name: &str) -> bool {
        self.with_arena(|arena| arena.find_child(self.node, name))
            .map(|c| c.is_some())
            .unwrap_or(false)
    }

    fn child(&self, name: &str) -> Result<SceneRef> {
        let id = self
            .with_arena(|arena| arena.find_child(self.node, name))?
            .ok_or_else(|| Error::not_found(format!("no child '{}' under {:?}", name, self.path)))?;
        Ok(self.handle(id, self.child_path(name)))
    }

    fn create_child(&self, name: &str) -> Result<SceneRef> {
        validate_child_name(name)?;
        let mut session = self.session()?;
        let node = session.arena.get(self.node)?;
        if !node.object.is_empty() {
            return Err(Error::invalid_state(format!("{:?} holds an object and cannot have children", self.path)));
        }
        if node.attributes.contains_key(LINK_ATTRIBUTE) {
            return Err(Error::invalid_state(format!("{:?} is a link and cannot have children", self.path)));
        }
        if session.arena.find_child(self.node, name)?.is_some() {
            return Err(Error::invalid_argument(format!("child '{}' already exists under {:?}", name, self.path)));
        }
        let id = session.arena.add_child(self.node, name)?;
        drop(session);
        Ok(self.handle(id, self.child_path(name)))
    }

    fn scene(&self, path: &[Name]) -> Result<SceneRef> {
        walk(self.root_handle(), path)
    }

    fn num_samples(&self, ch: Channel<'_>) -> Result<usize> {
        if ch == Channel::Bound {
            return channel(self.committed()?, self.node, ch).map(SampleChannel::len);
        }
        self.with_arena(|arena| channel(arena, self.node, ch).map(SampleChannel::len))
    }

    fn sample_time(&self, ch: Channel<'_>, index: usize) -> Result<Chrono> {
        if ch == Channel::Bound {
            return channel(self.committed()?, self.node, ch)?.time(index);
        }
        self.with_arena(|arena| channel(arena, self.node, ch)?.time(index))
    }

    fn read_sample(&self, ch: Channel<'_>, index: usize) -> Result<Value> {
        channel(self.committed()?, self.node, ch)?.read(index)
    }

    fn read_at_time(&self, ch: Channel<'_>, time: Chrono) -> Result<Value> {
        channel(self.committed()?, self.node, ch)?
            .read_at(time)
            .map_err(|e| match e {
                Error::NotFound(_) => Error::not_found(format!("{} of {:?} has no samples", ch.label(), self.path)),
                other => other,
            })
    }

    fn write_sample(&self, ch: Channel<'_>, value: &Value, time: Chrono) -> Result<()> {
        let mut session = self.session()?;
        let node = session.arena.get_mut(self.node)?;
        match ch {
            Channel::Bound => {
                value.as_box3d()?;
                node.bound.push(value.clone(), time)
            }
            Channel::Transform => {
                if self.node == ROOT {
                    return Err(Error::invalid_state("cannot write a transform at the root"));
                }
                value.as_m44d()?;
                node.transform.push(value.clone(), time)
            }
            Channel::Object => {
                if !matches!(value, Value::Object(_)) {
                    return Err(Error::type_mismatch("Object", value.type_name()));
                }
                if !node.children.is_empty() {
                    return Err(Error::invalid_state(format!("{:?} has children and cannot hold an object", self.path)));
                }
                if node.attributes.contains_key(LINK_ATTRIBUTE) {
                    return Err(Error::invalid_state(format!("{:?} is a link and cannot hold an object", self.path)));
                }
                node.object.push(value.clone(), time)
            }
            Channel::Attribute(name) => {
                if name.is_empty() {
                    return Err(Error::invalid_argument("attribute name is empty"));
                }
                if name == LINK_ATTRIBUTE {
                    LinkDescriptor::from_value(value)?;
                    if !node.children.is_empty() || !node.object.is_empty() || !node.tags.is_empty() {
                        return Err(Error::conflict(format!(
                            "{:?} has children, an object or tags and cannot become a link",
                            self.path
                        )));
                    }
                }
                match node.attributes.get_mut(name) {
                    Some(existing) => {
                        if let Some(last) = existing.last_value() {
                            if last.type_name() != value.type_name() {
                                return Err(Error::type_mismatch(last.type_name(), value.type_name()));
                            }
                        }
                        existing.push(value.clone(), time)
                    }
                    None => {
                        let mut created = SampleChannel::default();
                        created.push(value.clone(), time)?;
                        node.attributes.insert(name.to_string(), created);
                        Ok(())
                    }
                }
            }
        }
    }

    fn attribute_names(&self) -> Result<Vec<Name>> {
        self.with_arena(|arena| Ok(arena.get(self.node)?.attributes.keys().cloned().collect()))
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.with_arena(|arena| Ok(arena.get(self.node)?.attributes.contains_key(name)))
            .unwrap_or(false)
    }

    fn has_object(&self) -> bool {
        self.with_arena(|arena| Ok(!arena.get(self.node)?.object.is_empty()))
            .unwrap_or(false)
    }

    fn read_tags(&self, include_children: bool) -> Result<Vec<Name>> {
        self.with_arena(|arena| arena.tags(self.node, include_children))
    }

    fn write_tags(&self, tags: &[&str]) -> Result<()> {
        let mut session = self.session()?;
        let node = session.arena.get_mut(self.node)?;
        if node.attributes.contains_key(LINK_ATTRIBUTE) {
            return Err(Error::invalid_state(format!("{:?} is a link and cannot hold tags", self.path)));
        }
        if let Some(bad) = tags.iter().find(|t| t.is_empty()) {
            return Err(Error::invalid_argument(format!("invalid tag '{}'", bad)));
        }
        node.add_tags(tags.iter().copied());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SceneObject;
    use crate::util::{DMat4, DVec3};
    use tempfile::tempdir;

    #[test]
    fn test_write_constraints() {
        let dir = tempdir().unwrap();
        let scene = SceneCache::open(dir.path().join("c.scc"), OpenMode::WRITE).unwrap();
        let a = scene.create_child("a").unwrap();
        assert!(scene.create_child("a").is_err());
        assert!(scene.create_child("").is_err());
        assert!(scene.write_transform(&DMat4::IDENTITY, 0.0).is_err());

        a.write_object(&SceneObject::sphere(1.0), 0.0).unwrap();
        assert!(a.create_child("x").is_err());
        assert!(a.write_object(&SceneObject::sphere(2.0), 0.0).is_err());

        let b = scene.create_child("b").unwrap();
        b.write_attribute("w", &Value::Double(1.0), 0.0).unwrap();
        let err = b.write_attribute("w", &Value::from("x"), 1.0).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);

        // Sampled reads wait for the commit, structure does not
        assert!(a.read_object_at_sample(0).is_err());
        assert!(scene.num_bound_samples().is_err());
        assert_eq!(a.num_object_samples().unwrap(), 1);
        assert_eq!(scene.child_names().unwrap(), vec!["a", "b"]);

        scene.close().unwrap();
        assert!(scene.create_child("late").is_err());
        scene.close().unwrap();
    }

    #[test]
    fn test_failed_close_is_sticky() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.scc");
        let scene = SceneCache::open(&path, OpenMode::WRITE).unwrap();
        scene.create_child("a").unwrap();

        // A link holding an object only gets past the write checks here
        if let StoreState::Writer(session) = &scene.store.state {
            let mut session = session.lock();
            let node = session.arena.get_mut(1).unwrap();
            node.object.push(Value::Object(SceneObject::sphere(1.0)), 0.0).unwrap();
            let mut link = SampleChannel::default();
            link.push(LinkDescriptor::new("other.scc", vec![]).to_value(), 0.0).unwrap();
            node.attributes.insert(LINK_ATTRIBUTE.to_string(), link);
        }

        assert_eq!(scene.close().unwrap_err().kind(), crate::ErrorKind::Conflict);
        assert_eq!(scene.close().unwrap_err().kind(), crate::ErrorKind::InvalidState);
        assert!(scene.create_child("b").is_err());
        drop(scene);

        let err = SceneCache::open(&path, OpenMode::READ).err().unwrap();
        assert!(matches!(err, Error::NotFrozen(_)));
    }

    #[test]
    fn test_link_attribute_rules() {
        let dir = tempdir().unwrap();
        let scene = SceneCache::open(dir.path().join("l.scc"), OpenMode::WRITE).unwrap();
        let a = scene.create_child("a").unwrap();
        let link = LinkDescriptor::new("other.scc", vec![]).to_value();

        assert!(a.write_attribute(LINK_ATTRIBUTE, &Value::Int(3), 0.0).is_err());
        a.write_attribute(LINK_ATTRIBUTE, &link, 0.0).unwrap();
        assert!(a.create_child("x").is_err());
        assert!(a.write_tags(&["t"]).is_err());

        let tagged = scene.create_child("tagged").unwrap();
        tagged.write_tags(&["t"]).unwrap();
        let err = tagged.write_attribute(LINK_ATTRIBUTE, &link, 0.0).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Conflict);
    }

    #[test]
    fn test_reopen_reads_samples() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("r.scc");
        {
            let scene = SceneCache::open(&path, OpenMode::WRITE).unwrap();
            let a = scene.create_child("a").unwrap();
            a.write_transform(&DMat4::from_translation(DVec3::X), 0.0).unwrap();
            a.write_transform(&DMat4::from_translation(DVec3::X * 3.0), 1.0).unwrap();
            a.write_object(&SceneObject::sphere(0.5), 0.0).unwrap();
        }

        let scene = SceneCache::open(&path, OpenMode::READ).unwrap();
        let a = scene.child("a").unwrap();
        assert_eq!(a.num_transform_samples().unwrap(), 2);
        assert_eq!(a.read_transform(0.5).unwrap().w_axis.x, 2.0);
        assert_eq!(scene.num_transform_samples().unwrap(), 1);
        assert_eq!(scene.read_transform_at_sample(0).unwrap(), DMat4::IDENTITY);
        assert!(a.write_tags(&["x"]).is_err());
    }
}
