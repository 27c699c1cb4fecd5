//! The scene node contract shared by every store.
//!
//! A [`SceneInterface`] is one location in a scene hierarchy. Sampled data
//! lives in *channels* ([`Channel`]); each channel keeps its own ascending
//! sample times. Implementations provide the generic channel core and get
//! the typed bound / transform / attribute / object accessors for free.

use std::path::Path;
use std::sync::Arc;

use super::link::{LinkChain, LinkDescriptor, LINK_ATTRIBUTE};
use crate::core::OpenMode;
use crate::data::{SceneObject, Value};
use crate::util::{Box3d, Chrono, DMat4, Error, Result};

/// Name of a scene location (one path segment).
pub type Name = String;

/// Absolute path of a location, root = empty.
pub type ScenePath = Vec<Name>;

/// Shared handle to a scene location.
pub type SceneRef = Arc<dyn SceneInterface>;

/// A sampled channel of a location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel<'a> {
    Bound,
    Transform,
    Attribute(&'a str),
    Object,
}

impl Channel<'_> {
    pub fn label(&self) -> String {
        match self {
            Self::Bound => "bound".to_string(),
            Self::Transform => "transform".to_string(),
            Self::Attribute(name) => format!("attribute '{}'", name),
            Self::Object => "object".to_string(),
        }
    }
}

/// One location in a scene hierarchy that can be queried or written to.
pub trait SceneInterface: Send + Sync {
    /// File backing this location.
    fn file_name(&self) -> &Path;

    /// Mode the backing store was opened with.
    fn mode(&self) -> OpenMode;

    /// Last path segment; empty at the root.
    fn name(&self) -> &str;

    fn path(&self) -> ScenePath;

    // ------------------------------------------------------------------
    // Hierarchy
    // ------------------------------------------------------------------

    fn child_names(&self) -> Result<Vec<Name>>;

    fn has_child(&self, name: &str) -> bool;

    /// Fails with `NotFound` when there is no such child.
    fn child(&self, name: &str) -> Result<SceneRef>;

    fn create_child(&self, name: &str) -> Result<SceneRef>;

    /// Look up a location by absolute path, from any node of the store.
    fn scene(&self, path: &[Name]) -> Result<SceneRef>;

    // ------------------------------------------------------------------
    // Channel core
    // ------------------------------------------------------------------

    fn num_samples(&self, channel: Channel<'_>) -> Result<usize>;

    fn sample_time(&self, channel: Channel<'_>, index: usize) -> Result<Chrono>;

    /// The stored sample, verbatim.
    fn read_sample(&self, channel: Channel<'_>, index: usize) -> Result<Value>;

    /// Interpolated read at a continuous time.
    fn read_at_time(&self, channel: Channel<'_>, time: Chrono) -> Result<Value>;

    /// Append a sample; `time` must exceed every time already written.
    fn write_sample(&self, channel: Channel<'_>, value: &Value, time: Chrono) -> Result<()>;

    fn attribute_names(&self) -> Result<Vec<Name>>;

    fn has_attribute(&self, name: &str) -> bool;

    fn has_object(&self) -> bool;

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    /// Local tags, or local tags plus every descendant's when
    /// `include_children` is set. Sorted, duplicate-free.
    fn read_tags(&self, include_children: bool) -> Result<Vec<Name>>;

    fn write_tags(&self, tags: &[&str]) -> Result<()>;

    /// View of this location that remembers the links already followed to
    /// reach it. Only stores that resolve links need to override this.
    fn with_link_chain(&self, _chain: &LinkChain) -> Option<SceneRef> {
        None
    }

    // ------------------------------------------------------------------
    // Typed accessors
    // ------------------------------------------------------------------

    fn num_bound_samples(&self) -> Result<usize> {
        self.num_samples(Channel::Bound)
    }

    fn bound_sample_time(&self, index: usize) -> Result<Chrono> {
        self.sample_time(Channel::Bound, index)
    }

    fn read_bound_at_sample(&self, index: usize) -> Result<Box3d> {
        self.read_sample(Channel::Bound, index)?.as_box3d()
    }

    fn read_bound(&self, time: Chrono) -> Result<Box3d> {
        self.read_at_time(Channel::Bound, time)?.as_box3d()
    }

    fn write_bound(&self, bound: &Box3d, time: Chrono) -> Result<()> {
        self.write_sample(Channel::Bound, &Value::Box3d(*bound), time)
    }

    fn num_transform_samples(&self) -> Result<usize> {
        self.num_samples(Channel::Transform)
    }

    fn transform_sample_time(&self, index: usize) -> Result<Chrono> {
        self.sample_time(Channel::Transform, index)
    }

    fn read_transform_at_sample(&self, index: usize) -> Result<DMat4> {
        self.read_sample(Channel::Transform, index)?.as_m44d()
    }

    fn read_transform(&self, time: Chrono) -> Result<DMat4> {
        self.read_at_time(Channel::Transform, time)?.as_m44d()
    }

    fn write_transform(&self, transform: &DMat4, time: Chrono) -> Result<()> {
        self.write_sample(Channel::Transform, &Value::M44d(*transform), time)
    }

    fn num_attribute_samples(&self, name: &str) -> Result<usize> {
        self.num_samples(Channel::Attribute(name))
    }

    fn attribute_sample_time(&self, name: &str, index: usize) -> Result<Chrono> {
        self.sample_time(Channel::Attribute(name), index)
    }

    fn read_attribute_at_sample(&self, name: &str, index: usize) -> Result<Value> {
        self.read_sample(Channel::Attribute(name), index)
    }

    fn read_attribute(&self, name: &str, time: Chrono) -> Result<Value> {
        self.read_at_time(Channel::Attribute(name), time)
    }

    fn write_attribute(&self, name: &str, value: &Value, time: Chrono) -> Result<()> {
        self.write_sample(Channel::Attribute(name), value, time)
    }

    fn num_object_samples(&self) -> Result<usize> {
        self.num_samples(Channel::Object)
    }

    fn object_sample_time(&self, index: usize) -> Result<Chrono> {
        self.sample_time(Channel::Object, index)
    }

    fn read_object_at_sample(&self, index: usize) -> Result<SceneObject> {
        self.read_sample(Channel::Object, index)?.into_object()
    }

    fn read_object(&self, time: Chrono) -> Result<SceneObject> {
        self.read_at_time(Channel::Object, time)?.into_object()
    }

    fn write_object(&self, object: &SceneObject, time: Chrono) -> Result<()> {
        self.write_sample(Channel::Object, &Value::Object(object.clone()), time)
    }

    /// Turn this location into a link to `target` (identity time mapping).
    fn write_link(&self, target: &dyn SceneInterface) -> Result<()> {
        let descriptor = LinkDescriptor::for_scene(target, None);
        self.write_attribute(LINK_ATTRIBUTE, &descriptor.to_value(), 0.0)
    }
}

/// Check a child name before creating it.
pub(crate) fn validate_child_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') {
        return Err(Error::invalid_argument(format!("invalid child name '{}'", name)));
    }
    Ok(())
}

/// Walk `path` down from `root` one child at a time.
pub(crate) fn walk(root: SceneRef, path: &[Name]) -> Result<SceneRef> {
    path.iter().try_fold(root, |node, segment| node.child(segment))
}

/// Render a path the way it appears in messages: `/a/b`, root = `/`.
pub fn path_to_string(path: &[Name]) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.iter().map(|s| format!("/{}", s)).collect()
    }
}
