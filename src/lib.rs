//! # SceneCache
//!
//! Hierarchical, time-sampled scene description storage.
//!
//! A scene is a tree of named locations. Every location carries sampled
//! channels (bound, transform, named attributes, an optional object) and a
//! set of tags. Two stores implement the [`scene::SceneInterface`]
//! contract:
//!
//! - [`SceneCache`] (`.scc`) writes the hierarchy directly into an indexed
//!   binary container and aggregates bounds bottom-up when it is closed.
//! - [`LinkedScene`] (`.lscc`) composes stores: a location holding a link
//!   forwards its bounds, object, tags and children to a location in
//!   another file, optionally with time remapping.
//!
//! ## Modules
//!
//! - [`util`] - Errors and math types
//! - [`indexed`] - Low-level write-once container format
//! - [`core`] - Open modes, read options, sample lookup
//! - [`data`] - Sample values, objects and their binary codec
//! - [`scene`] - Scene interface and stores
//!
//! ## Example
//!
//! ```no_run
//! use scenecache::prelude::*;
//!
//! let base = SceneCache::open("spheres.scc", OpenMode::READ)?;
//!
//! let layout = LinkedScene::open("layout.lscc", OpenMode::WRITE)?;
//! let instance = layout.create_child("instance0")?;
//! instance.write_link(&base)?;
//! drop(instance);
//! layout.close()?;
//!
//! let layout = LinkedScene::open("layout.lscc", OpenMode::READ)?;
//! for name in layout.child("instance0")?.child_names()? {
//!     println!("{}", name);
//! }
//! # Ok::<(), scenecache::Error>(())
//! ```

pub mod util;
pub mod indexed;
pub mod core;
pub mod data;
pub mod scene;

// Re-export commonly used types
pub use util::{Error, ErrorKind, Result};
pub use scene::{LinkedScene, SceneCache, SceneInterface, SceneRef, SceneRegistry};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Box3d, Chrono, DMat4, DVec3, Error, ErrorKind, Result};
    pub use crate::core::{OpenMode, ReadOptions};
    pub use crate::data::{SceneObject, Value};
    pub use crate::scene::{
        link_attribute_data, Channel, LinkDescriptor, LinkedScene, SceneCache, SceneInterface,
        SceneRef, SceneRegistry, StoreCache, LINK_ATTRIBUTE,
    };
}
