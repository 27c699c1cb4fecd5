//! Link overlay store (`.lscc`).
//!
//! A [`LinkedScene`] is a direct store whose locations may carry the
//! [`LINK_ATTRIBUTE`]. Queries above a link read the overlay's own data.
//! At a link, transform and attribute queries stay local while everything
//! else (bounds, object, tags, children) comes from the link target; below
//! a link every query is forwarded to the corresponding target location.
//!
//! Successive link samples at one location form a time remap curve. With a
//! single sample the target's native samples pass through; with `N >= 2`
//! samples every forwarded channel exposes exactly `N` samples at the
//! knots' virtual times.

mod overlay;
mod store_cache;

pub use store_cache::StoreCache;

use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use self::overlay::Overlay;
use super::interface::{walk, Channel, Name, SceneInterface, SceneRef, ScenePath};
use super::link::{LinkChain, LINK_ATTRIBUTE};
use super::remap::RemapCurve;
use crate::core::OpenMode;
use crate::data::Value;
use crate::util::{Chrono, Error, Result};

/// Resolved link target for one location.
#[derive(Clone)]
struct Target {
    node: SceneRef,
    remap: Option<Arc<RemapCurve>>,
}

enum Location {
    /// Above any link: served by the overlay's own store.
    Direct { main: SceneRef },
    /// A link location, resolved on first use.
    Link { main: SceneRef, target: OnceCell<Target> },
    /// Below a link.
    Linked { target: Target },
}

/// Handle to one location of a link overlay store.
pub struct LinkedScene {
    overlay: Arc<Overlay>,
    path: ScenePath,
    /// Links followed to reach this overlay.
    chain: LinkChain,
    location: Location,
}

impl LinkedScene {
    /// Open `path` with a private store cache.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        Self::open_with(path, mode, StoreCache::new())
    }

    /// Open `path`, resolving link targets through `stores`.
    pub fn open_with(path: impl AsRef<Path>, mode: OpenMode, stores: Arc<StoreCache>) -> Result<Self> {
        let overlay = Overlay::open(path.as_ref(), mode, stores)?;
        Ok(Self::root(Arc::new(overlay), LinkChain::new()))
    }

    /// Read-only overlay view of the store `scene` belongs to, positioned at
    /// `scene`'s location.
    pub fn from_scene(scene: SceneRef) -> Result<Self> {
        if scene.mode().is_writable() {
            return Err(Error::invalid_state(format!(
                "{} is open for writing; overlay views need a read-only scene",
                scene.file_name().display()
            )));
        }
        let path = scene.path();
        let overlay = Overlay::over(scene.scene(&[])?, StoreCache::new());
        let mut current = Self::root(Arc::new(overlay), LinkChain::new());
        for segment in &path {
            current = current.child_scene(segment)?;
        }
        Ok(current)
    }

    /// Write pending link bounds and commit a store opened for writing.
    pub fn close(&self) -> Result<()> {
        self.overlay.close()
    }

    fn root(overlay: Arc<Overlay>, chain: LinkChain) -> Self {
        let main = overlay.main().clone();
        Self {
            location: location_for(main),
            overlay,
            path: ScenePath::new(),
            chain,
        }
    }

    fn with_location(&self, path: ScenePath, location: Location) -> Self {
        Self {
            overlay: self.overlay.clone(),
            path,
            chain: self.chain.clone(),
            location,
        }
    }

    fn child_path(&self, name: &str) -> ScenePath {
        let mut path = self.path.clone();
        path.push(name.to_string());
        path
    }

    fn resolve(&self, main: &SceneRef, cell: &OnceCell<Target>) -> Result<Target> {
        cell.get_or_try_init(|| self.overlay.resolve(main, &self.path, &self.chain))
            .cloned()
    }

    /// Target serving forwarded queries, if this location is at or below a link.
    fn target(&self) -> Result<Option<Target>> {
        match &self.location {
            Location::Direct { .. } => Ok(None),
            Location::Link { main, target } => self.resolve(main, target).map(Some),
            Location::Linked { target } => Ok(Some(target.clone())),
        }
    }

    /// Overlay store node when this location is, or has become, a link.
    fn link_main(&self) -> Option<&SceneRef> {
        match &self.location {
            Location::Link { main, .. } => Some(main),
            Location::Direct { main } if main.has_attribute(LINK_ATTRIBUTE) => Some(main),
            _ => None,
        }
    }

    fn child_scene(&self, name: &str) -> Result<Self> {
        let location = match self.target()? {
            None => match &self.location {
                Location::Direct { main } => location_for(main.child(name)?),
                _ => return Err(Error::invalid_state("unresolved link location")),
            },
            Some(target) => Location::Linked {
                target: Target {
                    node: target.node.child(name)?,
                    remap: target.remap,
                },
            },
        };
        Ok(self.with_location(self.child_path(name), location))
    }

    fn require_writable(&self) -> Result<()> {
        if !self.overlay.mode().is_writable() {
            return Err(Error::invalid_state(format!(
                "{} is open read-only",
                self.overlay.file_name().display()
            )));
        }
        if matches!(self.location, Location::Linked { .. }) {
            return Err(Error::invalid_state(format!(
                "{:?} lies below a link and is read-only",
                self.path
            )));
        }
        Ok(())
    }

    fn forwarded_count(target: &Target, ch: Channel<'_>) -> Result<usize> {
        let native = target.node.num_samples(ch)?;
        Ok(match &target.remap {
            Some(curve) if native > 0 => curve.len(),
            Some(_) => 0,
            None => native,
        })
    }

    fn check_index(target: &Target, ch: Channel<'_>, index: usize) -> Result<()> {
        let count = Self::forwarded_count(target, ch)?;
        if index >= count {
            return Err(Error::SampleOutOfBounds { index, count });
        }
        Ok(())
    }

    /// Where a channel query is served from: the overlay store, or a target.
    fn route(&self, ch: Channel<'_>) -> Result<Route> {
        if let Channel::Attribute(LINK_ATTRIBUTE) = ch {
            return Err(Error::not_found(format!("no attribute '{}'", LINK_ATTRIBUTE)));
        }
        match &self.location {
            Location::Direct { main } => Ok(Route::Local(main.clone())),
            Location::Link { main, target } => match ch {
                Channel::Transform | Channel::Attribute(_) => Ok(Route::Local(main.clone())),
                Channel::Bound | Channel::Object => Ok(Route::Forward(self.resolve(main, target)?)),
            },
            Location::Linked { target } => Ok(Route::Forward(target.clone())),
        }
    }
}

enum Route {
    Local(SceneRef),
    Forward(Target),
}

fn location_for(main: SceneRef) -> Location {
    if main.has_attribute(LINK_ATTRIBUTE) {
        Location::Link {
            main,
            target: OnceCell::new(),
        }
    } else {
        Location::Direct { main }
    }
}

fn sorted(mut names: Vec<Name>) -> Vec<Name> {
    names.sort();
    names.dedup();
    names
}

impl SceneInterface for LinkedScene {
    fn file_name(&self) -> &Path {
        self.overlay.file_name()
    }

    fn mode(&self) -> OpenMode {
        self.overlay.mode()
    }

    fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or("")
    }

    fn path(&self) -> ScenePath {
        self.path.clone()
    }

    fn child_names(&self) -> Result<Vec<Name>> {
        match (&self.location, self.target()?) {
            (_, Some(target)) => target.node.child_names(),
            (Location::Direct { main }, None) => main.child_names(),
            _ => Ok(Vec::new()),
        }
    }

    fn has_child(&self, name: &str) -> bool {
        match (&self.location, self.target()) {
            (_, Ok(Some(target))) => target.node.has_child(name),
            (Location::Direct { main }, Ok(None)) => main.has_child(name),
            _ => false,
        }
    }

    fn child(&self, name: &str) -> Result<SceneRef> {
        Ok(Arc::new(self.child_scene(name)?))
    }

    fn create_child(&self, name: &str) -> Result<SceneRef> {
        self.require_writable()?;
        if self.link_main().is_some() {
            return Err(Error::invalid_state(format!(
                "{:?} is a link and cannot have children",
                self.path
            )));
        }
        let Location::Direct { main } = &self.location else {
            return Err(Error::invalid_state(format!("{:?} cannot have children", self.path)));
        };
        let created = main.create_child(name)?;
        Ok(Arc::new(self.with_location(
            self.child_path(name),
            Location::Direct { main: created },
        )))
    }

    fn scene(&self, path: &[Name]) -> Result<SceneRef> {
        walk(Arc::new(Self::root(self.overlay.clone(), self.chain.clone())), path)
    }

    fn num_samples(&self, ch: Channel<'_>) -> Result<usize> {
        match self.route(ch)? {
            Route::Local(main) => main.num_samples(ch),
            Route::Forward(target) => Self::forwarded_count(&target, ch),
        }
    }

    fn sample_time(&self, ch: Channel<'_>, index: usize) -> Result<Chrono> {
        match self.route(ch)? {
            Route::Local(main) => main.sample_time(ch, index),
            Route::Forward(target) => match &target.remap {
                None => target.node.sample_time(ch, index),
                Some(curve) => {
                    Self::check_index(&target, ch, index)?;
                    curve.virtual_time(index)
                }
            },
        }
    }

    fn read_sample(&self, ch: Channel<'_>, index: usize) -> Result<Value> {
        match self.route(ch)? {
            Route::Local(main) => main.read_sample(ch, index),
            Route::Forward(target) => match &target.remap {
                None => target.node.read_sample(ch, index),
                Some(curve) => {
                    Self::check_index(&target, ch, index)?;
                    target.node.read_at_time(ch, curve.target_time(index)?)
                }
            },
        }
    }

    fn read_at_time(&self, ch: Channel<'_>, time: Chrono) -> Result<Value> {
        match self.route(ch)? {
            Route::Local(main) => main.read_at_time(ch, time),
            Route::Forward(target) => {
                let time = target.remap.as_ref().map_or(time, |curve| curve.evaluate(time));
                target.node.read_at_time(ch, time)
            }
        }
    }

    fn write_sample(&self, ch: Channel<'_>, value: &Value, time: Chrono) -> Result<()> {
        self.require_writable()?;
        let (Location::Direct { main } | Location::Link { main, .. }) = &self.location else {
            return Err(Error::invalid_state(format!("{:?} is read-only", self.path)));
        };

        if let Channel::Attribute(LINK_ATTRIBUTE) = ch {
            return self.overlay.add_knot(main, &self.path, value, time);
        }
        if self.link_main().is_some() && matches!(ch, Channel::Bound | Channel::Object) {
            return Err(Error::invalid_state(format!(
                "cannot write {} at link location {:?}",
                ch.label(),
                self.path
            )));
        }
        main.write_sample(ch, value, time)
    }

    fn attribute_names(&self) -> Result<Vec<Name>> {
        match &self.location {
            Location::Direct { main } | Location::Link { main, .. } => Ok(main
                .attribute_names()?
                .into_iter()
                .filter(|n| n != LINK_ATTRIBUTE)
                .collect()),
            Location::Linked { target } => target.node.attribute_names(),
        }
    }

    fn has_attribute(&self, name: &str) -> bool {
        if name == LINK_ATTRIBUTE {
            return false;
        }
        match &self.location {
            Location::Direct { main } | Location::Link { main, .. } => main.has_attribute(name),
            Location::Linked { target } => target.node.has_attribute(name),
        }
    }

    fn has_object(&self) -> bool {
        match (&self.location, self.target()) {
            (_, Ok(Some(target))) => target.node.has_object(),
            (Location::Direct { main }, Ok(None)) => main.has_object(),
            _ => false,
        }
    }

    fn read_tags(&self, include_children: bool) -> Result<Vec<Name>> {
        if let Some(target) = self.target()? {
            return target.node.read_tags(include_children);
        }
        let Location::Direct { main } = &self.location else {
            return Ok(Vec::new());
        };
        let mut tags = main.read_tags(false)?;
        if include_children {
            for name in main.child_names()? {
                tags.extend(self.child_scene(&name)?.read_tags(true)?);
            }
        }
        Ok(sorted(tags))
    }

    fn write_tags(&self, tags: &[&str]) -> Result<()> {
        self.require_writable()?;
        if self.link_main().is_some() {
            return Err(Error::invalid_state(format!(
                "{:?} is a link and cannot hold tags",
                self.path
            )));
        }
        match &self.location {
            Location::Direct { main } => main.write_tags(tags),
            _ => Err(Error::invalid_state(format!("{:?} cannot hold tags", self.path))),
        }
    }

    fn with_link_chain(&self, chain: &LinkChain) -> Option<SceneRef> {
        let view = Self {
            overlay: self.overlay.clone(),
            path: self.path.clone(),
            chain: chain.clone(),
            location: match &self.location {
                Location::Direct { main } => Location::Direct { main: main.clone() },
                Location::Link { main, .. } => Location::Link {
                    main: main.clone(),
                    target: OnceCell::new(),
                },
                Location::Linked { target } => Location::Linked {
                    target: target.clone(),
                },
            },
        };
        Some(Arc::new(view))
    }
}
