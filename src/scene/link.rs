//! Link descriptors: the reserved attribute that turns a location into a
//! redirect to a sub-tree of another store.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::interface::{path_to_string, SceneInterface, ScenePath};
use crate::data::Value;
use crate::util::{Chrono, Error, Result};

/// Reserved attribute name holding link descriptors.
pub const LINK_ATTRIBUTE: &str = "sceneInterface:link";

const FILE_NAME_KEY: &str = "fileName";
const ROOT_KEY: &str = "root";
const TIME_KEY: &str = "time";

/// Target of a link: a file, a location inside it, and optionally the time
/// in the target that this sample maps to.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkDescriptor {
    pub file_name: PathBuf,
    pub root: ScenePath,
    pub time: Option<Chrono>,
}

impl LinkDescriptor {
    pub fn new(file_name: impl Into<PathBuf>, root: ScenePath) -> Self {
        Self {
            file_name: file_name.into(),
            root,
            time: None,
        }
    }

    pub fn with_time(mut self, time: Chrono) -> Self {
        self.time = Some(time);
        self
    }

    /// Descriptor pointing at `scene`'s file and path.
    pub fn for_scene(scene: &dyn SceneInterface, time: Option<Chrono>) -> Self {
        Self {
            file_name: scene.file_name().to_path_buf(),
            root: scene.path(),
            time,
        }
    }

    /// Encode as the reserved attribute value.
    pub fn to_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert(
            FILE_NAME_KEY.to_string(),
            Value::String(self.file_name.to_string_lossy().into_owned()),
        );
        map.insert(ROOT_KEY.to_string(), Value::PathVector(self.root.clone()));
        if let Some(time) = self.time {
            map.insert(TIME_KEY.to_string(), Value::Double(time));
        }
        Value::Compound(map)
    }

    /// Decode the reserved attribute value.
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = value
            .as_compound()
            .map_err(|_| Error::invalid_argument(format!("link descriptor must be CompoundData, got {}", value.type_name())))?;

        let file_name = match map.get(FILE_NAME_KEY) {
            Some(Value::String(s)) if !s.is_empty() => PathBuf::from(s),
            _ => return Err(Error::invalid_argument("link descriptor needs a non-empty 'fileName' string")),
        };
        let root = match map.get(ROOT_KEY) {
            Some(Value::PathVector(p)) => p.clone(),
            _ => return Err(Error::invalid_argument("link descriptor needs a 'root' path")),
        };
        let time = match map.get(TIME_KEY) {
            None => None,
            Some(Value::Double(t)) if t.is_finite() => Some(*t),
            Some(_) => return Err(Error::invalid_argument("link descriptor 'time' must be a finite double")),
        };
        if let Some(key) = map.keys().find(|k| ![FILE_NAME_KEY, ROOT_KEY, TIME_KEY].contains(&k.as_str())) {
            return Err(Error::invalid_argument(format!("unexpected link descriptor field '{}'", key)));
        }

        Ok(Self { file_name, root, time })
    }

    /// True when both descriptors point at the same location.
    pub fn same_target(&self, other: &Self) -> bool {
        self.file_name == other.file_name && self.root == other.root
    }
}

/// Build the link attribute value for `scene`, optionally pinned to `time`.
pub fn link_attribute_data(scene: &dyn SceneInterface, time: Option<Chrono>) -> Value {
    LinkDescriptor::for_scene(scene, time).to_value()
}

/// One followed link: resolved file identity plus root path inside it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LinkKey {
    pub file: PathBuf,
    pub root: ScenePath,
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), path_to_string(&self.root))
    }
}

/// The links followed so far on the way to a location.
#[derive(Clone, Debug, Default)]
pub struct LinkChain {
    keys: Arc<Vec<LinkKey>>,
}

impl LinkChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &LinkKey) -> bool {
        self.keys.contains(key)
    }

    /// Chain with `key` appended, failing if `key` was already followed.
    pub fn extended(&self, key: LinkKey) -> Result<Self> {
        if self.contains(&key) {
            let trail: Vec<String> = self.keys.iter().map(|k| k.to_string()).collect();
            return Err(Error::CyclicLink(format!("{} -> {}", trail.join(" -> "), key)));
        }
        let mut keys = (*self.keys).clone();
        keys.push(key);
        Ok(Self { keys: Arc::new(keys) })
    }
}

/// Resolve a descriptor's file name to a stable identity.
pub(crate) fn file_identity(file: &Path) -> PathBuf {
    file.canonicalize().unwrap_or_else(|_| file.to_path_buf())
}
