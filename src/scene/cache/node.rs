//! In-memory node arena shared by the read and write paths.

use std::collections::{BTreeMap, HashMap};

use smallvec::SmallVec;

use crate::core::SampleInterval;
use crate::data::{codec, Value};
use crate::indexed::IData;
use crate::scene::interface::Name;
use crate::util::{Chrono, Error, Result};

/// Index of a node in its arena. Children always have larger ids than
/// their parent.
pub(crate) type NodeId = usize;

pub(crate) const ROOT: NodeId = 0;

/// A sample either held in memory (write path) or still encoded in the
/// container (read path).
#[derive(Clone)]
pub(crate) enum StoredSample {
    Value(Value),
    Blob(IData),
}

impl StoredSample {
    fn decode(&self) -> Result<Value> {
        match self {
            Self::Value(v) => Ok(v.clone()),
            Self::Blob(data) => codec::decode_value(&data.read_all()?),
        }
    }
}

/// Samples of one channel at ascending times.
#[derive(Clone, Default)]
pub(crate) struct SampleChannel {
    times: Vec<Chrono>,
    samples: Vec<StoredSample>,
}

impl SampleChannel {
    pub fn from_stored(times: Vec<Chrono>, samples: Vec<StoredSample>) -> Result<Self> {
        if times.len() != samples.len() {
            return Err(Error::invalid(format!(
                "channel has {} times but {} samples",
                times.len(),
                samples.len()
            )));
        }
        Ok(Self { times, samples })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[Chrono] {
        &self.times
    }

    pub fn time(&self, index: usize) -> Result<Chrono> {
        self.times.get(index).copied().ok_or(Error::SampleOutOfBounds {
            index,
            count: self.len(),
        })
    }

    pub fn last_value(&self) -> Option<&Value> {
        match self.samples.last() {
            Some(StoredSample::Value(v)) => Some(v),
            _ => None,
        }
    }

    /// Append a sample; `time` must exceed the last stored time.
    pub fn push(&mut self, value: Value, time: Chrono) -> Result<()> {
        if !time.is_finite() {
            return Err(Error::invalid_argument(format!("sample time {} is not finite", time)));
        }
        if let Some(&last) = self.times.last() {
            if time <= last {
                return Err(Error::invalid_argument(format!(
                    "sample time {} must be greater than previous time {}",
                    time, last
                )));
            }
        }
        self.times.push(time);
        self.samples.push(StoredSample::Value(value));
        Ok(())
    }

    pub fn read(&self, index: usize) -> Result<Value> {
        self.samples
            .get(index)
            .ok_or(Error::SampleOutOfBounds {
                index,
                count: self.len(),
            })?
            .decode()
    }

    /// Interpolated value at `time`, clamped to the sampled range.
    pub fn read_at(&self, time: Chrono) -> Result<Value> {
        let interval = SampleInterval::find(&self.times, time)?;
        if interval.is_exact() {
            return self.read(interval.floor_index);
        }
        let a = self.read(interval.floor_index)?;
        let b = self.read(interval.ceil_index)?;
        Ok(Value::interpolate(&a, &b, interval.alpha))
    }

    pub(crate) fn samples(&self) -> impl Iterator<Item = Result<Value>> + '_ {
        self.samples.iter().map(StoredSample::decode)
    }
}

/// One scene location.
#[derive(Clone, Default)]
pub(crate) struct NodeData {
    pub name: Name,
    pub children: SmallVec<[NodeId; 4]>,
    /// `children` by name.
    child_index: HashMap<Name, NodeId>,
    pub bound: SampleChannel,
    pub transform: SampleChannel,
    pub object: SampleChannel,
    pub attributes: BTreeMap<Name, SampleChannel>,
    /// Sorted, duplicate-free.
    pub tags: Vec<Name>,
}

impl NodeData {
    pub fn named(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_tags<'a>(&mut self, tags: impl IntoIterator<Item = &'a str>) {
        self.tags.extend(tags.into_iter().map(str::to_string));
        self.tags.sort();
        self.tags.dedup();
    }
}

/// Flat storage for a store's nodes, root at [`ROOT`].
#[derive(Clone)]
pub(crate) struct NodeArena {
    nodes: Vec<NodeData>,
}

impl Default for NodeArena {
    fn default() -> Self {
        Self {
            nodes: vec![NodeData::named("")],
        }
    }
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Result<&NodeData> {
        self.nodes.get(id).ok_or(Error::ChildOutOfBounds {
            index: id,
            count: self.nodes.len(),
        })
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        let count = self.nodes.len();
        self.nodes
            .get_mut(id)
            .ok_or(Error::ChildOutOfBounds { index: id, count })
    }

    pub fn find_child(&self, id: NodeId, name: &str) -> Result<Option<NodeId>> {
        Ok(self.get(id)?.child_index.get(name).copied())
    }

    pub fn child_names(&self, id: NodeId) -> Result<Vec<Name>> {
        let node = self.get(id)?;
        Ok(node.children.iter().map(|&c| self.nodes[c].name.clone()).collect())
    }

    /// Append a child node and return its id.
    pub fn add_child(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        self.get(parent)?;
        let id = self.nodes.len();
        self.nodes.push(NodeData::named(name));
        let parent = &mut self.nodes[parent];
        parent.children.push(id);
        parent.child_index.insert(name.to_string(), id);
        Ok(id)
    }

    /// Local tags of `id`, plus every descendant's when `include_children`.
    pub fn tags(&self, id: NodeId, include_children: bool) -> Result<Vec<Name>> {
        let mut tags = self.get(id)?.tags.clone();
        if include_children {
            let mut stack: Vec<NodeId> = self.nodes[id].children.to_vec();
            while let Some(next) = stack.pop() {
                let node = &self.nodes[next];
                tags.extend(node.tags.iter().cloned());
                stack.extend(node.children.iter().copied());
            }
            tags.sort();
            tags.dedup();
        }
        Ok(tags)
    }

    pub fn ids(&self) -> std::ops::Range<NodeId> {
        0..self.nodes.len()
    }
}
