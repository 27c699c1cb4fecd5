//! Close-time pass: default transforms and aggregate bounds.
//!
//! Runs once over the arena from the highest id down, so every child is
//! complete before its parent is visited.

use crate::core::merge_times;
use crate::data::Value;
use crate::scene::link::LINK_ATTRIBUTE;
use crate::util::{Box3d, Chrono, DMat4, Error, Result};

use super::node::{NodeArena, NodeData, NodeId, ROOT};

pub(crate) fn finalize(arena: &mut NodeArena) -> Result<()> {
    for id in arena.ids().rev() {
        validate(arena.get(id)?, id)?;

        let node = arena.get_mut(id)?;
        if node.transform.is_empty() {
            node.transform.push(Value::M44d(DMat4::IDENTITY), 0.0)?;
        }

        if !arena.get(id)?.bound.is_empty() {
            continue;
        }
        let samples = aggregate_bounds(arena, id)?;
        let node = arena.get_mut(id)?;
        if samples.is_empty() {
            if id == ROOT {
                node.bound.push(Value::Box3d(Box3d::EMPTY), 0.0)?;
            }
            continue;
        }
        tracing::trace!(node = id, samples = samples.len(), "computed bounds");
        for (time, bound) in samples {
            node.bound.push(Value::Box3d(bound), time)?;
        }
    }
    Ok(())
}

fn validate(node: &NodeData, id: NodeId) -> Result<()> {
    let is_link = node.attributes.contains_key(LINK_ATTRIBUTE);
    if is_link && (!node.children.is_empty() || !node.object.is_empty() || !node.tags.is_empty()) {
        return Err(Error::conflict(format!(
            "node {} '{}' is a link but also holds children, an object or tags",
            id, node.name
        )));
    }
    if !node.object.is_empty() && !node.children.is_empty() {
        return Err(Error::conflict(format!(
            "node {} '{}' holds both an object and children",
            id, node.name
        )));
    }
    Ok(())
}

/// Bound samples of `id` from its object and its children's bounds.
fn aggregate_bounds(arena: &NodeArena, id: NodeId) -> Result<Vec<(Chrono, Box3d)>> {
    let node = arena.get(id)?;
    let children: Vec<&NodeData> = node
        .children
        .iter()
        .map(|&c| arena.get(c))
        .collect::<Result<_>>()?;

    let mut times = node.object.times().to_vec();
    for child in children.iter().filter(|c| !c.bound.is_empty()) {
        merge_times(&mut times, child.bound.times());
    }

    let mut samples = Vec::with_capacity(times.len());
    for time in times {
        let mut bound = Box3d::EMPTY;
        if !node.object.is_empty() {
            let object = node.object.read_at(time)?.into_object()?;
            bound.expand_by_box(&object.bound());
        }
        for child in children.iter().filter(|c| !c.bound.is_empty()) {
            let child_bound = child.bound.read_at(time)?.as_box3d()?;
            if child_bound.is_empty() {
                continue;
            }
            let transform = if child.transform.is_empty() {
                DMat4::IDENTITY
            } else {
                child.transform.read_at(time)?.as_m44d()?
            };
            bound.expand_by_box(&child_bound.transformed(&transform));
        }
        samples.push((time, bound));
    }
    Ok(samples)
}
