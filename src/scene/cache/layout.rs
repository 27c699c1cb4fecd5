//! Mapping between the node arena and the indexed container.
//!
//! ```text
//! /header              JSON {"format": "SceneCache", "version": 1}
//! /root                node directory
//!
//! node directory:
//!   bound/             channel (optional)
//!   transform/         channel (optional)
//!   object/            channel (optional)
//!   attributes/<name>/ channel per attribute (optional)
//!   tags               name list (optional)
//!   children/<name>/   node directory per child, in creation order (optional)
//!
//! channel:
//!   times              ascending f64 list
//!   samples/0..n       one encoded value per time
//! ```

use serde_json::json;

use crate::data::codec;
use crate::indexed::{IDirectory, IndexedReader, WDirectory};
use crate::util::{Error, Result};

use super::node::{NodeArena, NodeData, NodeId, SampleChannel, StoredSample, ROOT};

pub(crate) const FORMAT_NAME: &str = "SceneCache";
pub(crate) const FORMAT_VERSION: u64 = 1;

const HEADER: &str = "header";
const ROOT_ENTRY: &str = "root";
const BOUND: &str = "bound";
const TRANSFORM: &str = "transform";
const OBJECT: &str = "object";
const ATTRIBUTES: &str = "attributes";
const TAGS: &str = "tags";
const CHILDREN: &str = "children";
const TIMES: &str = "times";
const SAMPLES: &str = "samples";

// ============================================================================
// Writing
// ============================================================================

/// Build the container tree for a finalized arena.
pub(crate) fn write_arena(arena: &NodeArena) -> Result<WDirectory> {
    let header = json!({ "format": FORMAT_NAME, "version": FORMAT_VERSION });
    let mut top = WDirectory::new();
    top.put_data(HEADER, serde_json::to_vec(&header)?);
    top.put_directory(ROOT_ENTRY, write_node(arena, ROOT)?);
    Ok(top)
}

fn write_node(arena: &NodeArena, id: NodeId) -> Result<WDirectory> {
    let node = arena.get(id)?;
    let mut dir = WDirectory::new();

    for (entry, channel) in [(BOUND, &node.bound), (TRANSFORM, &node.transform), (OBJECT, &node.object)] {
        if !channel.is_empty() {
            dir.put_directory(entry, write_channel(channel)?);
        }
    }

    if !node.attributes.is_empty() {
        let mut attributes = WDirectory::new();
        for (name, channel) in &node.attributes {
            attributes.push_directory(name, write_channel(channel)?);
        }
        dir.push_directory(ATTRIBUTES, attributes);
    }

    if !node.tags.is_empty() {
        dir.put_data(TAGS, codec::encode_names(&node.tags));
    }

    if !node.children.is_empty() {
        let mut children = WDirectory::new();
        for &child in &node.children {
            children.push_directory(&arena.get(child)?.name, write_node(arena, child)?);
        }
        dir.put_directory(CHILDREN, children);
    }

    Ok(dir)
}

fn write_channel(channel: &SampleChannel) -> Result<WDirectory> {
    let mut dir = WDirectory::new();
    dir.push_data(TIMES, codec::encode_times(channel.times()));
    let mut samples = WDirectory::new();
    for (index, value) in channel.samples().enumerate() {
        samples.push_data(&index.to_string(), codec::encode_value(&value?));
    }
    dir.push_directory(SAMPLES, samples);
    Ok(dir)
}

// ============================================================================
// Reading
// ============================================================================

/// Load the node tree of a committed container. Sample payloads stay in
/// the file and are decoded on access.
pub(crate) fn read_arena(reader: &IndexedReader) -> Result<NodeArena> {
    let top = reader.root();
    check_header(&top.data(HEADER)?.read_all()?)?;

    let mut arena = NodeArena::new();
    read_node(&mut arena, ROOT, &top.directory(ROOT_ENTRY)?)?;
    Ok(arena)
}

fn check_header(bytes: &[u8]) -> Result<()> {
    let header: serde_json::Value = serde_json::from_slice(bytes)?;
    if header.get("format").and_then(|f| f.as_str()) != Some(FORMAT_NAME) {
        return Err(Error::invalid(format!("not a {} file: {}", FORMAT_NAME, header)));
    }
    match header.get("version").and_then(|v| v.as_u64()) {
        Some(v) if v <= FORMAT_VERSION => Ok(()),
        Some(v) => Err(Error::invalid(format!("unsupported {} version {}", FORMAT_NAME, v))),
        None => Err(Error::invalid("header has no version")),
    }
}

fn read_node(arena: &mut NodeArena, id: NodeId, dir: &IDirectory) -> Result<()> {
    let node: &mut NodeData = arena.get_mut(id)?;

    if let Some(ch) = dir.optional_directory(BOUND)? {
        node.bound = read_channel(&ch)?;
    }
    if let Some(ch) = dir.optional_directory(TRANSFORM)? {
        node.transform = read_channel(&ch)?;
    }
    if let Some(ch) = dir.optional_directory(OBJECT)? {
        node.object = read_channel(&ch)?;
    }
    if let Some(attributes) = dir.optional_directory(ATTRIBUTES)? {
        for name in attributes.entry_names() {
            node.attributes
                .insert(name.clone(), read_channel(&attributes.directory(name)?)?);
        }
    }
    if dir.has_entry(TAGS) {
        let tags = codec::decode_names(&dir.data(TAGS)?.read_all()?)?;
        node.add_tags(tags.iter().map(String::as_str));
    }

    if let Some(children) = dir.optional_directory(CHILDREN)? {
        for name in children.entry_names() {
            let child = arena.add_child(id, name)?;
            read_node(arena, child, &children.directory(name)?)?;
        }
    }
    Ok(())
}

fn read_channel(dir: &IDirectory) -> Result<SampleChannel> {
    let times = codec::decode_times(&dir.data(TIMES)?.read_all()?)?;
    let samples_dir = dir.directory(SAMPLES)?;
    let samples = (0..times.len())
        .map(|i| samples_dir.data(&i.to_string()).map(StoredSample::Blob))
        .collect::<Result<Vec<_>>>()?;
    SampleChannel::from_stored(times, samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_checks() {
        assert!(check_header(br#"{"format":"SceneCache","version":1}"#).is_ok());
        assert!(check_header(br#"{"format":"Other","version":1}"#).is_err());
        assert!(check_header(br#"{"format":"SceneCache","version":7}"#).is_err());
        assert!(check_header(b"not json").is_err());
    }
}
