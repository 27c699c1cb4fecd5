//! Scene layer - the node contract and the stores implementing it.
//!
//! - [`SceneInterface`] - path-addressed, time-sampled scene locations
//! - [`SceneCache`] - direct store (`.scc`)
//! - [`LinkedScene`] - link overlay store (`.lscc`)
//! - [`SceneRegistry`] - extension based factory
//! - [`LinkDescriptor`] / [`RemapCurve`] - link targets and time remapping

mod cache;
mod interface;
mod link;
mod linked;
mod registry;
mod remap;

pub use cache::SceneCache;
pub use interface::{path_to_string, Channel, Name, SceneInterface, SceneRef, ScenePath};
pub use link::{link_attribute_data, LinkChain, LinkDescriptor, LinkKey, LINK_ATTRIBUTE};
pub use linked::{LinkedScene, StoreCache};
pub use registry::{Constructor, SceneRegistry};
pub use remap::RemapCurve;
