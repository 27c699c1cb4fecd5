//! Typed data stored in scene channels.
//!
//! - [`Value`] - attribute / transform / bound samples
//! - [`SceneObject`] - geometric object payloads
//! - [`codec`] - binary encoding used by the on-disk layout

pub mod codec;
mod object;
mod value;

pub use object::SceneObject;
pub use value::Value;
