//! Utility types and functions for the scene cache.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Error`] / [`Result`] - Error handling
//! - [`Box3d`] and math re-exports from glam

mod error;
mod math;

pub use error::*;
pub use math::*;
