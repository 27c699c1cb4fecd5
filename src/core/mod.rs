//! Core layer - fundamental types shared by every store.
//!
//! This module provides:
//! - [`OpenMode`] - Read / Write / Append mode flags
//! - [`ReadOptions`] - Read configuration
//! - [`SampleInterval`] - Sample lookup by time

mod mode;
mod options;
mod sampling;

pub use mode::OpenMode;
pub use options::{ReadOptions, MMAP_ENV_VAR};
pub use sampling::{merge_times, SampleInterval};
