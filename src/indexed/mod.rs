//! Hierarchical indexed container.
//!
//! A write-once binary file of groups and data blocks. Every group written
//! by this crate is a *directory*: its first child is a name table and the
//! remaining children are the named entries, either nested directories or
//! opaque data blobs.
//!
//! ## File Structure
//!
//! ```text
//! +------------------+
//! | Magic: "SCidx"   |  5 bytes
//! +------------------+
//! | Frozen flag      |  1 byte (0x00 or 0xFF)
//! +------------------+
//! | Version          |  2 bytes (u16 LE)
//! +------------------+
//! | Root Group Pos   |  8 bytes (u64 LE)
//! +------------------+
//! | ... Data ...     |
//! +------------------+
//! ```
//!
//! There is no append mode: a file is written once by [`IndexedWriter`] and
//! is immutable afterwards.

mod format;
mod reader;
mod writer;

pub use format::*;
pub use reader::*;
pub use writer::*;
