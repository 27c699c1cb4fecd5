//! Container reader: memory-mapped or buffered access to groups and data.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use parking_lot::Mutex;

use super::format::*;
use crate::core::ReadOptions;
use crate::data::codec;
use crate::util::{Error, Result};

/// Input streams for reading container data.
/// Supports both memory-mapped and buffered I/O modes.
pub struct IStreams {
    inner: StreamsInner,
    version: u16,
    frozen: bool,
    size: u64,
}

enum StreamsInner {
    /// Memory-mapped file (preferred for large files)
    Mmap(Mmap),
    /// Buffered file access (fallback)
    File(Mutex<File>),
}

impl IStreams {
    /// Open a file with the given read options.
    pub fn open(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let size = file.metadata()?.len();
        if size < HEADER_SIZE as u64 {
            return Err(Error::UnexpectedEof(size));
        }

        let inner = if options.use_mmap {
            // Safety: the file is opened read-only and committed files are never rewritten in place
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            StreamsInner::Mmap(mmap)
        } else {
            StreamsInner::File(Mutex::new(file))
        };

        let (version, frozen) = match &inner {
            StreamsInner::Mmap(mmap) => Self::parse_header(mmap)?,
            StreamsInner::File(file) => {
                let mut f = file.lock();
                let mut header = [0u8; HEADER_SIZE];
                f.seek(SeekFrom::Start(0))?;
                f.read_exact(&mut header)?;
                Self::parse_header(&header)?
            }
        };

        Ok(Self { inner, version, frozen, size })
    }

    /// Parse and validate the container header.
    fn parse_header(data: &[u8]) -> Result<(u16, bool)> {
        if data.len() < HEADER_SIZE {
            return Err(Error::UnexpectedEof(data.len() as u64));
        }
        if &data[0..5] != CONTAINER_MAGIC {
            return Err(Error::InvalidMagic);
        }

        let frozen = data[FROZEN_OFFSET] == FROZEN_FLAG;
        let version = u16::from_le_bytes([data[VERSION_OFFSET], data[VERSION_OFFSET + 1]]);
        Ok((version, frozen))
    }

    /// Check if the file was committed by its writer.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Get the format version.
    #[inline]
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Get the total file size.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Get the root group position from the header.
    pub fn root_pos(&self) -> Result<u64> {
        self.read_u64(ROOT_POS_OFFSET as u64)
    }

    /// Read bytes at a specific position.
    pub fn read_bytes(&self, pos: u64, len: usize) -> Result<Vec<u8>> {
        self.check_range(pos, len as u64)?;
        let mut buf = vec![0u8; len];
        self.read_into(pos, &mut buf)?;
        Ok(buf)
    }

    /// Read bytes into an existing buffer.
    pub fn read_into(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        let end = self.check_range(pos, buf.len() as u64)?;

        match &self.inner {
            StreamsInner::Mmap(mmap) => {
                buf.copy_from_slice(&mmap[pos as usize..end as usize]);
                Ok(())
            }
            StreamsInner::File(file) => {
                let mut f = file.lock();
                f.seek(SeekFrom::Start(pos))?;
                f.read_exact(buf)?;
                Ok(())
            }
        }
    }

    /// End of `len` bytes at `pos`, if they lie inside the file.
    fn check_range(&self, pos: u64, len: u64) -> Result<u64> {
        let end = pos.checked_add(len).ok_or(Error::UnexpectedEof(u64::MAX))?;
        if end > self.size {
            return Err(Error::UnexpectedEof(end));
        }
        Ok(end)
    }

    /// Read a u64 value at the given position.
    pub fn read_u64(&self, pos: u64) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_into(pos, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
}

/// A group in the container hierarchy.
/// Groups contain children which can be either data or other groups.
#[derive(Clone)]
pub struct IGroup {
    streams: Arc<IStreams>,
    pos: u64,
    child_offsets: Vec<u64>,
}

impl IGroup {
    /// Create a new group reader at the given position.
    pub fn new(streams: Arc<IStreams>, pos: u64) -> Result<Self> {
        let num_children = if pos == 0 { 0 } else { streams.read_u64(pos)? };

        // Each child pointer takes 8 bytes; reject counts the file cannot hold
        if num_children > streams.size() / 8 {
            return Err(Error::invalid(format!(
                "group at {} claims {} children",
                pos, num_children
            )));
        }

        let mut child_offsets = Vec::with_capacity(num_children as usize);
        for i in 0..num_children {
            child_offsets.push(streams.read_u64(pos + 8 + i * 8)?);
        }

        Ok(Self { streams, pos, child_offsets })
    }

    /// Get the position of this group in the file.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Get the number of children.
    #[inline]
    pub fn num_children(&self) -> u64 {
        self.child_offsets.len() as u64
    }

    /// Get the raw offset for a child (with group/data flag).
    pub fn child_offset(&self, index: u64) -> Result<u64> {
        self.child_offsets
            .get(index as usize)
            .copied()
            .ok_or(Error::ChildOutOfBounds {
                index: index as usize,
                count: self.child_offsets.len(),
            })
    }

    /// Check if child at index is a group.
    pub fn is_child_group(&self, index: u64) -> Result<bool> {
        Ok(is_group_offset(self.child_offset(index)?))
    }

    /// Get a child group.
    pub fn group(&self, index: u64) -> Result<IGroup> {
        let offset = self.child_offset(index)?;
        if !is_group_offset(offset) {
            return Err(Error::type_mismatch("group", "data"));
        }
        IGroup::new(self.streams.clone(), extract_offset(offset))
    }

    /// Get child data.
    pub fn data(&self, index: u64) -> Result<IData> {
        let offset = self.child_offset(index)?;
        if !is_data_offset(offset) {
            return Err(Error::type_mismatch("data", "group"));
        }
        IData::new(self.streams.clone(), extract_offset(offset))
    }
}

/// Data block in the container hierarchy.
#[derive(Clone)]
pub struct IData {
    streams: Arc<IStreams>,
    pos: u64,
    size: u64,
}

impl IData {
    /// Create a new data reader at the given position.
    pub fn new(streams: Arc<IStreams>, pos: u64) -> Result<Self> {
        let size = if pos == 0 { 0 } else { streams.read_u64(pos)? };
        // Payload follows the 8-byte size
        if size > streams.size().saturating_sub(pos.saturating_add(8)) {
            return Err(Error::invalid(format!(
                "data block at {} claims {} bytes past the end of the file",
                pos, size
            )));
        }
        Ok(Self { streams, pos, size })
    }

    /// Get the size of the data in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Check if this data is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Read all data as bytes.
    pub fn read_all(&self) -> Result<Vec<u8>> {
        if self.size == 0 {
            return Ok(Vec::new());
        }
        self.streams.read_bytes(self.pos + 8, self.size as usize)
    }
}

/// Kind of a named directory entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    Data,
}

/// A named directory: a group whose first child is the entry name table.
#[derive(Clone)]
pub struct IDirectory {
    group: IGroup,
    names: Vec<String>,
    /// Child index in `group` by entry name.
    index: HashMap<String, u64>,
}

impl IDirectory {
    fn new(group: IGroup) -> Result<Self> {
        if group.num_children() == 0 {
            return Err(Error::invalid(format!("directory at {} has no name table", group.pos())));
        }
        let table = group.data(0)?.read_all()?;
        let names = codec::decode_names(&table)?;
        if names.len() as u64 + 1 != group.num_children() {
            return Err(Error::invalid(format!(
                "directory at {} names {} entries but holds {}",
                group.pos(),
                names.len(),
                group.num_children() - 1
            )));
        }
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            index.entry(name.clone()).or_insert(i as u64 + 1);
        }
        Ok(Self { group, names, index })
    }

    /// Entry names in write order.
    pub fn entry_names(&self) -> &[String] {
        &self.names
    }

    fn index_of(&self, name: &str) -> Option<u64> {
        self.index.get(name).copied()
    }

    /// Kind of the named entry, if present.
    pub fn entry_kind(&self, name: &str) -> Option<EntryKind> {
        let index = self.index_of(name)?;
        match self.group.is_child_group(index) {
            Ok(true) => Some(EntryKind::Directory),
            Ok(false) => Some(EntryKind::Data),
            Err(_) => None,
        }
    }

    pub fn has_entry(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Open a sub-directory.
    pub fn directory(&self, name: &str) -> Result<IDirectory> {
        let index = self
            .index_of(name)
            .ok_or_else(|| Error::invalid(format!("missing directory entry '{}'", name)))?;
        IDirectory::new(self.group.group(index)?)
    }

    /// Open a sub-directory if present.
    pub fn optional_directory(&self, name: &str) -> Result<Option<IDirectory>> {
        if self.has_entry(name) {
            self.directory(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Open a data entry.
    pub fn data(&self, name: &str) -> Result<IData> {
        let index = self
            .index_of(name)
            .ok_or_else(|| Error::invalid(format!("missing data entry '{}'", name)))?;
        self.group.data(index)
    }
}

/// A committed container opened for reading.
pub struct IndexedReader {
    path: PathBuf,
    root: IDirectory,
}

impl IndexedReader {
    /// Open a committed container file.
    pub fn open(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let streams = Arc::new(IStreams::open(&path, options)?);
        if !streams.is_frozen() {
            return Err(Error::NotFrozen(path));
        }
        let root_pos = streams.root_pos()?;
        let root = IDirectory::new(IGroup::new(streams.clone(), root_pos)?)?;
        tracing::debug!(path = %path.display(), version = streams.version(), "opened container");
        Ok(Self { path, root })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the root directory.
    #[inline]
    pub fn root(&self) -> &IDirectory {
        &self.root
    }
}
