//! Container writer.
//!
//! Directories are built in memory as [`WDirectory`] trees and written in a
//! single bottom-up pass by [`IndexedWriter::commit`]: data blocks and child
//! groups first, then the group that points at them, then the header is
//! patched with the root position and the frozen flag.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};

use super::format::*;
use crate::data::codec;
use crate::util::{Error, Result};

/// Output stream for writing container data.
pub struct OStream {
    writer: BufWriter<File>,
    pos: u64,
}

impl OStream {
    /// Create a new output stream for the given file path.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::with_capacity(1024 * 1024, file),
            pos: 0,
        })
    }

    /// Get the current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Write bytes and advance position.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.pos += 8;
        Ok(())
    }

    /// Write a u16 value (little-endian).
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.writer.write_u16::<LittleEndian>(value)?;
        self.pos += 2;
        Ok(())
    }

    /// Write a u8 value.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_u8(value)?;
        self.pos += 1;
        Ok(())
    }

    /// Seek to a position and return the current position.
    pub fn seek(&mut self, pos: u64) -> Result<u64> {
        self.writer.flush()?;
        let new_pos = self.writer.seek(SeekFrom::Start(pos))?;
        self.pos = new_pos;
        Ok(new_pos)
    }

    /// Flush the buffer to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// An entry of an in-memory directory.
#[derive(Clone, Debug)]
pub enum WEntry {
    Directory(WDirectory),
    Data(Vec<u8>),
}

/// In-memory directory of named, ordered entries.
#[derive(Clone, Debug, Default)]
pub struct WDirectory {
    entries: Vec<(String, WEntry)>,
}

impl WDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Insert a finished sub-directory, replacing any entry of the same name.
    pub fn put_directory(&mut self, name: &str, dir: WDirectory) {
        self.put(name, WEntry::Directory(dir));
    }

    /// Insert a data blob, replacing any entry of the same name.
    pub fn put_data(&mut self, name: &str, data: Vec<u8>) {
        self.put(name, WEntry::Data(data));
    }

    /// Append a sub-directory. The caller keeps names unique.
    pub fn push_directory(&mut self, name: &str, dir: WDirectory) {
        self.entries.push((name.to_string(), WEntry::Directory(dir)));
    }

    /// Append a data blob. The caller keeps names unique.
    pub fn push_data(&mut self, name: &str, data: Vec<u8>) {
        self.entries.push((name.to_string(), WEntry::Data(data)));
    }

    fn put(&mut self, name: &str, entry: WEntry) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = entry,
            None => self.entries.push((name.to_string(), entry)),
        }
    }

    fn encode_names(&self) -> Vec<u8> {
        let names: Vec<String> = self.entries.iter().map(|(n, _)| n.clone()).collect();
        codec::encode_names(&names)
    }
}

/// Write-once container file.
pub struct IndexedWriter {
    path: PathBuf,
    stream: OStream,
    frozen: bool,
}

impl IndexedWriter {
    /// Create (or truncate) a container file and write a provisional header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut stream = OStream::create(&path)?;

        stream.write_bytes(CONTAINER_MAGIC)?;
        stream.write_u8(NOT_FROZEN_FLAG)?;
        stream.write_u16(CURRENT_VERSION)?;
        stream.write_u64(0)?; // Root position placeholder
        stream.flush()?;

        Ok(Self { path, stream, frozen: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write raw data block and return its position.
    fn write_data(&mut self, data: &[u8]) -> Result<u64> {
        if data.is_empty() {
            return Ok(0); // Empty data marker
        }
        let pos = self.stream.pos();
        self.stream.write_u64(data.len() as u64)?;
        self.stream.write_bytes(data)?;
        Ok(pos)
    }

    /// Write a group and return its position.
    fn write_group(&mut self, children: &[u64]) -> Result<u64> {
        if children.is_empty() {
            return Ok(0); // Empty group marker
        }
        let pos = self.stream.pos();
        self.stream.write_u64(children.len() as u64)?;
        for &child in children {
            self.stream.write_u64(child)?;
        }
        Ok(pos)
    }

    fn write_directory(&mut self, dir: &WDirectory) -> Result<u64> {
        let mut children = Vec::with_capacity(dir.entries.len() + 1);
        let table = dir.encode_names();
        children.push(make_data_offset(self.write_data(&table)?));
        for (_, entry) in &dir.entries {
            let child = match entry {
                WEntry::Directory(sub) => make_group_offset(self.write_directory(sub)?),
                WEntry::Data(bytes) => make_data_offset(self.write_data(bytes)?),
            };
            children.push(child);
        }
        self.write_group(&children)
    }

    /// Write the whole tree, patch the header and freeze the file.
    pub fn commit(&mut self, root: &WDirectory) -> Result<()> {
        if self.frozen {
            return Err(Error::invalid_state(format!(
                "container {} is already committed",
                self.path.display()
            )));
        }

        let root_pos = self.write_directory(root)?;
        self.stream.seek(ROOT_POS_OFFSET as u64)?;
        self.stream.write_u64(root_pos)?;
        self.stream.seek(FROZEN_OFFSET as u64)?;
        self.stream.write_u8(FROZEN_FLAG)?;
        self.stream.flush()?;
        self.frozen = true;

        tracing::debug!(path = %self.path.display(), root_pos, "committed container");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ReadOptions;
    use crate::indexed::{EntryKind, IndexedReader};
    use tempfile::NamedTempFile;

    #[test]
    fn test_commit_and_read_tree() -> Result<()> {
        let temp = NamedTempFile::new()?;

        let mut nested = WDirectory::new();
        nested.push_data("blob", vec![1, 2, 3]);
        nested.push_data("empty", Vec::new());
        nested.push_directory("leaf", WDirectory::new());
        let mut root = WDirectory::new();
        root.put_data("header", b"{}".to_vec());
        root.put_directory("nested", nested);

        let mut writer = IndexedWriter::create(temp.path())?;
        writer.commit(&root)?;
        assert!(writer.commit(&root).is_err());

        for use_mmap in [true, false] {
            let reader = IndexedReader::open(temp.path(), &ReadOptions { use_mmap })?;
            let top = reader.root();
            assert_eq!(top.entry_names(), &["header".to_string(), "nested".to_string()]);
            assert_eq!(top.entry_kind("nested"), Some(EntryKind::Directory));
            assert_eq!(top.data("header")?.read_all()?, b"{}".to_vec());

            let nested = top.directory("nested")?;
            assert_eq!(nested.data("blob")?.read_all()?, vec![1, 2, 3]);
            assert!(nested.data("empty")?.is_empty());
            assert!(nested.directory("leaf")?.entry_names().is_empty());
            assert!(nested.optional_directory("missing")?.is_none());
        }
        Ok(())
    }

    #[test]
    fn test_uncommitted_file_is_rejected() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let _writer = IndexedWriter::create(temp.path())?;
        let err = IndexedReader::open(temp.path(), &ReadOptions::default()).err();
        assert!(matches!(err, Some(Error::NotFrozen(_))));
        Ok(())
    }

    #[test]
    fn test_replace_entry() {
        let mut dir = WDirectory::new();
        dir.put_data("a", vec![1]);
        dir.put_data("a", vec![2]);
        assert_eq!(dir.len(), 1);
        dir.put_directory("a", WDirectory::new());
        assert!(matches!(dir.entries[0].1, WEntry::Directory(_)));
        dir.push_data("b", vec![3]);
        assert_eq!(dir.len(), 2);
    }

    #[test]
    fn test_many_samples_by_name() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let mut samples = WDirectory::new();
        for i in 0..10_000u32 {
            samples.push_data(&i.to_string(), i.to_le_bytes().to_vec());
        }
        let mut root = WDirectory::new();
        root.push_directory("samples", samples);
        IndexedWriter::create(temp.path())?.commit(&root)?;

        let reader = IndexedReader::open(temp.path(), &ReadOptions::default())?;
        let samples = reader.root().directory("samples")?;
        assert_eq!(samples.entry_names().len(), 10_000);
        for i in (0..10_000u32).step_by(997) {
            assert_eq!(samples.data(&i.to_string())?.read_all()?, i.to_le_bytes().to_vec());
        }
        assert!(!samples.has_entry("10000"));
        Ok(())
    }
}
